//! Post-install smoke test.
//!
//! Runs the manifest's `test` command against the freshly installed files
//! and fails when the command exits non-zero, cannot be started, or outlives
//! its timeout.

use camino::Utf8Path;
use log::debug;
use std::ffi::OsString;
use std::io::Read;
use std::process::{Command, ExitStatus, Stdio};
use std::thread::JoinHandle;
use std::time::Duration;
use wait_timeout::ChildExt;

use crate::error::{InstallerError, Result};
use crate::manifest::Manifest;
use crate::manifest::install_entry::BIN_DIR;

/// How long a smoke test may run before it is killed.
pub const DEFAULT_SMOKE_TEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Placeholder replaced by the absolute `bin` directory of the prefix.
pub const BIN_PLACEHOLDER: &str = "#{bin}";

/// Placeholder replaced by the absolute install prefix.
pub const PREFIX_PLACEHOLDER: &str = "#{prefix}";

/// Result of running a package's smoke test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SmokeTestOutcome {
    /// The command exited zero.
    Passed {
        /// The resolved command line that was run.
        command: Vec<String>,
        /// Captured standard output.
        stdout: String,
    },
    /// The manifest has no smoke test.
    Skipped,
}

/// Expand placeholders in a test command for `prefix`.
///
/// A relative program path containing `/` is resolved against the prefix,
/// so `bin/agent` means `<prefix>/bin/agent`. A bare program name is left
/// for `PATH` lookup.
///
/// # Examples
///
/// ```
/// use camino::Utf8Path;
/// use keg_installer::smoke::resolve_command;
///
/// let test = vec!["#{bin}/agent".to_owned(), "--version".to_owned()];
/// let resolved = resolve_command(&test, Utf8Path::new("/opt/keg"));
/// assert_eq!(resolved, vec!["/opt/keg/bin/agent", "--version"]);
/// ```
#[must_use]
pub fn resolve_command(test: &[String], prefix: &Utf8Path) -> Vec<String> {
    let bin = prefix.join(BIN_DIR);
    let mut resolved: Vec<String> = test
        .iter()
        .map(|arg| {
            arg.replace(BIN_PLACEHOLDER, bin.as_str())
                .replace(PREFIX_PLACEHOLDER, prefix.as_str())
        })
        .collect();
    if let Some(program) = resolved.first_mut() {
        let path = Utf8Path::new(program.as_str());
        if path.is_relative() && program.contains('/') {
            *program = prefix.join(path).into_string();
        }
    }
    resolved
}

/// Run the manifest's smoke test against `prefix`.
///
/// The command runs with `<prefix>/bin` prepended to `PATH`, stdin closed,
/// and its output captured.
///
/// # Errors
///
/// Returns [`InstallerError::SmokeTestFailed`] when the command cannot be
/// spawned, exits non-zero, is terminated by a signal, or exceeds `timeout`.
pub fn run_smoke_test(
    manifest: &Manifest,
    prefix: &Utf8Path,
    timeout: Duration,
) -> Result<SmokeTestOutcome> {
    let command = resolve_command(manifest.test_command(), prefix);
    let Some((program, args)) = command.split_first() else {
        debug!("{} has no smoke test", manifest.name());
        return Ok(SmokeTestOutcome::Skipped);
    };
    let display = command.join(" ");
    let failed = |exit_code: Option<i32>, reason: String| InstallerError::SmokeTestFailed {
        name: manifest.name().clone(),
        exit_code,
        reason,
    };

    debug!("running smoke test `{display}`");
    let mut cmd = Command::new(program);
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    if let Some(path) = search_path(&prefix.join(BIN_DIR)) {
        cmd.env("PATH", path);
    }

    let mut child = cmd
        .spawn()
        .map_err(|e| failed(None, format!("could not run `{display}`: {e}")))?;
    let stdout = child.stdout.take().map(drain);
    let stderr = child.stderr.take().map(drain);

    let status = match child.wait_timeout(timeout) {
        Ok(Some(status)) => status,
        Ok(None) => {
            let _ = child.kill();
            let _ = child.wait();
            return Err(failed(
                None,
                format!("`{display}` timed out after {} seconds", timeout.as_secs()),
            ));
        }
        Err(e) => {
            let _ = child.kill();
            let _ = child.wait();
            return Err(failed(None, format!("could not wait for `{display}`: {e}")));
        }
    };

    let stdout = collect(stdout);
    let stderr = collect(stderr);
    if status.success() {
        return Ok(SmokeTestOutcome::Passed { command, stdout });
    }
    Err(failed(
        status.code(),
        failure_reason(&display, status, stderr.trim()),
    ))
}

/// Build the `PATH` value with `bin` ahead of the inherited entries.
fn search_path(bin: &Utf8Path) -> Option<OsString> {
    let inherited = std::env::var_os("PATH").unwrap_or_default();
    let entries = std::iter::once(bin.as_std_path().to_path_buf())
        .chain(std::env::split_paths(&inherited));
    std::env::join_paths(entries).ok()
}

fn drain<R: Read + Send + 'static>(mut stream: R) -> JoinHandle<String> {
    std::thread::spawn(move || {
        let mut buf = Vec::new();
        if stream.read_to_end(&mut buf).is_err() {
            // Partial output is still reported.
        }
        String::from_utf8_lossy(&buf).into_owned()
    })
}

fn collect(handle: Option<JoinHandle<String>>) -> String {
    handle
        .and_then(|h| h.join().ok())
        .unwrap_or_default()
}

fn failure_reason(display: &str, status: ExitStatus, stderr: &str) -> String {
    let mut reason = match status.code() {
        Some(code) => format!("`{display}` exited with status {code}"),
        None => format!("`{display}` was terminated by a signal"),
    };
    if !stderr.is_empty() {
        reason.push_str(": ");
        reason.push_str(stderr);
    }
    reason
}
