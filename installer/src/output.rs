//! Output formatting for the installer CLI.
//!
//! Progress lines go to stderr and are suppressed by `--quiet`; results such
//! as digests and manifest summaries are formatted here for stdout.

use crate::manifest::Manifest;
use camino::{Utf8Path, Utf8PathBuf};
use std::io::Write;

/// Write a line to `stderr`, ignoring write failures.
pub fn write_stderr_line(stderr: &mut dyn Write, message: impl std::fmt::Display) {
    if writeln!(stderr, "{message}").is_err() {
        // Best-effort logging; ignore write failures.
    }
}

/// A sink for user-facing progress lines.
///
/// # Example
///
/// ```
/// use keg_installer::output::Progress;
///
/// let mut buffer = Vec::new();
/// let mut progress = Progress::new(&mut buffer, false);
/// progress.line("Downloading agent-1.0.0.tar.gz...");
/// assert_eq!(String::from_utf8(buffer).unwrap(), "Downloading agent-1.0.0.tar.gz...\n");
/// ```
pub struct Progress<'a> {
    out: &'a mut dyn Write,
    quiet: bool,
}

impl<'a> Progress<'a> {
    /// Create a progress sink; nothing is written when `quiet` is set.
    pub fn new(out: &'a mut dyn Write, quiet: bool) -> Self {
        Self { out, quiet }
    }

    /// Write one progress line unless quiet.
    pub fn line(&mut self, message: impl std::fmt::Display) {
        if !self.quiet {
            write_stderr_line(self.out, message);
        }
    }
}

/// Format a success message after installation.
#[must_use]
pub fn success_message(name: &str, count: usize, prefix: &Utf8Path) -> String {
    let plural = if count == 1 { "file" } else { "files" };
    format!("Installed {name}: {count} {plural} under {prefix}")
}

/// Format the manifest fields and resolved destinations for `keg info`.
///
/// # Example
///
/// ```
/// use camino::Utf8Path;
/// use keg_installer::manifest::parser::parse_manifest;
/// use keg_installer::output::format_info;
///
/// let manifest = parse_manifest(concat!(
///     "name = \"agent\"\n",
///     "url = \"https://example.com/agent.tar.gz\"\n",
///     "sha256 = \"cb9c3ef028c06a8fcbf16a24d49d5302969b3118090bd1e971dfdf85b7ba74e3\"\n",
///     "install = [\"agent\"]\n",
/// ))
/// .unwrap();
/// let text = format_info(&manifest, Utf8Path::new("/opt/keg"));
/// assert!(text.contains("/opt/keg/bin/agent"));
/// ```
#[must_use]
pub fn format_info(manifest: &Manifest, prefix: &Utf8Path) -> String {
    let metadata = manifest.metadata();
    let mut text = String::new();
    text.push_str(&format!("name:     {}\n", manifest.name()));
    for (label, value) in [
        ("desc:", &metadata.description),
        ("homepage:", &metadata.homepage),
        ("license:", &metadata.license),
    ] {
        if let Some(value) = value {
            text.push_str(&format!("{label:<9} {value}\n"));
        }
    }
    text.push_str(&format!("url:      {}\n", manifest.source_url()));
    text.push_str(&format!("sha256:   {}\n", manifest.expected_checksum()));
    text.push_str("install:\n");
    for entry in manifest.install_entries() {
        text.push_str(&format!(
            "  {} -> {}\n",
            entry.source(),
            entry.destination_in(prefix)
        ));
    }
    if manifest.test_command().is_empty() {
        text.push_str("test:     (none)");
    } else {
        text.push_str(&format!("test:     {}", manifest.test_command().join(" ")));
    }
    text
}

/// Format the list of installed paths, one per line.
#[must_use]
pub fn format_installed(paths: &[Utf8PathBuf]) -> String {
    paths
        .iter()
        .map(|path| format!("  {path}"))
        .collect::<Vec<_>>()
        .join("\n")
}
