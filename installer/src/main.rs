//! keg CLI entrypoint.
//!
//! Loads a formula manifest and dispatches to install, verify, test, or info.
//! Failures are printed to stderr and mapped to a per-class exit code.

use camino::Utf8Path;
use clap::Parser;
use keg_installer::cli::{Cli, Command, InfoArgs, InstallArgs, TestArgs};
use keg_installer::dirs::{BaseDirs, SystemBaseDirs};
use keg_installer::error::{InstallerError, Result};
use keg_installer::install::{install, verify};
use keg_installer::manifest::Manifest;
use keg_installer::manifest::parser::load_manifest;
use keg_installer::output::{
    Progress, format_info, format_installed, success_message, write_stderr_line,
};
use keg_installer::prefix::resolve_prefix;
use keg_installer::smoke::{SmokeTestOutcome, run_smoke_test};
use log::LevelFilter;
use std::io::Write;
use std::time::Duration;

/// Environment variable holding an `env_logger` filter.
const LOG_ENV: &str = "KEG_LOG";

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbosity);
    let mut stdout = std::io::stdout();
    let mut stderr = std::io::stderr();
    let run_result = run(&cli, &SystemBaseDirs, &mut stdout, &mut stderr);
    let exit_code = exit_code_for_run_result(run_result, &mut stderr);
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
}

/// Initialise `env_logger` at a level chosen by `-v`, overridable by
/// `KEG_LOG`.
fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    let mut builder = env_logger::Builder::new();
    builder
        .filter_level(level)
        .format_timestamp(None)
        .parse_env(env_logger::Env::new().filter(LOG_ENV));
    if builder.try_init().is_err() {
        // A logger is already installed.
    }
}

fn run(
    cli: &Cli,
    dirs: &dyn BaseDirs,
    stdout: &mut dyn Write,
    stderr: &mut dyn Write,
) -> Result<()> {
    let manifest = load(cli.command.manifest())?;
    match &cli.command {
        Command::Install(args) => run_install(&manifest, args, dirs, cli.quiet, stderr),
        Command::Verify(_) => {
            let digest = verify(&manifest, &mut Progress::new(stderr, cli.quiet))?;
            write_stdout_line(stdout, format!("{digest}  {}", manifest.source_url()))
        }
        Command::Test(args) => run_test(&manifest, args, dirs, cli.quiet, stderr),
        Command::Info(args) => run_info(&manifest, args, dirs, stdout),
    }
}

fn load(path: &Utf8Path) -> Result<Manifest> {
    load_manifest(path).map_err(|source| InstallerError::InvalidManifest {
        path: path.to_owned(),
        source,
    })
}

fn run_install(
    manifest: &Manifest,
    args: &InstallArgs,
    dirs: &dyn BaseDirs,
    quiet: bool,
    stderr: &mut dyn Write,
) -> Result<()> {
    let prefix = resolve_prefix(args.prefix.as_deref(), dirs)?;
    let result = install(manifest, &prefix, &mut Progress::new(stderr, quiet))?;

    if !quiet {
        write_stderr_line(
            stderr,
            success_message(
                manifest.name().as_str(),
                result.destination_paths().len(),
                result.prefix(),
            ),
        );
        write_stderr_line(stderr, format_installed(result.destination_paths()));
    }

    if args.test {
        report_smoke_test(manifest, &prefix, args.timeout, quiet, stderr)?;
    }
    Ok(())
}

fn run_test(
    manifest: &Manifest,
    args: &TestArgs,
    dirs: &dyn BaseDirs,
    quiet: bool,
    stderr: &mut dyn Write,
) -> Result<()> {
    let prefix = resolve_prefix(args.prefix.as_deref(), dirs)?;
    report_smoke_test(manifest, &prefix, args.timeout, quiet, stderr)
}

fn run_info(
    manifest: &Manifest,
    args: &InfoArgs,
    dirs: &dyn BaseDirs,
    stdout: &mut dyn Write,
) -> Result<()> {
    let prefix = resolve_prefix(args.prefix.as_deref(), dirs)?;
    write_stdout_line(stdout, format_info(manifest, &prefix))
}

fn report_smoke_test(
    manifest: &Manifest,
    prefix: &Utf8Path,
    timeout_secs: u64,
    quiet: bool,
    stderr: &mut dyn Write,
) -> Result<()> {
    let outcome = run_smoke_test(manifest, prefix, Duration::from_secs(timeout_secs))?;
    let mut progress = Progress::new(stderr, quiet);
    match outcome {
        SmokeTestOutcome::Passed { command, .. } => {
            progress.line(format!("Smoke test passed: {}", command.join(" ")));
        }
        SmokeTestOutcome::Skipped => {
            progress.line(format!("{} defines no smoke test", manifest.name()));
        }
    }
    Ok(())
}

fn write_stdout_line(stdout: &mut dyn Write, message: impl std::fmt::Display) -> Result<()> {
    writeln!(stdout, "{message}").map_err(|source| InstallerError::WriteFailed { source })
}

fn exit_code_for_run_result(result: Result<()>, stderr: &mut dyn Write) -> i32 {
    match result {
        Ok(()) => 0,
        Err(err) => {
            write_stderr_line(stderr, format!("error: {err}"));
            err.kind().exit_code()
        }
    }
}
