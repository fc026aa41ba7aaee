//! CLI argument definitions for keg.
//!
//! This module defines the command-line interface using clap. It is separated
//! from the main entrypoint to keep the binary small and focused on
//! orchestration.

use camino::{Utf8Path, Utf8PathBuf};
use clap::{Args, Parser, Subcommand};

/// Default smoke-test timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Install prebuilt packages described by formula manifests.
#[derive(Parser, Debug)]
#[command(name = "keg")]
#[command(version, about)]
#[command(long_about = concat!(
    "Install prebuilt packages described by formula manifests.\n\n",
    "A formula names an HTTPS archive, its SHA-256 digest, the files to copy ",
    "out of it, and an optional smoke-test command. keg verifies the digest ",
    "before anything is extracted and installs every file or none of them.",
))]
#[command(after_help = concat!(
    "EXAMPLES:\n",
    "  Install into ~/.local:\n",
    "    $ keg install Formula/agent.toml\n\n",
    "  Install into a custom prefix and run the smoke test:\n",
    "    $ keg install Formula/agent.toml --prefix /opt/keg --test\n\n",
    "  Check the published digest without installing:\n",
    "    $ keg verify Formula/agent.toml\n\n",
    "ENVIRONMENT:\n",
    "  KEG_PREFIX    Install prefix used when --prefix is not given\n",
    "  KEG_LOG       Log filter (e.g. debug, keg_installer=trace)",
))]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,

    /// Increase log verbosity (repeatable: -v, -vv, -vvv).
    #[arg(
        short,
        long = "verbose",
        action = clap::ArgAction::Count,
        global = true,
        conflicts_with = "quiet"
    )]
    pub verbosity: u8,

    /// Suppress progress output (errors still shown).
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

/// Available subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Download, verify, and install a package.
    Install(InstallArgs),

    /// Download the artefact and check its digest without installing.
    Verify(ManifestArgs),

    /// Run the smoke test against an existing install.
    Test(TestArgs),

    /// Show the parsed manifest and resolved destinations.
    Info(InfoArgs),
}

/// The manifest operand shared by every subcommand.
#[derive(Args, Debug, Clone)]
pub struct ManifestArgs {
    /// Path to the formula manifest (TOML).
    #[arg(value_name = "MANIFEST")]
    pub manifest: Utf8PathBuf,
}

/// Arguments for the install command.
#[derive(Args, Debug, Clone)]
pub struct InstallArgs {
    /// Manifest operand.
    #[command(flatten)]
    pub target: ManifestArgs,

    /// Install prefix [default: $KEG_PREFIX or ~/.local].
    #[arg(short, long, value_name = "DIR")]
    pub prefix: Option<Utf8PathBuf>,

    /// Run the smoke test after installing.
    #[arg(long)]
    pub test: bool,

    /// Smoke-test timeout in seconds.
    #[arg(long, value_name = "SECS", default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub timeout: u64,
}

/// Arguments for the test command.
#[derive(Args, Debug, Clone)]
pub struct TestArgs {
    /// Manifest operand.
    #[command(flatten)]
    pub target: ManifestArgs,

    /// Install prefix [default: $KEG_PREFIX or ~/.local].
    #[arg(short, long, value_name = "DIR")]
    pub prefix: Option<Utf8PathBuf>,

    /// Smoke-test timeout in seconds.
    #[arg(long, value_name = "SECS", default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub timeout: u64,
}

/// Arguments for the info command.
#[derive(Args, Debug, Clone)]
pub struct InfoArgs {
    /// Manifest operand.
    #[command(flatten)]
    pub target: ManifestArgs,

    /// Install prefix used to resolve destinations.
    #[arg(short, long, value_name = "DIR")]
    pub prefix: Option<Utf8PathBuf>,
}

impl Command {
    /// Path of the manifest the command operates on.
    #[must_use]
    pub fn manifest(&self) -> &Utf8Path {
        match self {
            Self::Install(args) => &args.target.manifest,
            Self::Verify(args) => &args.manifest,
            Self::Test(args) => &args.target.manifest,
            Self::Info(args) => &args.target.manifest,
        }
    }
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
