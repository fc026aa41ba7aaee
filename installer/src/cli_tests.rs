//! Tests for keg CLI parsing and default behaviours.

use super::*;
use rstest::rstest;

#[test]
fn install_parses_defaults() {
    let cli = Cli::parse_from(["keg", "install", "Formula/agent.toml"]);
    match cli.command {
        Command::Install(args) => {
            assert_eq!(args.target.manifest, Utf8PathBuf::from("Formula/agent.toml"));
            assert!(args.prefix.is_none());
            assert!(!args.test);
            assert_eq!(args.timeout, DEFAULT_TIMEOUT_SECS);
        }
        other => panic!("expected Install, got {other:?}"),
    }
    assert_eq!(cli.verbosity, 0);
    assert!(!cli.quiet);
}

#[test]
fn install_parses_prefix_test_and_timeout() {
    let cli = Cli::parse_from([
        "keg",
        "install",
        "Formula/agent.toml",
        "--prefix",
        "/opt/keg",
        "--test",
        "--timeout",
        "5",
    ]);
    match cli.command {
        Command::Install(args) => {
            assert_eq!(args.prefix, Some(Utf8PathBuf::from("/opt/keg")));
            assert!(args.test);
            assert_eq!(args.timeout, 5);
        }
        other => panic!("expected Install, got {other:?}"),
    }
}

#[rstest]
#[case::verify(&["keg", "verify", "a.toml"])]
#[case::test(&["keg", "test", "a.toml", "-p", "/opt/keg"])]
#[case::info(&["keg", "info", "a.toml"])]
fn every_subcommand_takes_a_manifest(#[case] argv: &[&str]) {
    let cli = Cli::parse_from(argv);
    assert_eq!(cli.command.manifest(), Utf8Path::new("a.toml"));
}

#[test]
fn global_flags_follow_the_subcommand() {
    let cli = Cli::parse_from(["keg", "verify", "a.toml", "-vv"]);
    assert_eq!(cli.verbosity, 2);

    let cli = Cli::parse_from(["keg", "-q", "info", "a.toml"]);
    assert!(cli.quiet);
}

#[rstest]
#[case::missing_subcommand(&["keg"])]
#[case::missing_manifest(&["keg", "install"])]
#[case::quiet_and_verbose(&["keg", "-q", "-v", "verify", "a.toml"])]
#[case::bad_timeout(&["keg", "install", "a.toml", "--timeout", "soon"])]
fn invalid_invocations_are_rejected(#[case] argv: &[&str]) {
    assert!(Cli::try_parse_from(argv).is_err());
}
