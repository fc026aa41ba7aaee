//! BDD tests for formula parsing and validation.
//!
//! Scenarios start from the shipped `Formula/agent.toml` and mutate single
//! fields to check each validation rule.

use camino::Utf8PathBuf;
use keg_installer::artefact::extraction::ArchiveExtractor;
use keg_installer::error::{ErrorKind, InstallerError};
use keg_installer::install::install_with;
use keg_installer::manifest::Manifest;
use keg_installer::manifest::error::ManifestError;
use keg_installer::manifest::parser::parse_manifest;
use keg_installer::output::Progress;
use keg_installer::test_utils::StubDownloader;
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};

const AGENT_FORMULA: &str = include_str!("../../Formula/agent.toml");
const AGENT_SHA256: &str = "cb9c3ef028c06a8fcbf16a24d49d5302969b3118090bd1e971dfdf85b7ba74e3";
const AGENT_URL: &str = "https://github.com/Pi-Innovations-Pvt-Ltd/homebrew-arduino_agent/releases/download/v1.0.0/agent-1.0.0.tar.gz";

#[derive(Default)]
struct ManifestWorld {
    document: String,
    parsed: Option<Result<Manifest, ManifestError>>,
    install_error: Option<InstallerError>,
    download_calls: usize,
}

#[fixture]
fn world() -> ManifestWorld {
    ManifestWorld::default()
}

impl ManifestWorld {
    fn manifest(&self) -> &Manifest {
        match self.parsed.as_ref().expect("formula parsed") {
            Ok(manifest) => manifest,
            Err(err) => panic!("expected valid formula, got {err}"),
        }
    }

    fn manifest_error(&self) -> &ManifestError {
        match self.parsed.as_ref().expect("formula parsed") {
            Err(err) => err,
            Ok(manifest) => panic!("expected rejection, got {manifest:?}"),
        }
    }
}

#[given("the agent formula")]
fn given_agent_formula(world: &mut ManifestWorld) {
    world.document = AGENT_FORMULA.to_owned();
}

#[given("the agent formula with sha256 \"{value}\"")]
fn given_formula_with_sha(world: &mut ManifestWorld, value: String) {
    world.document = AGENT_FORMULA.replace(AGENT_SHA256, &value);
}

#[given("the agent formula with url \"{value}\"")]
fn given_formula_with_url(world: &mut ManifestWorld, value: String) {
    world.document = AGENT_FORMULA.replace(AGENT_URL, &value);
}

#[given("the agent formula with install entry \"{value}\"")]
fn given_formula_with_install(world: &mut ManifestWorld, value: String) {
    world.document =
        AGENT_FORMULA.replace("install = [\"agent\"]", &format!("install = [\"{value}\"]"));
}

#[when("the formula is parsed")]
fn when_parsed(world: &mut ManifestWorld) {
    world.parsed = Some(parse_manifest(&world.document));
}

#[when("the formula is installed")]
fn when_installed(world: &mut ManifestWorld) {
    let temp = tempfile::tempdir().expect("temp dir");
    let prefix = Utf8PathBuf::try_from(temp.path().to_path_buf()).expect("UTF-8 path");
    let downloader = StubDownloader::serving(b"unused".to_vec());

    let parsed = parse_manifest(&world.document);
    let install_error = match &parsed {
        Ok(manifest) => {
            let mut sink = std::io::sink();
            let mut progress = Progress::new(&mut sink, true);
            install_with(
                manifest,
                &prefix,
                &downloader,
                &ArchiveExtractor,
                &mut progress,
            )
            .err()
        }
        Err(_) => None,
    };
    world.install_error = install_error;
    world.parsed = Some(parsed);
    world.download_calls = downloader.calls();
}

#[then("the formula is accepted")]
fn then_accepted(world: &mut ManifestWorld) {
    let _ = world.manifest();
}

#[then("the package name is \"{name}\"")]
fn then_package_name(world: &mut ManifestWorld, name: String) {
    assert_eq!(world.manifest().name().as_str(), name);
}

#[then("the install destination is \"{destination}\"")]
fn then_install_destination(world: &mut ManifestWorld, destination: String) {
    let destinations: Vec<String> = world
        .manifest()
        .install_entries()
        .iter()
        .map(|entry| entry.destination().to_string())
        .collect();
    assert_eq!(destinations, vec![destination]);
}

#[then("the smoke test command is \"{command}\"")]
fn then_smoke_test_command(world: &mut ManifestWorld, command: String) {
    assert_eq!(world.manifest().test_command().join(" "), command);
}

#[then("the formula is rejected for field \"{field}\"")]
fn then_rejected_for_field(world: &mut ManifestWorld, field: String) {
    let err = world.manifest_error();
    assert_eq!(err.field(), Some(field.as_str()), "error: {err}");
    assert!(err.to_string().contains(&format!("`{field}`")), "error: {err}");
}

#[then("the error is reported as a checksum failure")]
fn then_checksum_class(world: &mut ManifestWorld) {
    assert!(world.install_error.is_none());
    let source = match world.parsed.take().expect("formula parsed") {
        Err(err) => err,
        Ok(manifest) => panic!("expected rejection, got {manifest:?}"),
    };
    let err = InstallerError::InvalidManifest {
        path: Utf8PathBuf::from("Formula/agent.toml"),
        source,
    };
    assert_eq!(err.kind(), ErrorKind::ChecksumMismatch);
    assert_eq!(err.kind().exit_code(), 4);
}

#[then("no download is attempted")]
fn then_no_download(world: &mut ManifestWorld) {
    assert_eq!(world.download_calls, 0);
}

#[scenario(
    path = "tests/features/manifest.feature",
    name = "The agent formula is valid"
)]
fn scenario_agent_formula(world: ManifestWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/manifest.feature",
    name = "A placeholder checksum is rejected before download"
)]
fn scenario_placeholder_checksum(world: ManifestWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/manifest.feature",
    name = "A 65 character checksum is rejected"
)]
fn scenario_long_checksum(world: ManifestWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/manifest.feature",
    name = "A plain HTTP url is rejected"
)]
fn scenario_plain_http(world: ManifestWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/manifest.feature",
    name = "An install entry escaping the archive is rejected"
)]
fn scenario_escaping_install_entry(world: ManifestWorld) {
    let _ = world;
}
