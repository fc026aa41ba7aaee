//! Formula file deserialization.
//!
//! Formulas are TOML files with the keys `name`, `desc`, `homepage`, `url`,
//! `sha256`, `license`, `install`, and `test`. The raw document is parsed
//! first and then converted field by field into a validated [`Manifest`],
//! so every error names the key that failed.

use super::error::{ManifestError, Result};
use super::install_entry::InstallEntry;
use super::package_name::PackageName;
use super::sha256_digest::Sha256Digest;
use super::source_url::SourceUrl;
use super::{Manifest, ManifestMetadata, ManifestRecipe, ManifestSource};
use camino::Utf8Path;
use log::debug;
use serde::Deserialize;

/// The formula document exactly as written.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawManifest {
    name: String,
    desc: Option<String>,
    homepage: Option<String>,
    url: String,
    sha256: String,
    license: Option<String>,
    install: Vec<RawInstallEntry>,
    #[serde(default)]
    test: Vec<String>,
}

/// An `install` element: either a bare file name for `bin/` or an explicit
/// mapping.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawInstallEntry {
    Binary(String),
    Mapping(RawInstallMapping),
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawInstallMapping {
    from: String,
    to: String,
}

impl TryFrom<RawInstallEntry> for InstallEntry {
    type Error = ManifestError;

    fn try_from(raw: RawInstallEntry) -> Result<Self> {
        match raw {
            RawInstallEntry::Binary(source) => Self::binary(&source),
            RawInstallEntry::Mapping(RawInstallMapping { from, to }) => Self::new(&from, &to),
        }
    }
}

impl TryFrom<RawManifest> for Manifest {
    type Error = ManifestError;

    fn try_from(raw: RawManifest) -> Result<Self> {
        // The digest is checked first so a placeholder checksum is always the
        // error reported, whatever else is wrong with the formula.
        let sha256 = Sha256Digest::try_from(raw.sha256)?;
        let name = PackageName::try_from(raw.name)?;
        let url = SourceUrl::try_from(raw.url)?;
        let install = raw
            .install
            .into_iter()
            .map(InstallEntry::try_from)
            .collect::<Result<Vec<_>>>()?;
        let recipe = ManifestRecipe::new(install, raw.test)?;
        let metadata = ManifestMetadata {
            description: raw.desc,
            homepage: raw.homepage,
            license: raw.license,
        };
        Ok(Self::new(
            name,
            metadata,
            ManifestSource { url, sha256 },
            recipe,
        ))
    }
}

/// Parse a TOML formula document into a validated [`Manifest`].
///
/// # Errors
///
/// Returns [`ManifestError::Syntax`] for malformed TOML, missing keys, or
/// unknown keys, and the field-specific variants for invalid values.
///
/// # Examples
///
/// ```
/// use keg_installer::manifest::parser::parse_manifest;
///
/// let toml = concat!(
///     "name = \"agent\"\n",
///     "url = \"https://example.com/agent-1.0.0.tar.gz\"\n",
///     "sha256 = \"cb9c3ef028c06a8fcbf16a24d49d5302969b3118090bd1e971dfdf85b7ba74e3\"\n",
///     "install = [\"agent\"]\n",
///     "test = [\"#{bin}/agent\", \"--version\"]\n",
/// );
/// let manifest = parse_manifest(toml).expect("valid formula");
/// assert_eq!(manifest.install_entries()[0].destination().as_str(), "bin/agent");
/// ```
pub fn parse_manifest(document: &str) -> Result<Manifest> {
    let raw: RawManifest = toml::from_str(document)?;
    Manifest::try_from(raw)
}

/// Read and parse the formula file at `path`.
///
/// # Errors
///
/// Returns [`ManifestError::Read`] if the file cannot be read, otherwise the
/// errors of [`parse_manifest`].
pub fn load_manifest(path: &Utf8Path) -> Result<Manifest> {
    debug!("loading manifest from {path}");
    let document = std::fs::read_to_string(path)?;
    parse_manifest(&document)
}
