//! Formula manifest schema and validation.
//!
//! A manifest describes one installable package: where its archive lives,
//! the digest the archive must match, which files to copy out of it, and
//! an optional smoke-test command. Every field is validated when the
//! manifest is built, so a [`Manifest`] value is always well-formed.
//!
//! # Sub-modules
//!
//! - [`error`] - Validation error types naming the offending field.
//! - [`install_entry`] - Archive-to-prefix copy entries (`InstallEntry`).
//! - [`package_name`] - Package name newtype (`PackageName`).
//! - [`parser`] - TOML formula file loading.
//! - [`sha256_digest`] - SHA-256 digest newtype (`Sha256Digest`).
//! - [`source_url`] - HTTPS URL newtype (`SourceUrl`).

pub mod error;
pub mod install_entry;
pub mod package_name;
pub mod parser;
pub mod sha256_digest;
pub mod source_url;

use error::{ManifestError, Result};
use install_entry::InstallEntry;
use package_name::PackageName;
use sha256_digest::Sha256Digest;
use source_url::SourceUrl;
use std::collections::HashSet;

/// Informational fields with no effect on installation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManifestMetadata {
    /// One-line description of the package.
    pub description: Option<String>,
    /// Project homepage.
    pub homepage: Option<String>,
    /// SPDX licence identifier.
    pub license: Option<String>,
}

/// Where the artefact comes from and the digest it must match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestSource {
    /// HTTPS location of the archive.
    pub url: SourceUrl,
    /// Expected SHA-256 digest of the downloaded bytes.
    pub sha256: Sha256Digest,
}

/// What to install from the artefact and how to check it afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestRecipe {
    install: Vec<InstallEntry>,
    test: Vec<String>,
}

impl ManifestRecipe {
    /// Build a recipe from install entries and a smoke-test command.
    ///
    /// An empty `test` means the package has no smoke test.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::EmptyInstall`] when `install` is empty,
    /// [`ManifestError::InvalidInstallEntry`] when two entries share a
    /// destination, and [`ManifestError::InvalidTestCommand`] when `test`
    /// has an empty program.
    pub fn new(install: Vec<InstallEntry>, test: Vec<String>) -> Result<Self> {
        if install.is_empty() {
            return Err(ManifestError::EmptyInstall);
        }
        let mut destinations = HashSet::with_capacity(install.len());
        if let Some(duplicate) = install
            .iter()
            .find(|entry| !destinations.insert(entry.destination()))
        {
            return Err(ManifestError::InvalidInstallEntry {
                value: duplicate.destination().to_string(),
                reason: "destination is listed more than once".to_owned(),
            });
        }
        if test.first().is_some_and(|program| program.trim().is_empty()) {
            return Err(ManifestError::InvalidTestCommand {
                reason: "program must not be empty".to_owned(),
            });
        }
        Ok(Self { install, test })
    }
}

/// A validated, immutable package manifest.
///
/// # Examples
///
/// ```
/// use keg_installer::manifest::{Manifest, ManifestMetadata, ManifestRecipe, ManifestSource};
/// use keg_installer::manifest::install_entry::InstallEntry;
///
/// let source = ManifestSource {
///     url: "https://example.com/agent-1.0.0.tar.gz".try_into().unwrap(),
///     sha256: "a".repeat(64).try_into().unwrap(),
/// };
/// let recipe = ManifestRecipe::new(
///     vec![InstallEntry::binary("agent").unwrap()],
///     vec!["#{bin}/agent".to_owned(), "--version".to_owned()],
/// )
/// .unwrap();
/// let manifest = Manifest::new(
///     "agent".try_into().unwrap(),
///     ManifestMetadata::default(),
///     source,
///     recipe,
/// );
/// assert_eq!(manifest.name().as_str(), "agent");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    name: PackageName,
    metadata: ManifestMetadata,
    source: ManifestSource,
    recipe: ManifestRecipe,
}

impl Manifest {
    /// Assemble a manifest from validated parts.
    #[must_use]
    pub fn new(
        name: PackageName,
        metadata: ManifestMetadata,
        source: ManifestSource,
        recipe: ManifestRecipe,
    ) -> Self {
        Self {
            name,
            metadata,
            source,
            recipe,
        }
    }

    /// Package identifier.
    #[must_use]
    pub fn name(&self) -> &PackageName {
        &self.name
    }

    /// Informational fields.
    #[must_use]
    pub fn metadata(&self) -> &ManifestMetadata {
        &self.metadata
    }

    /// Archive download location.
    #[must_use]
    pub fn source_url(&self) -> &SourceUrl {
        &self.source.url
    }

    /// Digest the downloaded archive must match.
    #[must_use]
    pub fn expected_checksum(&self) -> &Sha256Digest {
        &self.source.sha256
    }

    /// Files to copy out of the archive, in order.
    #[must_use]
    pub fn install_entries(&self) -> &[InstallEntry] {
        &self.recipe.install
    }

    /// Smoke-test invocation; empty when the package has none.
    #[must_use]
    pub fn test_command(&self) -> &[String] {
        &self.recipe.test
    }
}
