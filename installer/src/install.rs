//! Package download, verification, and installation.
//!
//! The pipeline is download → verify → extract → stage → commit. The
//! archive is downloaded into a scoped temporary directory that is removed
//! on every exit path. Nothing is written under the install prefix until the
//! checksum has matched and every install entry has been found in the
//! extracted archive; staged files are then committed together.

use camino::{Utf8Path, Utf8PathBuf};
use log::{debug, info};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use crate::artefact::download::{ArtefactDownloader, HttpDownloader};
use crate::artefact::extraction::{ArchiveExtractor, ArtefactExtractor};
use crate::artefact::verification::{VerificationError, verify_checksum};
use crate::error::{InstallerError, Result};
use crate::manifest::Manifest;
use crate::manifest::install_entry::InstallEntry;
use crate::manifest::sha256_digest::Sha256Digest;
use crate::output::Progress;
use crate::stager::{PlannedCopy, StageError, Stager};

/// The outcome of a successful installation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallResult {
    prefix: Utf8PathBuf,
    destination_paths: Vec<Utf8PathBuf>,
    digest: Sha256Digest,
}

impl InstallResult {
    /// The install prefix the package was placed under.
    #[must_use]
    pub fn prefix(&self) -> &Utf8Path {
        &self.prefix
    }

    /// Absolute paths of the installed files, in manifest order.
    #[must_use]
    pub fn destination_paths(&self) -> &[Utf8PathBuf] {
        &self.destination_paths
    }

    /// Verified digest of the downloaded archive.
    #[must_use]
    pub fn digest(&self) -> &Sha256Digest {
        &self.digest
    }
}

/// Install `manifest` under `prefix` using the production HTTP downloader
/// and archive extractor.
///
/// # Errors
///
/// Returns [`InstallerError::DownloadFailed`], [`InstallerError::ChecksumMismatch`],
/// [`InstallerError::ExtractionFailed`], [`InstallerError::MissingEntry`], or
/// [`InstallerError::Filesystem`]. On any error the prefix is left as it was.
pub fn install(
    manifest: &Manifest,
    prefix: &Utf8Path,
    progress: &mut Progress<'_>,
) -> Result<InstallResult> {
    install_with(manifest, prefix, &HttpDownloader, &ArchiveExtractor, progress)
}

/// Testable inner function with injected dependencies.
///
/// The production entry point [`install`] delegates here with real
/// implementations; tests inject stubs.
///
/// # Errors
///
/// See [`install`].
pub fn install_with(
    manifest: &Manifest,
    prefix: &Utf8Path,
    downloader: &dyn ArtefactDownloader,
    extractor: &dyn ArtefactExtractor,
    progress: &mut Progress<'_>,
) -> Result<InstallResult> {
    let workdir = scoped_workdir(manifest)?;
    let (archive_path, digest) = fetch_verified(manifest, downloader, workdir.path(), progress)?;

    let extract_dir = workdir.path().join("extracted");
    std::fs::create_dir(&extract_dir).map_err(|e| filesystem(manifest, &extract_dir, e))?;
    progress.line(format!("Extracting {}...", display_name(&archive_path)));
    let extracted = extractor
        .extract(&archive_path, &extract_dir)
        .map_err(|source| InstallerError::ExtractionFailed {
            name: manifest.name().clone(),
            source,
        })?;
    debug!("extracted {} file(s)", extracted.len());

    let plan = plan_copies(manifest, &extract_dir, prefix)?;
    let staged = Stager::new()
        .stage(&plan)
        .map_err(|e| stage_failure(manifest, e))?;
    let destination_paths = staged.commit().map_err(|e| stage_failure(manifest, e))?;
    info!(
        "installed {} ({} file(s)) under {prefix}",
        manifest.name(),
        destination_paths.len()
    );

    Ok(InstallResult {
        prefix: prefix.to_owned(),
        destination_paths,
        digest,
    })
}

/// Download the artefact and check its digest without installing, using the
/// production HTTP downloader.
///
/// # Errors
///
/// Returns [`InstallerError::DownloadFailed`] or
/// [`InstallerError::ChecksumMismatch`].
pub fn verify(manifest: &Manifest, progress: &mut Progress<'_>) -> Result<Sha256Digest> {
    verify_with(manifest, &HttpDownloader, progress)
}

/// Testable inner function for [`verify`].
///
/// # Errors
///
/// See [`verify`].
pub fn verify_with(
    manifest: &Manifest,
    downloader: &dyn ArtefactDownloader,
    progress: &mut Progress<'_>,
) -> Result<Sha256Digest> {
    let workdir = scoped_workdir(manifest)?;
    let (_, digest) = fetch_verified(manifest, downloader, workdir.path(), progress)?;
    Ok(digest)
}

/// Create the temporary directory that holds the download and extraction.
fn scoped_workdir(manifest: &Manifest) -> Result<TempDir> {
    tempfile::Builder::new()
        .prefix(&format!("keg-{}-", manifest.name()))
        .tempdir()
        .map_err(|e| filesystem(manifest, &std::env::temp_dir(), e))
}

/// Download into `workdir` and verify the digest.
///
/// On mismatch the downloaded file is removed before returning.
fn fetch_verified(
    manifest: &Manifest,
    downloader: &dyn ArtefactDownloader,
    workdir: &Path,
    progress: &mut Progress<'_>,
) -> Result<(PathBuf, Sha256Digest)> {
    let url = manifest.source_url();
    let archive_path = workdir.join(archive_file_name(manifest));

    progress.line(format!("Downloading {url}..."));
    downloader
        .download(url.as_str(), &archive_path)
        .map_err(|source| InstallerError::DownloadFailed {
            name: manifest.name().clone(),
            source,
        })?;

    match verify_checksum(manifest.expected_checksum(), &archive_path) {
        Ok(digest) => {
            debug!("checksum verified for {}: {digest}", manifest.name());
            Ok((archive_path, digest))
        }
        Err(VerificationError::Mismatch { expected, actual }) => {
            if let Err(err) = std::fs::remove_file(&archive_path) {
                debug!("failed to remove rejected artefact: {err}");
            }
            Err(InstallerError::ChecksumMismatch {
                name: manifest.name().clone(),
                url: url.to_string(),
                expected,
                actual,
            })
        }
        Err(VerificationError::Io(e)) => Err(filesystem(manifest, &archive_path, e)),
    }
}

/// The local file name for the downloaded archive.
///
/// The URL's last path segment is kept so the extractor can detect the
/// archive format from its suffix.
fn archive_file_name(manifest: &Manifest) -> String {
    manifest
        .source_url()
        .file_name()
        .filter(|name| !name.starts_with('.'))
        .map_or_else(|| format!("{}.download", manifest.name()), str::to_owned)
}

/// Resolve each install entry against the extracted tree and the prefix.
fn plan_copies(
    manifest: &Manifest,
    extract_dir: &Path,
    prefix: &Utf8Path,
) -> Result<Vec<PlannedCopy>> {
    let single_root = single_top_level_dir(extract_dir);
    manifest
        .install_entries()
        .iter()
        .map(|entry| {
            let source = locate_source(extract_dir, single_root.as_deref(), entry).ok_or_else(
                || InstallerError::MissingEntry {
                    name: manifest.name().clone(),
                    entry: entry.source().to_owned(),
                },
            )?;
            Ok(PlannedCopy {
                source,
                destination: entry.destination_in(prefix),
            })
        })
        .collect()
}

/// Find an entry's source file, first at the archive root and then inside
/// the archive's only top-level directory, if it has exactly one.
fn locate_source(
    extract_dir: &Path,
    single_root: Option<&Path>,
    entry: &InstallEntry,
) -> Option<PathBuf> {
    [Some(extract_dir), single_root]
        .into_iter()
        .flatten()
        .map(|root| root.join(entry.source()))
        .find(|candidate| candidate.is_file())
}

/// Return the sole top-level directory of `dir`, if it contains nothing else.
fn single_top_level_dir(dir: &Path) -> Option<PathBuf> {
    let mut entries = std::fs::read_dir(dir).ok()?;
    let only = entries.next()?.ok()?.path();
    if entries.next().is_some() || !only.is_dir() {
        return None;
    }
    Some(only)
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn filesystem(manifest: &Manifest, path: &Path, source: std::io::Error) -> InstallerError {
    InstallerError::Filesystem {
        name: manifest.name().clone(),
        path: Utf8PathBuf::from(path.to_string_lossy().into_owned()),
        source,
    }
}

fn stage_failure(manifest: &Manifest, err: StageError) -> InstallerError {
    InstallerError::Filesystem {
        name: manifest.name().clone(),
        path: err.path,
        source: err.source,
    }
}

#[cfg(test)]
#[path = "install_tests.rs"]
mod tests;
