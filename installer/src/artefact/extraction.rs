//! Archive extraction for downloaded artefacts.
//!
//! Supports `.tar.gz`, `.tar.zst`, plain `.tar`, and `.zip` archives.
//! Every entry path is validated before anything is written so that no
//! entry can escape the destination directory (zip-slip).

use log::trace;
use std::fs;
use std::io::{self, Read};
use std::path::{Component, Path, PathBuf};

/// Trait for extracting artefact archives, enabling test mocking.
///
/// # Examples
///
/// ```
/// use keg_installer::artefact::extraction::ArchiveExtractor;
///
/// let extractor = ArchiveExtractor;
/// // Use extractor.extract(archive_path, dest_dir) in production
/// ```
#[cfg_attr(test, mockall::automock)]
pub trait ArtefactExtractor {
    /// Extract the archive at `archive_path` into `dest_dir`.
    ///
    /// Returns the relative paths of the regular files that were extracted.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractionError::PathTraversal`] if any entry
    /// attempts to escape the destination directory.
    /// Returns [`ExtractionError::EmptyArchive`] if no files are found.
    /// Returns [`ExtractionError::Io`] on I/O failures.
    fn extract(&self, archive_path: &Path, dest_dir: &Path)
    -> Result<Vec<PathBuf>, ExtractionError>;
}

/// Errors arising from archive extraction.
#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    /// I/O error during extraction, including corrupt compressed streams.
    #[error("extraction I/O error: {0}")]
    Io(#[from] io::Error),

    /// The zip container is corrupt.
    #[error("corrupt zip archive: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// A path in the archive attempts to traverse outside the destination.
    #[error("path traversal detected: {path}")]
    PathTraversal {
        /// The offending path from the archive entry.
        path: String,
    },

    /// The archive holds a link or device node.
    #[error("unsupported archive entry {path}: {kind}")]
    UnsupportedEntry {
        /// The offending path from the archive entry.
        path: String,
        /// The kind of entry that was rejected.
        kind: String,
    },

    /// The archive format could not be determined.
    #[error("unrecognised archive format for {name}")]
    UnrecognisedFormat {
        /// The archive file name.
        name: String,
    },

    /// The archive contains no files.
    #[error("archive contains no files")]
    EmptyArchive,
}

/// Archive container formats understood by [`ArchiveExtractor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArchiveFormat {
    /// Gzip-compressed tarball (`.tar.gz`, `.tgz`).
    TarGz,
    /// Zstandard-compressed tarball (`.tar.zst`, `.tzst`).
    TarZst,
    /// Uncompressed tarball (`.tar`).
    Tar,
    /// Zip archive (`.zip`).
    Zip,
}

impl ArchiveFormat {
    /// Determine the format from an archive file name.
    ///
    /// # Examples
    ///
    /// ```
    /// use keg_installer::artefact::extraction::ArchiveFormat;
    ///
    /// assert_eq!(
    ///     ArchiveFormat::from_file_name("agent-1.0.0.tar.gz"),
    ///     Some(ArchiveFormat::TarGz)
    /// );
    /// assert_eq!(ArchiveFormat::from_file_name("agent"), None);
    /// ```
    #[must_use]
    pub fn from_file_name(name: &str) -> Option<Self> {
        let lower = name.to_ascii_lowercase();
        if lower.ends_with(".tar.gz") || lower.ends_with(".tgz") {
            Some(Self::TarGz)
        } else if lower.ends_with(".tar.zst") || lower.ends_with(".tzst") {
            Some(Self::TarZst)
        } else if lower.ends_with(".tar") {
            Some(Self::Tar)
        } else if lower.ends_with(".zip") {
            Some(Self::Zip)
        } else {
            None
        }
    }

    /// Determine the format from the leading bytes of an archive.
    #[must_use]
    pub fn from_magic(header: &[u8]) -> Option<Self> {
        const GZIP: &[u8] = &[0x1f, 0x8b];
        const ZSTD: &[u8] = &[0x28, 0xb5, 0x2f, 0xfd];
        const ZIP: &[u8] = b"PK\x03\x04";
        const USTAR_OFFSET: usize = 257;

        if header.starts_with(GZIP) {
            Some(Self::TarGz)
        } else if header.starts_with(ZSTD) {
            Some(Self::TarZst)
        } else if header.starts_with(ZIP) {
            Some(Self::Zip)
        } else if header
            .get(USTAR_OFFSET..USTAR_OFFSET + 5)
            .is_some_and(|magic| magic == b"ustar")
        {
            Some(Self::Tar)
        } else {
            None
        }
    }

    /// Detect the format of the archive at `path`, by name and then by
    /// content.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractionError::UnrecognisedFormat`] when neither the name
    /// nor the leading bytes identify a supported format.
    pub fn detect(path: &Path) -> Result<Self, ExtractionError> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        if let Some(format) = Self::from_file_name(&name) {
            return Ok(format);
        }
        let mut header = Vec::with_capacity(512);
        fs::File::open(path)?.take(512).read_to_end(&mut header)?;
        Self::from_magic(&header).ok_or(ExtractionError::UnrecognisedFormat { name })
    }
}

/// Default extractor using the `tar`, `flate2`, `zstd`, and `zip` crates.
///
/// Validates each entry path before extraction to guard against
/// path traversal attacks (zip-slip). Unix permission bits recorded in
/// the archive are applied to extracted files.
#[derive(Debug, Clone, Copy, Default)]
pub struct ArchiveExtractor;

impl ArtefactExtractor for ArchiveExtractor {
    fn extract(
        &self,
        archive_path: &Path,
        dest_dir: &Path,
    ) -> Result<Vec<PathBuf>, ExtractionError> {
        let format = ArchiveFormat::detect(archive_path)?;
        trace!("extracting {} as {format:?}", archive_path.display());
        let file = fs::File::open(archive_path)?;
        let extracted = match format {
            ArchiveFormat::TarGz => extract_tar(flate2::read::GzDecoder::new(file), dest_dir)?,
            ArchiveFormat::TarZst => extract_tar(zstd::Decoder::new(file)?, dest_dir)?,
            ArchiveFormat::Tar => extract_tar(file, dest_dir)?,
            ArchiveFormat::Zip => extract_zip(file, dest_dir)?,
        };

        if extracted.is_empty() {
            return Err(ExtractionError::EmptyArchive);
        }

        Ok(extracted)
    }
}

/// Unpack a tar stream, rejecting links and special files.
fn extract_tar<R: Read>(reader: R, dest_dir: &Path) -> Result<Vec<PathBuf>, ExtractionError> {
    let mut archive = tar::Archive::new(reader);
    let mut extracted = Vec::new();

    for entry_result in archive.entries()? {
        let mut entry = entry_result?;
        let entry_path = normalise(&entry.path()?);
        validate_entry_path(&entry_path)?;

        let entry_type = entry.header().entry_type();
        if entry_type.is_pax_global_extensions() || entry_path.as_os_str().is_empty() {
            continue;
        }

        let dest_path = dest_dir.join(&entry_path);
        if entry_type.is_dir() {
            fs::create_dir_all(&dest_path)?;
            continue;
        }
        if !entry_type.is_file() {
            return Err(ExtractionError::UnsupportedEntry {
                path: entry_path.display().to_string(),
                kind: format!("{entry_type:?}"),
            });
        }

        if let Some(parent) = dest_path.parent() {
            fs::create_dir_all(parent)?;
        }
        entry.unpack(&dest_path)?;
        apply_mode(&dest_path, entry.header().mode().ok())?;

        trace!("extracted {}", entry_path.display());
        extracted.push(entry_path);
    }

    Ok(extracted)
}

/// Unpack a zip archive, rejecting symlinks.
fn extract_zip(file: fs::File, dest_dir: &Path) -> Result<Vec<PathBuf>, ExtractionError> {
    const FILE_TYPE_MASK: u32 = 0o170_000;
    const SYMLINK: u32 = 0o120_000;

    let mut archive = zip::ZipArchive::new(file)?;
    let mut extracted = Vec::new();

    for index in 0..archive.len() {
        let mut entry = archive.by_index(index)?;
        let entry_path = entry
            .enclosed_name()
            .map(|path| normalise(&path))
            .ok_or_else(|| ExtractionError::PathTraversal {
                path: entry.name().to_owned(),
            })?;
        validate_entry_path(&entry_path)?;

        let dest_path = dest_dir.join(&entry_path);
        if entry.is_dir() {
            fs::create_dir_all(&dest_path)?;
            continue;
        }
        let mode = entry.unix_mode();
        if mode.is_some_and(|m| m & FILE_TYPE_MASK == SYMLINK) {
            return Err(ExtractionError::UnsupportedEntry {
                path: entry_path.display().to_string(),
                kind: "Symlink".to_owned(),
            });
        }

        if let Some(parent) = dest_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut output = fs::File::create(&dest_path)?;
        io::copy(&mut entry, &mut output)?;
        apply_mode(&dest_path, mode)?;

        trace!("extracted {}", entry_path.display());
        extracted.push(entry_path);
    }

    Ok(extracted)
}

/// Strip `.` components so `./agent` and `agent` name the same file.
fn normalise(path: &Path) -> PathBuf {
    path.components()
        .filter(|component| !matches!(component, Component::CurDir))
        .collect()
}

/// Apply the permission bits recorded in the archive.
#[cfg(unix)]
fn apply_mode(path: &Path, mode: Option<u32>) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    match mode {
        Some(mode) => fs::set_permissions(path, fs::Permissions::from_mode(mode & 0o777)),
        None => Ok(()),
    }
}

#[cfg(not(unix))]
fn apply_mode(_path: &Path, _mode: Option<u32>) -> io::Result<()> {
    Ok(())
}

/// Validate that an entry path does not escape the destination
/// directory via `..` components or absolute paths.
fn validate_entry_path(path: &Path) -> Result<(), ExtractionError> {
    let escapes = path.is_absolute()
        || path.components().any(|component| {
            matches!(
                component,
                Component::ParentDir | Component::RootDir | Component::Prefix(_)
            )
        });
    if escapes {
        return Err(ExtractionError::PathTraversal {
            path: path.display().to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
#[path = "extraction_tests.rs"]
mod tests;
