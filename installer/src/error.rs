//! Error types for the keg installer.
//!
//! Every failure names the package or manifest it concerns. Errors are
//! grouped into [`ErrorKind`] classes, which decide the process exit code.

use crate::artefact::download::DownloadError;
use crate::artefact::extraction::ExtractionError;
use crate::manifest::error::ManifestError;
use crate::manifest::package_name::PackageName;
use crate::manifest::sha256_digest::Sha256Digest;
use camino::Utf8PathBuf;
use thiserror::Error;

/// The class of an [`InstallerError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The manifest or invocation is invalid.
    InvalidInput,
    /// The artefact could not be fetched.
    DownloadFailed,
    /// The artefact digest is wrong or the manifest digest is malformed.
    ChecksumMismatch,
    /// The archive is corrupt or lacks an expected entry.
    ExtractionFailed,
    /// A file could not be written under the install prefix.
    FilesystemError,
    /// The post-install smoke test failed.
    SmokeTestFailed,
}

impl ErrorKind {
    /// Exit code reported by the CLI for this class.
    #[must_use]
    pub fn exit_code(self) -> i32 {
        match self {
            Self::InvalidInput => 2,
            Self::DownloadFailed => 3,
            Self::ChecksumMismatch => 4,
            Self::ExtractionFailed => 5,
            Self::FilesystemError => 6,
            Self::SmokeTestFailed => 7,
        }
    }
}

/// Errors that can occur while verifying, installing, or testing a package.
#[derive(Debug, Error)]
pub enum InstallerError {
    /// The manifest file could not be loaded or failed validation.
    #[error("invalid manifest {path}: {source}")]
    InvalidManifest {
        /// Path of the manifest file.
        path: Utf8PathBuf,
        /// The parse or validation failure.
        #[source]
        source: ManifestError,
    },

    /// The install prefix could not be determined.
    #[error("could not determine install prefix: {reason}")]
    PrefixUnavailable {
        /// Description of why resolution failed.
        reason: String,
    },

    /// The artefact download failed.
    #[error("{name}: `url` download failed: {source}")]
    DownloadFailed {
        /// Package being installed.
        name: PackageName,
        /// The underlying download failure.
        #[source]
        source: DownloadError,
    },

    /// The downloaded bytes do not match the manifest digest.
    #[error("{name}: `sha256` mismatch for {url}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        /// Package being installed.
        name: PackageName,
        /// The artefact URL.
        url: String,
        /// Digest recorded in the manifest.
        expected: Sha256Digest,
        /// Digest of the downloaded bytes.
        actual: Sha256Digest,
    },

    /// The archive could not be unpacked.
    #[error("{name}: extraction failed: {source}")]
    ExtractionFailed {
        /// Package being installed.
        name: PackageName,
        /// The underlying extraction failure.
        #[source]
        source: ExtractionError,
    },

    /// An `install` entry's source is absent from the archive.
    #[error("{name}: `install` entry {entry} not found in archive")]
    MissingEntry {
        /// Package being installed.
        name: PackageName,
        /// Source path that was not found.
        entry: Utf8PathBuf,
    },

    /// A filesystem operation failed.
    #[error("{name}: filesystem error at {path}: {source}")]
    Filesystem {
        /// Package being installed.
        name: PackageName,
        /// Path the failed operation acted on.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The smoke-test command failed or could not be run.
    #[error("{name}: `test` failed: {reason}")]
    SmokeTestFailed {
        /// Package being tested.
        name: PackageName,
        /// Exit code of the command, absent when it did not exit normally.
        exit_code: Option<i32>,
        /// Description of the failure.
        reason: String,
    },

    /// Failed to write output.
    #[error("failed to write output")]
    WriteFailed {
        /// The underlying error that caused the write to fail.
        #[source]
        source: std::io::Error,
    },
}

impl InstallerError {
    /// Classify this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidManifest { source, .. } if source.is_checksum_error() => {
                ErrorKind::ChecksumMismatch
            }
            Self::InvalidManifest { .. } | Self::PrefixUnavailable { .. } => {
                ErrorKind::InvalidInput
            }
            Self::DownloadFailed { .. } => ErrorKind::DownloadFailed,
            Self::ChecksumMismatch { .. } => ErrorKind::ChecksumMismatch,
            Self::ExtractionFailed { .. } | Self::MissingEntry { .. } => {
                ErrorKind::ExtractionFailed
            }
            Self::Filesystem { .. } | Self::WriteFailed { .. } => ErrorKind::FilesystemError,
            Self::SmokeTestFailed { .. } => ErrorKind::SmokeTestFailed,
        }
    }
}

/// Result type alias using [`InstallerError`].
pub type Result<T> = std::result::Result<T, InstallerError>;
