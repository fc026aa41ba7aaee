//! Error types for formula manifest parsing and validation.
//!
//! Each variant names the manifest field it rejects so that the CLI can
//! point the user at the offending line of the formula.

use thiserror::Error;

/// Errors arising from an unreadable or invalid manifest.
#[derive(Debug, Error)]
pub enum ManifestError {
    /// The manifest file could not be read.
    #[error("failed to read manifest: {0}")]
    Read(#[from] std::io::Error),

    /// The manifest is not valid TOML or has unexpected keys.
    #[error("manifest syntax error: {0}")]
    Syntax(#[from] toml::de::Error),

    /// The `name` field is empty or contains unsupported characters.
    #[error("invalid `name` \"{value}\": {reason}")]
    InvalidName {
        /// The rejected name.
        value: String,
        /// Description of the validation failure.
        reason: String,
    },

    /// The `sha256` field is not a 64-character hex string.
    #[error("invalid `sha256` \"{value}\": {reason}")]
    InvalidSha256Digest {
        /// The rejected digest string.
        value: String,
        /// Description of the validation failure.
        reason: String,
    },

    /// The `url` field is not a well-formed HTTPS URL.
    #[error("invalid `url` \"{value}\": {reason}")]
    InvalidUrl {
        /// The rejected URL.
        value: String,
        /// Description of the validation failure.
        reason: String,
    },

    /// An `install` entry has an absolute or escaping path.
    #[error("invalid `install` entry \"{value}\": {reason}")]
    InvalidInstallEntry {
        /// The rejected path.
        value: String,
        /// Description of the validation failure.
        reason: String,
    },

    /// The `install` list is empty.
    #[error("`install` must list at least one entry")]
    EmptyInstall,

    /// The `test` command has an empty program.
    #[error("invalid `test` command: {reason}")]
    InvalidTestCommand {
        /// Description of the validation failure.
        reason: String,
    },
}

impl ManifestError {
    /// Return the manifest field this error refers to, if any.
    #[must_use]
    pub fn field(&self) -> Option<&'static str> {
        match self {
            Self::Read(_) | Self::Syntax(_) => None,
            Self::InvalidName { .. } => Some("name"),
            Self::InvalidSha256Digest { .. } => Some("sha256"),
            Self::InvalidUrl { .. } => Some("url"),
            Self::InvalidInstallEntry { .. } | Self::EmptyInstall => Some("install"),
            Self::InvalidTestCommand { .. } => Some("test"),
        }
    }

    /// Return true when the error is a malformed checksum.
    ///
    /// Malformed checksums are reported in the same class as a checksum
    /// mismatch, even though they are caught before any download.
    #[must_use]
    pub fn is_checksum_error(&self) -> bool {
        matches!(self, Self::InvalidSha256Digest { .. })
    }
}

/// Result type alias using [`ManifestError`].
pub type Result<T> = std::result::Result<T, ManifestError>;
