//! Checksum verification for downloaded artefacts.
//!
//! The digest of the archive is recomputed from disk and compared with the
//! manifest before anything is extracted.

use crate::manifest::sha256_digest::Sha256Digest;
use sha2::{Digest, Sha256};
use std::fs;
use std::io::Read;
use std::path::Path;

/// Errors arising from checksum verification.
#[derive(Debug, thiserror::Error)]
pub enum VerificationError {
    /// The archive could not be read.
    #[error("failed to read artefact for hashing: {0}")]
    Io(#[from] std::io::Error),

    /// The recomputed digest differs from the expected one.
    #[error("checksum mismatch: expected {expected}, actual {actual}")]
    Mismatch {
        /// Digest recorded in the manifest.
        expected: Sha256Digest,
        /// Digest of the downloaded bytes.
        actual: Sha256Digest,
    },
}

/// Compute the SHA-256 digest of the file at `path`.
///
/// # Errors
///
/// Returns an I/O error if the file cannot be read.
pub fn compute_sha256(path: &Path) -> Result<Sha256Digest, std::io::Error> {
    let mut file = fs::File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 8192];
    loop {
        let bytes_read = file.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(buffer.get(..bytes_read).unwrap_or_default());
    }
    Sha256Digest::from_bytes(&hasher.finalize())
        .ok_or_else(|| std::io::Error::other("sha2 produced a digest of unexpected length"))
}

/// Verify that the file at `path` hashes to `expected`.
///
/// Returns the computed digest on success. Both digests are lowercase, so
/// the comparison is case-insensitive with respect to the manifest text.
///
/// # Errors
///
/// Returns [`VerificationError::Mismatch`] when the digests differ and
/// [`VerificationError::Io`] when the file cannot be read.
pub fn verify_checksum(
    expected: &Sha256Digest,
    path: &Path,
) -> Result<Sha256Digest, VerificationError> {
    let actual = compute_sha256(path)?;
    if actual != *expected {
        return Err(VerificationError::Mismatch {
            expected: expected.clone(),
            actual,
        });
    }
    Ok(actual)
}
