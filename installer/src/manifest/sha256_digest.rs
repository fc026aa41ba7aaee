//! SHA-256 digest newtype for artefact verification.
//!
//! Accepts a 64-character hexadecimal string in either case and stores it
//! lowercase, so comparisons against computed digests are case-insensitive.

use super::error::{ManifestError, Result};
use std::fmt;

/// Expected length of a hex-encoded SHA-256 digest.
const DIGEST_HEX_LEN: usize = 64;

/// A validated, lowercase hex-encoded SHA-256 digest.
///
/// # Examples
///
/// ```
/// use keg_installer::manifest::sha256_digest::Sha256Digest;
///
/// let hex = "A".repeat(64);
/// let digest: Sha256Digest = hex.as_str().try_into().unwrap();
/// assert_eq!(digest.as_str(), "a".repeat(64));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Sha256Digest(String);

impl Sha256Digest {
    /// Return the digest as a lowercase hex string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume the wrapper and return the inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }

    /// Build a digest from raw hash output bytes.
    #[must_use]
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() * 2 != DIGEST_HEX_LEN {
            return None;
        }
        let hex = bytes.iter().map(|b| format!("{b:02x}")).collect();
        Some(Self(hex))
    }
}

impl TryFrom<&str> for Sha256Digest {
    type Error = ManifestError;

    fn try_from(value: &str) -> Result<Self> {
        validate_sha256(value)?;
        Ok(Self(value.to_ascii_lowercase()))
    }
}

impl TryFrom<String> for Sha256Digest {
    type Error = ManifestError;

    fn try_from(value: String) -> Result<Self> {
        Self::try_from(value.as_str())
    }
}

impl AsRef<str> for Sha256Digest {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Sha256Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Validate that `value` is a well-formed hex-encoded SHA-256 digest.
fn validate_sha256(value: &str) -> Result<()> {
    let invalid = |reason: String| ManifestError::InvalidSha256Digest {
        value: value.to_owned(),
        reason,
    };
    let len = value.chars().count();
    if len != DIGEST_HEX_LEN {
        return Err(invalid(format!(
            "expected {DIGEST_HEX_LEN} hex characters, got {len}"
        )));
    }
    if let Some(bad) = value.chars().find(|c| !c.is_ascii_hexdigit()) {
        return Err(invalid(format!("non-hex character '{bad}'")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const AGENT_DIGEST: &str = "cb9c3ef028c06a8fcbf16a24d49d5302969b3118090bd1e971dfdf85b7ba74e3";

    #[test]
    fn accepts_valid_sixty_four_char_hex() {
        let digest = Sha256Digest::try_from(AGENT_DIGEST).expect("valid digest");
        assert_eq!(digest.as_str(), AGENT_DIGEST);
    }

    #[test]
    fn normalises_uppercase_to_lowercase() {
        let upper = AGENT_DIGEST.to_ascii_uppercase();
        let digest = Sha256Digest::try_from(upper).expect("valid digest");
        assert_eq!(digest.as_str(), AGENT_DIGEST);
    }

    #[rstest]
    #[case::placeholder("YOUR_REAL_SHA256_HASH")]
    #[case::too_short("abcdef")]
    #[case::sixty_five(concat!(
        "cb9c3ef028c06a8fcbf16a24d49d5302969b3118090bd1e971dfdf85b7ba74e3",
        "0"
    ))]
    #[case::empty("")]
    fn rejects_wrong_length(#[case] value: &str) {
        let result = Sha256Digest::try_from(value);
        assert!(matches!(
            result,
            Err(ManifestError::InvalidSha256Digest { .. })
        ));
    }

    #[test]
    fn rejects_non_hex_characters() {
        let mut bad = "a".repeat(63);
        bad.push('g');
        let err = Sha256Digest::try_from(bad.as_str()).expect_err("non-hex");
        assert!(err.to_string().contains("non-hex character 'g'"));
    }

    #[test]
    fn rejects_multibyte_characters_without_panicking() {
        let mut bad = "a".repeat(63);
        bad.push('é');
        assert!(Sha256Digest::try_from(bad.as_str()).is_err());
    }

    #[test]
    fn from_bytes_encodes_lowercase_hex() {
        let digest = Sha256Digest::from_bytes(&[0xAB; 32]).expect("32 bytes");
        assert_eq!(digest.as_str(), "ab".repeat(32));
    }

    #[test]
    fn from_bytes_rejects_wrong_length() {
        assert!(Sha256Digest::from_bytes(&[0; 16]).is_none());
    }
}
