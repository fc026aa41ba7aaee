//! HTTPS source URL newtype.
//!
//! URLs are parsed with the `url` crate and must use `https` with a
//! non-empty host.

use super::error::{ManifestError, Result};
use std::fmt;
use url::Url;

const HTTPS_SCHEME: &str = "https://";

/// A validated HTTPS download location for an artefact archive.
///
/// # Examples
///
/// ```
/// use keg_installer::manifest::source_url::SourceUrl;
///
/// let url = SourceUrl::try_from("https://example.com/agent-1.0.0.tar.gz").unwrap();
/// assert_eq!(url.file_name(), Some("agent-1.0.0.tar.gz"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceUrl(Url);

impl SourceUrl {
    /// Return the URL as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Return the host component of the URL, without any port.
    #[must_use]
    pub fn host(&self) -> &str {
        self.0.host_str().unwrap_or_default()
    }

    /// Return the final path segment, ignoring any query or fragment.
    ///
    /// Returns `None` when the path is empty or ends with `/`.
    #[must_use]
    pub fn file_name(&self) -> Option<&str> {
        self.0
            .path_segments()?
            .next_back()
            .filter(|segment| !segment.is_empty())
    }
}

impl TryFrom<&str> for SourceUrl {
    type Error = ManifestError;

    fn try_from(value: &str) -> Result<Self> {
        let invalid = |reason: String| ManifestError::InvalidUrl {
            value: value.to_owned(),
            reason,
        };
        if value.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(invalid("URL must not contain whitespace".to_owned()));
        }
        let url = Url::parse(value).map_err(|err| invalid(err.to_string()))?;
        if url.scheme() != "https" {
            return Err(invalid("URL must use the https scheme".to_owned()));
        }
        // The parser skips extra slashes, so `https:///a` would gain a host.
        let empty_authority = value
            .get(HTTPS_SCHEME.len()..)
            .is_none_or(|rest| rest.starts_with(['/', '\\']));
        if empty_authority || url.host_str().is_none_or(str::is_empty) {
            return Err(invalid("URL has no host".to_owned()));
        }
        Ok(Self(url))
    }
}

impl TryFrom<String> for SourceUrl {
    type Error = ManifestError;

    fn try_from(value: String) -> Result<Self> {
        Self::try_from(value.as_str())
    }
}

impl AsRef<str> for SourceUrl {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for SourceUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const AGENT_URL: &str = "https://github.com/Pi-Innovations-Pvt-Ltd/homebrew-arduino_agent/releases/download/v1.0.0/agent-1.0.0.tar.gz";

    #[test]
    fn accepts_release_url() {
        let url = SourceUrl::try_from(AGENT_URL).expect("valid URL");
        assert_eq!(url.host(), "github.com");
        assert_eq!(url.file_name(), Some("agent-1.0.0.tar.gz"));
    }

    #[test]
    fn scheme_is_case_insensitive_and_normalised() {
        let url = SourceUrl::try_from("HTTPS://example.com/a.tgz").expect("valid URL");
        assert_eq!(url.as_str(), "https://example.com/a.tgz");
    }

    #[rstest]
    #[case::plain_http("http://example.com/agent.tar.gz")]
    #[case::ftp("ftp://example.com/agent.tar.gz")]
    #[case::no_scheme("example.com/agent.tar.gz")]
    #[case::no_host("https:///agent.tar.gz")]
    #[case::whitespace("https://example.com/my agent.tar.gz")]
    #[case::empty("")]
    #[case::port_out_of_range("https://example.com:99999/agent.tar.gz")]
    #[case::non_numeric_port("https://example.com:notaport/agent.tar.gz")]
    #[case::forbidden_host_chars("https://exa<mple>.com/agent.tar.gz")]
    #[case::unclosed_ipv6("https://[::1/agent.tar.gz")]
    #[case::bad_percent_host("https://ex%zzample.com/agent.tar.gz")]
    fn rejects_malformed_urls(#[case] value: &str) {
        assert!(matches!(
            SourceUrl::try_from(value),
            Err(ManifestError::InvalidUrl { .. })
        ));
    }

    #[rstest]
    #[case("https://example.com/dl/agent.tgz?token=abc", Some("agent.tgz"))]
    #[case("https://example.com/dl/agent.zip#frag", Some("agent.zip"))]
    #[case("https://example.com/dir/", None)]
    #[case("https://example.com", None)]
    fn file_name_ignores_query_and_fragment(#[case] value: &str, #[case] expected: Option<&str>) {
        let url = SourceUrl::try_from(value).expect("valid URL");
        assert_eq!(url.file_name(), expected);
    }

    #[test]
    fn host_strips_port_and_userinfo() {
        let url = SourceUrl::try_from("https://user@mirror.example:8443/a.tgz").expect("valid URL");
        assert_eq!(url.host(), "mirror.example");
    }
}
