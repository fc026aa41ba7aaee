//! Install entries mapping archive paths to prefix-relative destinations.

use super::error::{ManifestError, Result};
use camino::{Utf8Component, Utf8Path, Utf8PathBuf};
use std::fmt;

/// Directory, relative to the install prefix, that receives binaries.
pub const BIN_DIR: &str = "bin";

/// One file to copy out of the extracted archive.
///
/// Both paths are relative and contain no `..` components, so neither can
/// escape the extraction directory or the install prefix.
///
/// # Examples
///
/// ```
/// use keg_installer::manifest::install_entry::InstallEntry;
///
/// let entry = InstallEntry::binary("agent").unwrap();
/// assert_eq!(entry.source().as_str(), "agent");
/// assert_eq!(entry.destination().as_str(), "bin/agent");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InstallEntry {
    source: Utf8PathBuf,
    destination: Utf8PathBuf,
}

impl InstallEntry {
    /// Create an entry copying `source` to `destination`.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::InvalidInstallEntry`] if either path is
    /// empty, absolute, escapes via `..`, or has no file name.
    pub fn new(source: &str, destination: &str) -> Result<Self> {
        Ok(Self {
            source: validate_relative(source)?,
            destination: validate_relative(destination)?,
        })
    }

    /// Create an entry that installs `source` into `bin/` under its own
    /// file name, the equivalent of Homebrew's `bin.install "agent"`.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::InvalidInstallEntry`] if `source` is not a
    /// valid relative path.
    pub fn binary(source: &str) -> Result<Self> {
        let source = validate_relative(source)?;
        let file_name = source
            .file_name()
            .ok_or_else(|| ManifestError::InvalidInstallEntry {
                value: source.to_string(),
                reason: "path has no file name".to_owned(),
            })?;
        let destination = Utf8Path::new(BIN_DIR).join(file_name);
        Ok(Self {
            source,
            destination,
        })
    }

    /// Path of the file inside the extracted archive.
    #[must_use]
    pub fn source(&self) -> &Utf8Path {
        &self.source
    }

    /// Path of the installed file relative to the install prefix.
    #[must_use]
    pub fn destination(&self) -> &Utf8Path {
        &self.destination
    }

    /// Resolve the destination against an install prefix.
    #[must_use]
    pub fn destination_in(&self, prefix: &Utf8Path) -> Utf8PathBuf {
        prefix.join(&self.destination)
    }
}

impl fmt::Display for InstallEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.source, self.destination)
    }
}

/// Validate that `value` is a non-empty relative path that stays inside
/// its base directory and names a file.
///
/// `.` components are dropped, so `./bin/agent` comes back as `bin/agent`.
fn validate_relative(value: &str) -> Result<Utf8PathBuf> {
    let invalid = |reason: &str| ManifestError::InvalidInstallEntry {
        value: value.to_owned(),
        reason: reason.to_owned(),
    };
    if value.trim().is_empty() {
        return Err(invalid("path must not be empty"));
    }
    let mut path = Utf8PathBuf::new();
    for component in Utf8Path::new(value).components() {
        match component {
            Utf8Component::Prefix(_) | Utf8Component::RootDir => {
                return Err(invalid("path must be relative"));
            }
            Utf8Component::ParentDir => {
                return Err(invalid("path must not contain '..'"));
            }
            Utf8Component::CurDir => {}
            Utf8Component::Normal(part) => path.push(part),
        }
    }
    if path.file_name().is_none() {
        return Err(invalid("path has no file name"));
    }
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn explicit_entry_keeps_both_paths() {
        let entry = InstallEntry::new("dist/agent", "libexec/agent").expect("valid entry");
        assert_eq!(entry.source(), Utf8Path::new("dist/agent"));
        assert_eq!(entry.destination(), Utf8Path::new("libexec/agent"));
    }

    #[test]
    fn binary_shorthand_uses_file_name() {
        let entry = InstallEntry::binary("agent-1.0.0/agent").expect("valid entry");
        assert_eq!(entry.destination(), Utf8Path::new("bin/agent"));
    }

    #[test]
    fn destination_in_joins_prefix() {
        let entry = InstallEntry::binary("agent").expect("valid entry");
        let resolved = entry.destination_in(Utf8Path::new("/opt/keg"));
        assert_eq!(resolved, Utf8PathBuf::from("/opt/keg/bin/agent"));
    }

    #[rstest]
    #[case::empty("")]
    #[case::blank("   ")]
    #[case::absolute("/usr/bin/agent")]
    #[case::parent("../agent")]
    #[case::nested_parent("bin/../../agent")]
    #[case::dot_only(".")]
    fn rejects_unsafe_paths(#[case] value: &str) {
        assert!(matches!(
            InstallEntry::new(value, "bin/agent"),
            Err(ManifestError::InvalidInstallEntry { .. })
        ));
        assert!(matches!(
            InstallEntry::new("agent", value),
            Err(ManifestError::InvalidInstallEntry { .. })
        ));
    }

    #[rstest]
    #[case::leading("./bin/agent")]
    #[case::inner("bin/./agent")]
    #[case::repeated("././bin/agent")]
    fn current_dir_components_are_dropped(#[case] value: &str) {
        let entry = InstallEntry::new("agent", value).expect("valid entry");
        assert_eq!(entry.destination(), Utf8Path::new("bin/agent"));
    }

    #[test]
    fn display_shows_mapping() {
        let entry = InstallEntry::binary("agent").expect("valid entry");
        assert_eq!(entry.to_string(), "agent -> bin/agent");
    }
}
