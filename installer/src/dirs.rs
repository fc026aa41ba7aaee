//! Platform directory lookup.
//!
//! Wraps `directories-next` behind a trait so prefix resolution can be
//! tested without touching the real home directory.

use std::path::PathBuf;

/// Source of per-user base directories.
#[cfg_attr(test, mockall::automock)]
pub trait BaseDirs {
    /// The current user's home directory, if one is known.
    fn home_dir(&self) -> Option<PathBuf>;
}

/// [`BaseDirs`] backed by the operating system.
///
/// # Examples
///
/// ```no_run
/// use keg_installer::dirs::{BaseDirs, SystemBaseDirs};
///
/// let dirs = SystemBaseDirs;
/// println!("{:?}", dirs.home_dir());
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemBaseDirs;

impl BaseDirs for SystemBaseDirs {
    fn home_dir(&self) -> Option<PathBuf> {
        directories_next::BaseDirs::new().map(|dirs| dirs.home_dir().to_path_buf())
    }
}
