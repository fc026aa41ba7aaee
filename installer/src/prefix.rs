//! Install prefix resolution.
//!
//! The prefix comes from `--prefix`, then `KEG_PREFIX`, then `~/.local`.
//! The result is always absolute so placeholders in test commands expand
//! to usable paths.

use camino::{Utf8Path, Utf8PathBuf};
use log::debug;

use crate::dirs::BaseDirs;
use crate::error::{InstallerError, Result};

/// Environment variable overriding the default install prefix.
pub const PREFIX_ENV: &str = "KEG_PREFIX";

/// Directory under the home directory used when no prefix is given.
const DEFAULT_PREFIX_DIR: &str = ".local";

/// Resolve the install prefix.
///
/// # Errors
///
/// Returns [`InstallerError::PrefixUnavailable`] when no prefix is given and
/// the home directory is unknown, or when the chosen path is not valid
/// UTF-8 or cannot be made absolute.
pub fn resolve_prefix(cli: Option<&Utf8Path>, dirs: &dyn BaseDirs) -> Result<Utf8PathBuf> {
    let chosen = match cli {
        Some(path) => path.to_path_buf(),
        None => match env_prefix()? {
            Some(path) => path,
            None => default_prefix(dirs)?,
        },
    };
    let absolute = absolutize(&chosen)?;
    debug!("resolved install prefix {absolute}");
    Ok(absolute)
}

fn env_prefix() -> Result<Option<Utf8PathBuf>> {
    let Some(value) = std::env::var_os(PREFIX_ENV) else {
        return Ok(None);
    };
    if value.is_empty() {
        return Ok(None);
    }
    let value = value
        .into_string()
        .map_err(|_| InstallerError::PrefixUnavailable {
            reason: format!("{PREFIX_ENV} is not valid UTF-8"),
        })?;
    Ok(Some(Utf8PathBuf::from(value)))
}

fn default_prefix(dirs: &dyn BaseDirs) -> Result<Utf8PathBuf> {
    let home = dirs
        .home_dir()
        .ok_or_else(|| InstallerError::PrefixUnavailable {
            reason: format!("no home directory; pass --prefix or set {PREFIX_ENV}"),
        })?;
    let home =
        Utf8PathBuf::from_path_buf(home).map_err(|path| InstallerError::PrefixUnavailable {
            reason: format!("home directory is not valid UTF-8: {}", path.display()),
        })?;
    Ok(home.join(DEFAULT_PREFIX_DIR))
}

fn absolutize(path: &Utf8Path) -> Result<Utf8PathBuf> {
    let absolute =
        std::path::absolute(path).map_err(|e| InstallerError::PrefixUnavailable {
            reason: format!("cannot resolve {path}: {e}"),
        })?;
    Utf8PathBuf::from_path_buf(absolute).map_err(|path| InstallerError::PrefixUnavailable {
        reason: format!("prefix is not valid UTF-8: {}", path.display()),
    })
}
