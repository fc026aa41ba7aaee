//! All-or-nothing placement of installed files.
//!
//! Files are first copied to hidden sibling paths next to their
//! destinations. Only when every file has been staged are they renamed into
//! place. A destination that already exists is moved aside and restored if a
//! later rename fails. Dropping an uncommitted [`StagedInstall`] removes the
//! staged copies and any directories created for them.

use camino::{Utf8Path, Utf8PathBuf};
use log::{debug, trace, warn};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// A filesystem failure while staging or committing, with the path involved.
#[derive(Debug, thiserror::Error)]
#[error("{path}: {source}")]
pub struct StageError {
    /// The path the failed operation acted on.
    pub path: Utf8PathBuf,
    /// The underlying I/O error.
    #[source]
    pub source: io::Error,
}

impl StageError {
    fn new(path: &Utf8Path, source: io::Error) -> Self {
        Self {
            path: path.to_owned(),
            source,
        }
    }
}

/// One file to copy from the extracted archive into the prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedCopy {
    /// Extracted file to copy.
    pub source: PathBuf,
    /// Absolute destination inside the install prefix.
    pub destination: Utf8PathBuf,
}

/// Copies planned files next to their destinations.
#[derive(Debug, Clone)]
pub struct Stager {
    tag: String,
}

impl Stager {
    /// Create a stager whose temporary names are unique to this process.
    #[must_use]
    pub fn new() -> Self {
        Self {
            tag: format!("keg-{}", std::process::id()),
        }
    }

    /// Stage every planned copy.
    ///
    /// Nothing is visible at any destination path after this call; the
    /// returned [`StagedInstall`] must be committed.
    ///
    /// # Errors
    ///
    /// Returns a [`StageError`] if a directory cannot be created or a file
    /// cannot be copied. Everything staged so far is removed.
    pub fn stage(&self, plan: &[PlannedCopy]) -> Result<StagedInstall, StageError> {
        let mut staged = StagedInstall {
            tag: self.tag.clone(),
            files: Vec::with_capacity(plan.len()),
            created_dirs: Vec::new(),
            committed: false,
        };
        for copy in plan {
            let parent = copy
                .destination
                .parent()
                .ok_or_else(|| {
                    StageError::new(
                        &copy.destination,
                        io::Error::new(io::ErrorKind::InvalidInput, "destination has no parent"),
                    )
                })?
                .to_owned();
            create_missing_dirs(&parent, &mut staged.created_dirs)?;

            let staged_path = self.sibling(&copy.destination, "staged");
            copy_with_permissions(&copy.source, &staged_path)?;
            trace!("staged {} at {staged_path}", copy.source.display());
            staged.files.push(StagedFile {
                staged: staged_path,
                destination: copy.destination.clone(),
            });
        }
        Ok(staged)
    }

    fn sibling(&self, destination: &Utf8Path, role: &str) -> Utf8PathBuf {
        sibling_path(destination, &self.tag, role)
    }
}

impl Default for Stager {
    fn default() -> Self {
        Self::new()
    }
}

/// Compute a hidden sibling path such as `bin/.agent.keg-42.staged`.
fn sibling_path(destination: &Utf8Path, tag: &str, role: &str) -> Utf8PathBuf {
    let file_name = destination.file_name().unwrap_or("file");
    destination.with_file_name(format!(".{file_name}.{tag}.{role}"))
}

#[derive(Debug)]
struct StagedFile {
    staged: Utf8PathBuf,
    destination: Utf8PathBuf,
}

/// Files staged beside their destinations, waiting to be committed.
#[derive(Debug)]
pub struct StagedInstall {
    tag: String,
    files: Vec<StagedFile>,
    created_dirs: Vec<Utf8PathBuf>,
    committed: bool,
}

/// A destination that has been replaced during commit.
#[derive(Debug)]
struct Replaced {
    destination: Utf8PathBuf,
    backup: Option<Utf8PathBuf>,
}

impl StagedInstall {
    /// Rename every staged file to its destination.
    ///
    /// Returns the destinations in plan order.
    ///
    /// # Errors
    ///
    /// Returns a [`StageError`] if any rename fails. Destinations replaced
    /// before the failure are restored from their backups, and new files are
    /// removed, so the prefix is left as it was.
    pub fn commit(mut self) -> Result<Vec<Utf8PathBuf>, StageError> {
        let mut replaced: Vec<Replaced> = Vec::with_capacity(self.files.len());
        for file in &self.files {
            if let Err(err) = self.replace(file, &mut replaced) {
                warn!("commit failed at {}; rolling back", err.path);
                rollback(&replaced);
                return Err(err);
            }
        }

        for backup in replaced.iter().filter_map(|r| r.backup.as_ref()) {
            if let Err(err) = fs::remove_file(backup) {
                warn!("failed to remove backup {backup}: {err}");
            }
        }
        self.committed = true;
        debug!("committed {} file(s)", self.files.len());
        Ok(self.files.iter().map(|f| f.destination.clone()).collect())
    }

    /// Number of staged files.
    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Return true when nothing is staged.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    fn replace(&self, file: &StagedFile, replaced: &mut Vec<Replaced>) -> Result<(), StageError> {
        if file.destination.is_dir() {
            return Err(StageError::new(
                &file.destination,
                io::Error::other("destination is a directory"),
            ));
        }
        let backup = if file.destination.exists() {
            let backup = sibling_path(&file.destination, &self.tag, "backup");
            fs::rename(&file.destination, &backup)
                .map_err(|e| StageError::new(&file.destination, e))?;
            Some(backup)
        } else {
            None
        };
        let rename = fs::rename(&file.staged, &file.destination);
        replaced.push(Replaced {
            destination: file.destination.clone(),
            backup,
        });
        if let Err(err) = rename {
            // Undo our own move-aside before reporting.
            if let Some(rolled) = replaced.pop() {
                rollback(std::slice::from_ref(&rolled));
            }
            return Err(StageError::new(&file.destination, err));
        }
        Ok(())
    }
}

/// Restore replaced destinations, newest first.
fn rollback(replaced: &[Replaced]) {
    for entry in replaced.iter().rev() {
        let outcome = match &entry.backup {
            Some(backup) => fs::rename(backup, &entry.destination),
            None => remove_if_exists(entry.destination.as_std_path()),
        };
        if let Err(err) = outcome {
            warn!("failed to restore {}: {err}", entry.destination);
        }
    }
}

impl Drop for StagedInstall {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        for file in &self.files {
            if let Err(err) = remove_if_exists(file.staged.as_std_path()) {
                warn!("failed to remove staged file {}: {err}", file.staged);
            }
        }
        for dir in self.created_dirs.iter().rev() {
            // Only directories we created and left empty are removed.
            if fs::remove_dir(dir).is_err() {
                trace!("left directory {dir} in place");
            }
        }
    }
}

fn remove_if_exists(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Err(err) if err.kind() != io::ErrorKind::NotFound => Err(err),
        _ => Ok(()),
    }
}

/// Create `dir` and any missing ancestors, recording each directory created.
fn create_missing_dirs(dir: &Utf8Path, created: &mut Vec<Utf8PathBuf>) -> Result<(), StageError> {
    let missing: Vec<&Utf8Path> = dir
        .ancestors()
        .take_while(|d| !d.as_str().is_empty() && !d.exists())
        .collect();
    for missing_dir in missing.into_iter().rev() {
        match fs::create_dir(missing_dir) {
            Ok(()) => created.push(missing_dir.to_owned()),
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {}
            Err(err) => return Err(StageError::new(missing_dir, err)),
        }
    }
    Ok(())
}

/// Copy `source` to `dest`, carrying the permission bits across.
fn copy_with_permissions(source: &Path, dest: &Utf8Path) -> Result<(), StageError> {
    fs::copy(source, dest).map_err(|e| StageError::new(dest, e))?;
    let permissions = fs::metadata(source)
        .map_err(|e| StageError::new(dest, e))?
        .permissions();
    fs::set_permissions(dest, permissions).map_err(|e| StageError::new(dest, e))
}

#[cfg(test)]
#[path = "stager_tests.rs"]
mod tests;
