//! Collision-safe backups taken before a file is modified.
//!
//! The first backup of `song.mp3` is `song.mp3.backup`; later ones are
//! `song.mp3.backup.1`, `song.mp3.backup.2`, and so on. Candidates are created
//! with `create_new`, so an existing backup is never overwritten even when two
//! workers race on the same name.

use core_runtime::logging::strip_path;
use std::ffi::OsString;
use std::fs::{self, File, FileTimes, Metadata, OpenOptions};
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::{MetadataError, Result};

const DEFAULT_SUFFIX: &str = ".backup";

/// Creates numbered backup copies next to the original file.
#[derive(Debug, Clone)]
pub struct BackupManager {
    suffix: String,
}

impl BackupManager {
    pub fn new() -> Self {
        Self {
            suffix: DEFAULT_SUFFIX.to_string(),
        }
    }

    /// Uses `suffix` instead of `.backup`.
    pub fn with_suffix(suffix: impl Into<String>) -> Self {
        Self {
            suffix: suffix.into(),
        }
    }

    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    /// Candidate name for the given attempt (0 = first choice).
    pub fn candidate_path(&self, path: &Path, attempt: usize) -> PathBuf {
        let mut name: OsString = path.file_name().map(OsString::from).unwrap_or_default();
        name.push(&self.suffix);
        if attempt > 0 {
            name.push(format!(".{}", attempt));
        }
        path.with_file_name(name)
    }

    /// Copies `path` to the first unused backup name and returns that name.
    ///
    /// Content, permissions and access/modification times are carried over;
    /// failing to restore times or permissions is logged, not fatal.
    ///
    /// # Errors
    ///
    /// - `MetadataError::InvalidInput` if `path` is not a regular file
    /// - `MetadataError::BackupFailed` if the source cannot be read or the copy
    ///   cannot be created. A partially written copy is removed.
    pub fn backup(&self, path: &Path) -> Result<PathBuf> {
        let metadata = fs::metadata(path).map_err(|e| backup_error(path, e))?;
        if !metadata.is_file() {
            return Err(MetadataError::InvalidInput(format!(
                "{} is not a regular file",
                file_label(path)
            )));
        }

        let mut attempt = 0usize;
        loop {
            let candidate = self.candidate_path(path, attempt);
            match OpenOptions::new().write(true).create_new(true).open(&candidate) {
                Ok(mut dest) => {
                    if let Err(e) = copy_contents(path, &mut dest) {
                        drop(dest);
                        if let Err(cleanup) = fs::remove_file(&candidate) {
                            warn!(
                                backup = %file_label(&candidate),
                                error = %cleanup,
                                "Failed to remove incomplete backup"
                            );
                        }
                        return Err(backup_error(path, e));
                    }
                    preserve_metadata(&dest, &candidate, &metadata);

                    debug!(
                        source = %file_label(path),
                        backup = %file_label(&candidate),
                        "Created backup"
                    );
                    return Ok(candidate);
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => attempt += 1,
                Err(e) => return Err(backup_error(path, e)),
            }
        }
    }
}

impl Default for BackupManager {
    fn default() -> Self {
        Self::new()
    }
}

fn copy_contents(source: &Path, dest: &mut File) -> io::Result<()> {
    let mut reader = File::open(source)?;
    io::copy(&mut reader, dest)?;
    dest.sync_all()
}

fn preserve_metadata(dest: &File, dest_path: &Path, source: &Metadata) {
    let mut times = FileTimes::new();
    if let Ok(accessed) = source.accessed() {
        times = times.set_accessed(accessed);
    }
    if let Ok(modified) = source.modified() {
        times = times.set_modified(modified);
    }
    if let Err(e) = dest.set_times(times) {
        warn!(backup = %file_label(dest_path), error = %e, "Could not preserve backup timestamps");
    }

    if let Err(e) = fs::set_permissions(dest_path, source.permissions()) {
        warn!(backup = %file_label(dest_path), error = %e, "Could not preserve backup permissions");
    }
}

fn backup_error(path: &Path, err: io::Error) -> MetadataError {
    MetadataError::BackupFailed(format!("{}: {}", file_label(path), err))
}

fn file_label(path: &Path) -> String {
    strip_path(&path.to_string_lossy()).to_string()
}
