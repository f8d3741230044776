//! Filesystem collaborator
//!
//! The pipeline only needs three operations from the filesystem: list a
//! directory, read a file and replace a file. `LocalFs` implements them on
//! the local disk; tests can substitute their own implementation.

use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// A regular file found in a directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub name: String,
    pub path: PathBuf,
    pub modified: Option<DateTime<Utc>>,
}

/// Operations the pipeline requires from the filesystem.
pub trait Filesystem: Send + Sync {
    /// List regular files directly inside `dir`.
    fn list(&self, dir: &Path) -> io::Result<Vec<FileEntry>>;

    /// Read the full contents of a file.
    fn read(&self, path: &Path) -> io::Result<Vec<u8>>;

    /// Write `bytes` to `dir/name`, replacing any existing file as a whole.
    fn write_replace(&self, dir: &Path, name: &str, bytes: &[u8]) -> io::Result<()>;
}

/// Local disk implementation.
///
/// Entries that cannot be listed (unreadable, non UTF-8 names) never reach
/// the seen-set, so they come back on every poll. Each one is warned about
/// once and logged at debug level afterwards.
#[derive(Debug, Default)]
pub struct LocalFs {
    reported: Mutex<HashSet<PathBuf>>,
}

impl LocalFs {
    pub fn new() -> Self {
        Self::default()
    }

    /// True the first time `path` is reported as skipped.
    fn first_report(&self, path: &Path) -> bool {
        self.reported
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(path.to_path_buf())
    }

    fn report_skipped(&self, path: &Path, reason: &str) {
        if self.first_report(path) {
            warn!(path = %path.display(), reason, "Skipping entry");
        } else {
            debug!(path = %path.display(), reason, "Skipping entry");
        }
    }
}

impl Filesystem for LocalFs {
    fn list(&self, dir: &Path) -> io::Result<Vec<FileEntry>> {
        let meta = fs::metadata(dir)?;
        if !meta.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} is not a directory", dir.display()),
            ));
        }

        let mut entries = Vec::new();
        for entry in WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .follow_links(true)
        {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) if err.depth() == 0 => {
                    return Err(walk_error_to_io(err));
                }
                Err(err) => {
                    let path = err.path().unwrap_or(dir).to_path_buf();
                    self.report_skipped(&path, &err.to_string());
                    continue;
                }
            };

            if !entry.file_type().is_file() {
                continue;
            }

            let Some(name) = entry.file_name().to_str() else {
                self.report_skipped(entry.path(), "file name is not UTF-8");
                continue;
            };

            let modified = entry
                .metadata()
                .ok()
                .and_then(|m| m.modified().ok())
                .map(DateTime::<Utc>::from);

            entries.push(FileEntry {
                name: name.to_string(),
                path: entry.path().to_path_buf(),
                modified,
            });
        }

        Ok(entries)
    }

    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        fs::read(path)
    }

    fn write_replace(&self, dir: &Path, name: &str, bytes: &[u8]) -> io::Result<()> {
        validate_file_name(name)?;
        fs::create_dir_all(dir)?;

        let final_path = dir.join(name);

        // Unique staging name next to the target: the rename stays on one
        // filesystem and never lands on another output or an existing file.
        let mut builder = tempfile::Builder::new();
        builder.prefix(".dirflow-").suffix(".tmp");
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            builder.permissions(fs::Permissions::from_mode(0o644));
        }

        // The staged file is deleted on drop if any step fails
        let mut staged = builder.tempfile_in(dir)?;
        staged.write_all(bytes)?;
        staged.as_file().sync_all()?;
        staged.persist(&final_path).map_err(|err| err.error)?;

        debug!(path = %final_path.display(), bytes = bytes.len(), "Replaced file");
        Ok(())
    }
}

fn validate_file_name(name: &str) -> io::Result<()> {
    let invalid = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains('/')
        || name.contains('\\');
    if invalid {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("invalid destination file name: {:?}", name),
        ));
    }
    Ok(())
}

fn walk_error_to_io(err: walkdir::Error) -> io::Error {
    let message = err.to_string();
    err.into_io_error()
        .unwrap_or_else(|| io::Error::new(io::ErrorKind::Other, message))
}
