//! Units of work flowing through the pipeline

use crate::fs::{FileEntry, Filesystem};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::io;
use std::path::{Path, PathBuf};

/// One source file tracked from discovery to a terminal outcome.
///
/// The name is the ordering key and the destination filename; it never
/// changes. The payload is loaded lazily at dispatch time.
#[derive(Debug, Clone)]
pub struct UnitOfWork {
    name: String,
    path: PathBuf,
    modified: Option<DateTime<Utc>>,
    payload: Option<Vec<u8>>,
}

impl UnitOfWork {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            modified: None,
            payload: None,
        }
    }

    pub fn with_modified(mut self, modified: Option<DateTime<Utc>>) -> Self {
        self.modified = modified;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn modified(&self) -> Option<DateTime<Utc>> {
        self.modified
    }

    /// Read the payload through the filesystem on first access.
    pub fn load(&mut self, fs: &dyn Filesystem) -> io::Result<&[u8]> {
        if self.payload.is_none() {
            self.payload = Some(fs.read(&self.path)?);
        }
        Ok(self.payload.as_deref().unwrap_or_default())
    }
}

impl From<FileEntry> for UnitOfWork {
    fn from(entry: FileEntry) -> Self {
        UnitOfWork::new(entry.name, entry.path).with_modified(entry.modified)
    }
}

/// Lifecycle of a unit of work.
///
/// `Discovered → Admitted → Buffered → Dispatched → {Written | TransformFailed | WriteFailed}`,
/// with `Rejected` and `Dropped` as early exits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitState {
    Discovered,
    Admitted,
    Buffered,
    Dispatched,
    Written,
    TransformFailed,
    WriteFailed,
    Rejected,
    /// Ordering buffer was full on insert.
    Dropped,
}

impl UnitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnitState::Discovered => "discovered",
            UnitState::Admitted => "admitted",
            UnitState::Buffered => "buffered",
            UnitState::Dispatched => "dispatched",
            UnitState::Written => "written",
            UnitState::TransformFailed => "transform_failed",
            UnitState::WriteFailed => "write_failed",
            UnitState::Rejected => "rejected",
            UnitState::Dropped => "dropped",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            UnitState::Written
                | UnitState::TransformFailed
                | UnitState::WriteFailed
                | UnitState::Rejected
                | UnitState::Dropped
        )
    }
}

impl std::fmt::Display for UnitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
