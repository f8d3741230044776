//! Directory source with accept-once semantics
//!
//! Each poll lists the source directory and yields every file whose identity
//! has not been emitted before. Identity is the file name, optionally paired
//! with the modification time so that edited files are picked up again.
//! Hidden files (leading `.`) are skipped unless explicitly included.

use crate::error::{FlowError, Result};
use crate::fs::{FileEntry, Filesystem};
use crate::unit::UnitOfWork;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Identity used by the seen-set.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct FileIdentity {
    name: String,
    modified: Option<DateTime<Utc>>,
}

/// Identities already emitted by a source. Never evicts.
#[derive(Debug, Default)]
pub(crate) struct SeenSet {
    entries: HashSet<FileIdentity>,
}

impl SeenSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an identity. Returns false if it was already present.
    pub fn insert(&mut self, identity: FileIdentity) -> bool {
        self.entries.insert(identity)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Polls one directory and emits each new file once.
pub struct DirectorySource {
    dir: PathBuf,
    fs: Arc<dyn Filesystem>,
    seen: SeenSet,
    track_modifications: bool,
    ignore_hidden: bool,
}

impl DirectorySource {
    pub fn new(dir: impl Into<PathBuf>, fs: Arc<dyn Filesystem>) -> Self {
        Self {
            dir: dir.into(),
            fs,
            seen: SeenSet::new(),
            track_modifications: false,
            ignore_hidden: true,
        }
    }

    /// Treat a changed modification time as a new file.
    pub fn with_modification_tracking(mut self, enabled: bool) -> Self {
        self.track_modifications = enabled;
        self
    }

    /// Skip files whose name starts with `.` (the default).
    pub fn with_ignore_hidden(mut self, enabled: bool) -> Self {
        self.ignore_hidden = enabled;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// List the directory and return the not-yet-seen files.
    ///
    /// The listing happens eagerly so an unavailable directory is reported
    /// up front. Entries are marked seen only as the iterator yields them; a
    /// partially consumed poll leaves the rest for the next call.
    pub fn poll(&mut self) -> Result<impl Iterator<Item = UnitOfWork> + '_> {
        let entries = self
            .fs
            .list(&self.dir)
            .map_err(|source| FlowError::SourceUnavailable {
                dir: self.dir.clone(),
                source,
            })?;

        let track = self.track_modifications;
        let ignore_hidden = self.ignore_hidden;
        let seen = &mut self.seen;
        Ok(entries.into_iter().filter_map(move |entry| {
            if ignore_hidden && entry.name.starts_with('.') {
                return None;
            }
            let identity = identity_of(&entry, track);
            if seen.insert(identity) {
                Some(UnitOfWork::from(entry))
            } else {
                None
            }
        }))
    }

    /// Forget every emitted identity; all present files are emitted again.
    pub fn reset(&mut self) {
        self.seen.clear();
    }

    pub fn seen_count(&self) -> usize {
        self.seen.len()
    }
}

fn identity_of(entry: &FileEntry, track_modifications: bool) -> FileIdentity {
    FileIdentity {
        name: entry.name.clone(),
        modified: if track_modifications {
            entry.modified
        } else {
            None
        },
    }
}
