//! Destination sink with whole-file replacement

use crate::error::{FlowError, Result};
use crate::fs::Filesystem;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

/// What to do when the destination file already exists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverwriteMode {
    /// Atomically replace the existing file.
    #[default]
    Replace,
}

impl OverwriteMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            OverwriteMode::Replace => "replace",
        }
    }
}

/// Writes processed content under the original file name.
pub struct Sink {
    dir: PathBuf,
    fs: Arc<dyn Filesystem>,
    mode: OverwriteMode,
}

impl Sink {
    pub fn new(dir: impl Into<PathBuf>, fs: Arc<dyn Filesystem>, mode: OverwriteMode) -> Self {
        Self {
            dir: dir.into(),
            fs,
            mode,
        }
    }

    /// Write `content` to `dir/name`. Returns the final path.
    pub fn write(&self, name: &str, content: &str) -> Result<PathBuf> {
        match self.mode {
            OverwriteMode::Replace => self
                .fs
                .write_replace(&self.dir, name, content.as_bytes())
                .map_err(|source| FlowError::Write {
                    name: name.to_string(),
                    source,
                })?,
        }
        let path = self.dir.join(name);
        debug!(name = %name, path = %path.display(), mode = self.mode.as_str(), "Sink wrote file");
        Ok(path)
    }
}
