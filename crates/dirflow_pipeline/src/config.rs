//! Configuration for a pipeline instance

use crate::error::{FlowError, Result};
use crate::filter::{AdmissionFilter, AdmissionRule};
use crate::ordering::DEFAULT_CAPACITY;
use crate::sink::OverwriteMode;
use crate::transform::TransformPolicy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Pipeline configuration. Immutable once the pipeline is assembled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineConfig {
    /// Directory polled for new files
    #[serde(default = "default_source_dir")]
    pub source_dir: PathBuf,

    /// Directory processed files are written to
    #[serde(default = "default_destination_dir")]
    pub destination_dir: PathBuf,

    /// Milliseconds between directory polls
    #[serde(default = "default_intake_interval_ms")]
    pub intake_interval_ms: u64,

    /// Milliseconds between buffer drains
    #[serde(default = "default_dispatch_interval_ms")]
    pub dispatch_interval_ms: u64,

    /// Maximum number of admitted units waiting for dispatch
    #[serde(default = "default_buffer_capacity")]
    pub buffer_capacity: usize,

    #[serde(default)]
    pub overwrite_mode: OverwriteMode,

    #[serde(default)]
    pub transform: TransformPolicy,

    /// Re-emit files whose modification time changed
    #[serde(default)]
    pub track_modifications: bool,

    /// Skip files whose name starts with `.`
    #[serde(default = "default_true")]
    pub ignore_hidden: bool,

    /// Run one last drain after the loops stop
    #[serde(default)]
    pub drain_on_shutdown: bool,

    /// Which file names are admitted
    #[serde(default)]
    pub admission: AdmissionRule,
}

fn default_source_dir() -> PathBuf {
    PathBuf::from("input_dir")
}

fn default_destination_dir() -> PathBuf {
    PathBuf::from("output_dir")
}

fn default_intake_interval_ms() -> u64 {
    5_000
}

fn default_dispatch_interval_ms() -> u64 {
    10_000
}

fn default_true() -> bool {
    true
}

fn default_buffer_capacity() -> usize {
    DEFAULT_CAPACITY
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            source_dir: default_source_dir(),
            destination_dir: default_destination_dir(),
            intake_interval_ms: default_intake_interval_ms(),
            dispatch_interval_ms: default_dispatch_interval_ms(),
            buffer_capacity: default_buffer_capacity(),
            overwrite_mode: OverwriteMode::default(),
            transform: TransformPolicy::default(),
            track_modifications: false,
            ignore_hidden: true,
            drain_on_shutdown: false,
            admission: AdmissionRule::default(),
        }
    }
}

impl PipelineConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
            .map_err(|e| FlowError::Config(format!("{}: {}", path.display(), e)))
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| FlowError::Config(e.to_string()))
    }

    /// Save configuration to a TOML file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = self.to_toml_string()?;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| FlowError::Config(e.to_string()))
    }

    /// Reject values the scheduler cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.intake_interval_ms == 0 {
            return Err(FlowError::Config(
                "intake_interval_ms must be greater than zero".to_string(),
            ));
        }
        if self.dispatch_interval_ms == 0 {
            return Err(FlowError::Config(
                "dispatch_interval_ms must be greater than zero".to_string(),
            ));
        }
        if self.buffer_capacity == 0 {
            return Err(FlowError::Config(
                "buffer_capacity must be greater than zero".to_string(),
            ));
        }
        if self.source_dir.as_os_str().is_empty() || self.destination_dir.as_os_str().is_empty() {
            return Err(FlowError::Config(
                "source_dir and destination_dir must be set".to_string(),
            ));
        }
        AdmissionFilter::from_rule(&self.admission)?;
        Ok(())
    }

    pub fn intake_interval(&self) -> Duration {
        Duration::from_millis(self.intake_interval_ms)
    }

    pub fn dispatch_interval(&self) -> Duration {
        Duration::from_millis(self.dispatch_interval_ms)
    }
}
