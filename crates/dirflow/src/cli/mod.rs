//! CLI commands for dirflow
//!
//! `run` and `once` drive the pipeline, `config` inspects and writes the
//! configuration file. Every command resolves its configuration the same way,
//! see [`config::resolve`].

pub mod config;
pub mod output;
pub mod run;

use dirflow_pipeline::{AdmissionRule, PipelineConfig, TransformPolicy};
use std::path::PathBuf;

/// Pipeline settings that can be overridden per invocation.
///
/// Each flag also reads a `DIRFLOW_*` environment variable. Unset flags leave
/// the file (or default) value alone.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct PipelineOverrides {
    /// Directory polled for new files
    #[arg(long, global = true, env = "DIRFLOW_SOURCE", value_name = "DIR")]
    pub source: Option<PathBuf>,

    /// Directory processed files are written to
    #[arg(long, global = true, env = "DIRFLOW_DEST", value_name = "DIR")]
    pub dest: Option<PathBuf>,

    /// Admit files whose name ends with this suffix (e.g. ".txt")
    #[arg(long, global = true, env = "DIRFLOW_SUFFIX", conflicts_with = "glob")]
    pub suffix: Option<String>,

    /// Admit files whose name matches this glob (e.g. "report-*.txt")
    #[arg(long, global = true, env = "DIRFLOW_GLOB")]
    pub glob: Option<String>,

    /// Milliseconds between directory polls
    #[arg(long = "intake-ms", global = true, env = "DIRFLOW_INTAKE_MS", value_name = "MS")]
    pub intake_ms: Option<u64>,

    /// Milliseconds between buffer drains
    #[arg(long = "dispatch-ms", global = true, env = "DIRFLOW_DISPATCH_MS", value_name = "MS")]
    pub dispatch_ms: Option<u64>,

    /// Maximum number of files waiting for dispatch
    #[arg(long, global = true, env = "DIRFLOW_CAPACITY")]
    pub capacity: Option<usize>,

    /// Content transform: uppercase or identity
    #[arg(long, global = true, env = "DIRFLOW_TRANSFORM")]
    pub transform: Option<TransformPolicy>,

    /// Re-process files whose modification time changed
    #[arg(long, global = true)]
    pub track_modifications: bool,

    /// Drain the buffer one last time on shutdown
    #[arg(long, global = true)]
    pub drain_on_shutdown: bool,

    /// Also process files whose name starts with `.`
    #[arg(long, global = true)]
    pub include_hidden: bool,
}

impl PipelineOverrides {
    /// Apply every set override on top of `config`.
    pub fn apply(&self, config: &mut PipelineConfig) {
        if let Some(source) = &self.source {
            config.source_dir = source.clone();
        }
        if let Some(dest) = &self.dest {
            config.destination_dir = dest.clone();
        }
        if let Some(suffix) = &self.suffix {
            config.admission = AdmissionRule::Suffix(suffix.clone());
        }
        if let Some(glob) = &self.glob {
            config.admission = AdmissionRule::Glob(glob.clone());
        }
        if let Some(ms) = self.intake_ms {
            config.intake_interval_ms = ms;
        }
        if let Some(ms) = self.dispatch_ms {
            config.dispatch_interval_ms = ms;
        }
        if let Some(capacity) = self.capacity {
            config.buffer_capacity = capacity;
        }
        if let Some(transform) = self.transform {
            config.transform = transform;
        }
        if self.track_modifications {
            config.track_modifications = true;
        }
        if self.drain_on_shutdown {
            config.drain_on_shutdown = true;
        }
        if self.include_hidden {
            config.ignore_hidden = false;
        }
    }
}
