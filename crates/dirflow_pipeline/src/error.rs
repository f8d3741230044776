//! Error types for the pipeline

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Pipeline error type
#[derive(Error, Debug)]
pub enum FlowError {
    #[error("Source directory unavailable: {}: {}", .dir.display(), .source)]
    SourceUnavailable {
        dir: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Ordering buffer full ({capacity} units), dropped {name}")]
    CapacityExceeded { name: String, capacity: usize },

    #[error("Transform failed for {name}: {cause}")]
    Transform {
        name: String,
        #[source]
        cause: TransformCause,
    },

    #[error("Write failed for {name}: {source}")]
    Write {
        name: String,
        #[source]
        source: io::Error,
    },

    #[error("Config error: {0}")]
    Config(String),

    #[error("Scheduler error: {0}")]
    Scheduler(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Why a unit could not be turned into processed content.
#[derive(Error, Debug)]
pub enum TransformCause {
    #[error("read failed: {0}")]
    Read(#[from] io::Error),

    #[error("content is not valid UTF-8: {0}")]
    Decode(#[from] std::str::Utf8Error),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, FlowError>;
