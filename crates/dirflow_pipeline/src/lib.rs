//! Dirflow Pipeline - Polling Directory ETL Engine
//!
//! Watches a source directory, admits files by name, orders them, transforms
//! their content and writes the result to a destination directory.
//!
//! # Architecture
//!
//! ```text
//!  intake tick                                     dispatch tick
//!      │                                                 │
//! ┌────▼──────┐   ┌───────────┐   ┌────────────┐   ┌─────▼─────┐   ┌────────┐
//! │ Directory │──▶│ Admission │──▶│  Ordering  │──▶│ Transform │──▶│  Sink  │
//! │  Source   │   │  Filter   │   │   Buffer   │   │   Stage   │   │        │
//! └───────────┘   └───────────┘   └────────────┘   └───────────┘   └────────┘
//! ```
//!
//! # Core Concepts
//!
//! - **UnitOfWork**: one source file, identified by its name
//! - **SeenSet**: names already emitted by the source (accept-once)
//! - **OrderingBuffer**: bounded buffer drained in ascending name order
//! - **Scheduler**: two independent timers, intake and dispatch
//!
//! Every per-unit failure is logged and isolated; it never stops a tick.

pub mod config;
pub mod error;
pub mod filter;
pub mod fs;
pub mod metrics;
pub mod ordering;
pub mod scheduler;
pub mod sink;
pub mod source;
pub mod transform;
pub mod unit;

use std::sync::Arc;

// Re-exports for convenience
pub use config::PipelineConfig;
pub use error::{FlowError, Result, TransformCause};
pub use filter::{AdmissionFilter, AdmissionRule};
pub use fs::{FileEntry, Filesystem, LocalFs};
pub use metrics::{MetricsSnapshot, PipelineMetrics};
pub use ordering::OrderingBuffer;
pub use scheduler::{
    CycleReport, DispatchReport, DispatchStage, IntakeReport, IntakeStage, Scheduler,
    SchedulerConfig, SeenSetReset,
};
pub use sink::{OverwriteMode, Sink};
pub use source::DirectorySource;
pub use transform::{Identity, Transform, TransformPolicy, TransformStage, UppercaseLines};
pub use unit::{UnitOfWork, UnitState};

/// Build a scheduler over the local filesystem.
pub fn assemble(config: &PipelineConfig) -> Result<Scheduler> {
    assemble_with(config, Arc::new(LocalFs::new()))
}

/// Build every component from `config` and wire them together.
pub fn assemble_with(config: &PipelineConfig, fs: Arc<dyn Filesystem>) -> Result<Scheduler> {
    config.validate()?;

    let metrics = Arc::new(PipelineMetrics::new());
    let buffer = Arc::new(OrderingBuffer::new(config.buffer_capacity));

    let source = DirectorySource::new(&config.source_dir, Arc::clone(&fs))
        .with_modification_tracking(config.track_modifications)
        .with_ignore_hidden(config.ignore_hidden);
    let filter = AdmissionFilter::from_rule(&config.admission)?;
    let intake = IntakeStage::new(source, filter, Arc::clone(&buffer), Arc::clone(&metrics));

    let transform = TransformStage::new(config.transform.build());
    let sink = Sink::new(
        &config.destination_dir,
        Arc::clone(&fs),
        config.overwrite_mode,
    );
    let dispatch = DispatchStage::new(buffer, transform, sink, fs, Arc::clone(&metrics));

    let scheduler_config = SchedulerConfig {
        intake_interval: config.intake_interval(),
        dispatch_interval: config.dispatch_interval(),
        drain_on_shutdown: config.drain_on_shutdown,
    };

    tracing::debug!(
        source = %config.source_dir.display(),
        destination = %config.destination_dir.display(),
        admission = %config.admission,
        transform = %config.transform,
        capacity = config.buffer_capacity,
        "Assembled pipeline"
    );

    Scheduler::new(intake, dispatch, scheduler_config, metrics)
}
