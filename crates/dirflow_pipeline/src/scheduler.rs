//! Intake and dispatch loops
//!
//! # Design
//!
//! - Intake and dispatch tick on independent `tokio::time::interval` timers
//! - The ordering buffer is the only state the two loops share
//! - Each tick runs on the blocking pool; units inside a tick are handled one
//!   at a time
//! - Shutdown stops new ticks; a tick already running completes

use crate::error::{FlowError, Result};
use crate::filter::AdmissionFilter;
use crate::fs::Filesystem;
use crate::metrics::{MetricsSnapshot, PipelineMetrics};
use crate::ordering::OrderingBuffer;
use crate::sink::Sink;
use crate::source::DirectorySource;
use crate::transform::TransformStage;
use crate::unit::{UnitOfWork, UnitState};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

/// Outcome of one intake tick.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IntakeReport {
    pub discovered: usize,
    pub admitted: usize,
    pub rejected: usize,
    /// Admitted but dropped because the buffer was full
    pub dropped: Vec<String>,
}

impl IntakeReport {
    pub fn is_empty(&self) -> bool {
        self.discovered == 0
    }
}

/// Outcome of one dispatch tick, names in processing order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DispatchReport {
    pub written: Vec<String>,
    pub transform_failed: Vec<String>,
    pub write_failed: Vec<String>,
}

impl DispatchReport {
    pub fn is_empty(&self) -> bool {
        self.processed() == 0
    }

    pub fn processed(&self) -> usize {
        self.written.len() + self.transform_failed.len() + self.write_failed.len()
    }

    pub fn has_failures(&self) -> bool {
        !self.transform_failed.is_empty() || !self.write_failed.is_empty()
    }

    fn record(&mut self, name: String, state: UnitState) {
        match state {
            UnitState::Written => self.written.push(name),
            UnitState::TransformFailed => self.transform_failed.push(name),
            UnitState::WriteFailed => self.write_failed.push(name),
            _ => {}
        }
    }
}

/// Asks a running pipeline to forget every file it has seen.
///
/// The reset is applied at the start of the next intake tick, after which
/// every file still in the source directory is emitted again.
#[derive(Debug, Clone, Default)]
pub struct SeenSetReset {
    requested: Arc<AtomicBool>,
}

impl SeenSetReset {
    pub fn request(&self) {
        self.requested.store(true, Ordering::SeqCst);
    }

    fn take(&self) -> bool {
        self.requested.swap(false, Ordering::SeqCst)
    }
}

/// Polls the source, filters, and buffers admitted units.
///
/// Owns the directory source and therefore the seen-set.
pub struct IntakeStage {
    source: DirectorySource,
    filter: AdmissionFilter,
    buffer: Arc<OrderingBuffer>,
    metrics: Arc<PipelineMetrics>,
    reset: SeenSetReset,
}

impl IntakeStage {
    pub fn new(
        source: DirectorySource,
        filter: AdmissionFilter,
        buffer: Arc<OrderingBuffer>,
        metrics: Arc<PipelineMetrics>,
    ) -> Self {
        Self {
            source,
            filter,
            buffer,
            metrics,
            reset: SeenSetReset::default(),
        }
    }

    pub fn source(&self) -> &DirectorySource {
        &self.source
    }

    pub fn reset_handle(&self) -> SeenSetReset {
        self.reset.clone()
    }

    /// Run one intake pass. Only `SourceUnavailable` is returned as an error;
    /// per-unit outcomes are folded into the report.
    pub fn tick(&mut self) -> Result<IntakeReport> {
        let mut report = IntakeReport::default();

        if self.reset.take() {
            info!(forgotten = self.source.seen_count(), "Seen-set cleared");
            self.source.reset();
            self.metrics.set_seen_files(0);
        }

        let units = match self.source.poll() {
            Ok(units) => units,
            Err(err) => {
                self.metrics.inc_source_errors();
                return Err(err);
            }
        };

        for unit in units {
            report.discovered += 1;
            if !self.filter.admit(&unit) {
                debug!(name = %unit.name(), state = %UnitState::Rejected, "Unit not admitted");
                report.rejected += 1;
                continue;
            }

            report.admitted += 1;
            let name = unit.name().to_string();
            match self.buffer.insert(unit) {
                Ok(()) => {
                    debug!(name = %name, state = %UnitState::Buffered, "Unit buffered");
                }
                Err(err) => {
                    warn!(
                        name = %name,
                        state = %UnitState::Dropped,
                        error = %err,
                        "Backpressure: ordering buffer full"
                    );
                    report.dropped.push(name);
                }
            }
        }

        self.metrics.add_discovered(report.discovered as u64);
        self.metrics.add_admitted(report.admitted as u64);
        self.metrics.add_rejected(report.rejected as u64);
        self.metrics.add_dropped(report.dropped.len() as u64);
        self.metrics.set_seen_files(self.source.seen_count() as u64);
        Ok(report)
    }
}

/// Drains the buffer and runs transform then sink for each unit, in order.
pub struct DispatchStage {
    buffer: Arc<OrderingBuffer>,
    transform: TransformStage,
    sink: Sink,
    fs: Arc<dyn Filesystem>,
    metrics: Arc<PipelineMetrics>,
}

impl DispatchStage {
    pub fn new(
        buffer: Arc<OrderingBuffer>,
        transform: TransformStage,
        sink: Sink,
        fs: Arc<dyn Filesystem>,
        metrics: Arc<PipelineMetrics>,
    ) -> Self {
        Self {
            buffer,
            transform,
            sink,
            fs,
            metrics,
        }
    }

    /// Drain everything currently buffered and process it.
    pub fn tick(&self) -> DispatchReport {
        let start = Instant::now();
        let units = self.buffer.drain_all();
        let mut report = DispatchReport::default();

        for unit in units {
            let name = unit.name().to_string();
            let state = self.dispatch_one(unit);
            report.record(name, state);
        }

        self.metrics.inc_drains();
        self.metrics.record_dispatch_time(start);
        self.metrics.add_written(report.written.len() as u64);
        self.metrics
            .add_transform_failures(report.transform_failed.len() as u64);
        self.metrics.add_write_failures(report.write_failed.len() as u64);
        report
    }

    fn dispatch_one(&self, mut unit: UnitOfWork) -> UnitState {
        let content = match self.transform.process(&mut unit, self.fs.as_ref()) {
            Ok(content) => content,
            Err(err) => {
                error!(
                    name = %unit.name(),
                    path = %unit.path().display(),
                    error = %err,
                    "Transform failed, skipping unit"
                );
                return UnitState::TransformFailed;
            }
        };

        match self.sink.write(unit.name(), &content) {
            Ok(path) => {
                info!(name = %unit.name(), path = %path.display(), "Wrote file");
                UnitState::Written
            }
            Err(err) => {
                error!(name = %unit.name(), error = %err, "Write failed, dropping unit");
                UnitState::WriteFailed
            }
        }
    }
}

/// Timer settings for the two loops.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub intake_interval: Duration,
    pub dispatch_interval: Duration,
    pub drain_on_shutdown: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            intake_interval: Duration::from_secs(5),
            dispatch_interval: Duration::from_secs(10),
            drain_on_shutdown: false,
        }
    }
}

/// Result of a single synchronous intake + dispatch cycle.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CycleReport {
    pub intake: IntakeReport,
    pub dispatch: DispatchReport,
    /// Set when the source directory could not be listed
    pub source_error: Option<String>,
}

impl CycleReport {
    pub fn has_failures(&self) -> bool {
        self.source_error.is_some() || !self.intake.dropped.is_empty() || self.dispatch.has_failures()
    }
}

/// Drives intake and dispatch.
pub struct Scheduler {
    intake: IntakeStage,
    dispatch: Arc<DispatchStage>,
    config: SchedulerConfig,
    metrics: Arc<PipelineMetrics>,
}

impl Scheduler {
    pub fn new(
        intake: IntakeStage,
        dispatch: DispatchStage,
        config: SchedulerConfig,
        metrics: Arc<PipelineMetrics>,
    ) -> Result<Self> {
        if config.intake_interval.is_zero() || config.dispatch_interval.is_zero() {
            return Err(FlowError::Scheduler(
                "timer intervals must be greater than zero".to_string(),
            ));
        }
        Ok(Self {
            intake,
            dispatch: Arc::new(dispatch),
            config,
            metrics,
        })
    }

    pub fn metrics(&self) -> Arc<PipelineMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Handle that clears the seen-set, usable after `run` takes ownership.
    pub fn reset_handle(&self) -> SeenSetReset {
        self.intake.reset_handle()
    }

    /// One intake pass followed by one drain, on the calling thread.
    pub fn run_once(&mut self) -> CycleReport {
        let mut report = CycleReport::default();
        match self.intake.tick() {
            Ok(intake) => report.intake = intake,
            Err(err) => {
                warn!(error = %err, "Source unavailable");
                report.source_error = Some(err.to_string());
            }
        }
        report.dispatch = self.dispatch.tick();
        report
    }

    /// Run both loops until `shutdown` turns true or its sender is dropped.
    pub async fn run(self, shutdown: watch::Receiver<bool>) -> Result<MetricsSnapshot> {
        let Scheduler {
            intake,
            dispatch,
            config,
            metrics,
        } = self;

        info!(
            intake_ms = config.intake_interval.as_millis() as u64,
            dispatch_ms = config.dispatch_interval.as_millis() as u64,
            source = %intake.source().dir().display(),
            "Pipeline scheduler started"
        );

        let intake_task = tokio::spawn(intake_loop(
            intake,
            config.intake_interval,
            shutdown.clone(),
        ));
        let dispatch_task = tokio::spawn(dispatch_loop(
            Arc::clone(&dispatch),
            config.dispatch_interval,
            shutdown,
        ));

        let (intake_result, dispatch_result) = tokio::join!(intake_task, dispatch_task);
        intake_result.map_err(|e| FlowError::Scheduler(format!("intake loop failed: {e}")))??;
        dispatch_result.map_err(|e| FlowError::Scheduler(format!("dispatch loop failed: {e}")))??;

        if config.drain_on_shutdown {
            let report = run_dispatch_tick(dispatch).await?;
            if !report.is_empty() {
                info!(
                    written = report.written.len(),
                    failed = report.transform_failed.len() + report.write_failed.len(),
                    "Final drain complete"
                );
            }
        }

        let snapshot = metrics.snapshot();
        info!("Pipeline scheduler stopped. {}", snapshot.summary());
        Ok(snapshot)
    }
}

async fn intake_loop(
    mut stage: IntakeStage,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> Result<()> {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = wait_for_shutdown(&mut shutdown) => break,
            _ = ticker.tick() => {}
        }

        let (returned, outcome) = tokio::task::spawn_blocking(move || {
            let outcome = stage.tick();
            (stage, outcome)
        })
        .await
        .map_err(|e| FlowError::Scheduler(format!("intake tick panicked: {e}")))?;
        stage = returned;

        match outcome {
            Ok(report) if !report.is_empty() => {
                info!(
                    discovered = report.discovered,
                    admitted = report.admitted,
                    rejected = report.rejected,
                    dropped = report.dropped.len(),
                    "Intake tick"
                );
            }
            Ok(_) => {}
            Err(err) => {
                warn!(error = %err, "Source unavailable, retrying next tick");
            }
        }
    }

    info!("Intake loop stopped");
    Ok(())
}

async fn dispatch_loop(
    stage: Arc<DispatchStage>,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> Result<()> {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = wait_for_shutdown(&mut shutdown) => break,
            _ = ticker.tick() => {}
        }

        let report = run_dispatch_tick(Arc::clone(&stage)).await?;
        if !report.is_empty() {
            info!(
                written = report.written.len(),
                transform_failed = report.transform_failed.len(),
                write_failed = report.write_failed.len(),
                "Dispatch tick"
            );
        }
    }

    info!("Dispatch loop stopped");
    Ok(())
}

async fn run_dispatch_tick(stage: Arc<DispatchStage>) -> Result<DispatchReport> {
    tokio::task::spawn_blocking(move || stage.tick())
        .await
        .map_err(|e| FlowError::Scheduler(format!("dispatch tick panicked: {e}")))
}

/// Resolves once shutdown is requested or the sender is gone.
async fn wait_for_shutdown(shutdown: &mut watch::Receiver<bool>) {
    while !*shutdown.borrow_and_update() {
        if shutdown.changed().await.is_err() {
            return;
        }
    }
}
