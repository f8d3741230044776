//! Pipeline counters
//!
//! Lock-free atomics shared by the intake and dispatch loops. Each loop is
//! the single writer for its own counters; readers take a snapshot.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Counters for one pipeline instance
#[derive(Debug, Default)]
pub struct PipelineMetrics {
    // Intake
    pub files_discovered: AtomicU64,
    pub files_admitted: AtomicU64,
    pub files_rejected: AtomicU64,
    pub files_dropped: AtomicU64,
    pub source_errors: AtomicU64,
    /// Current seen-set size (gauge)
    pub seen_files: AtomicU64,

    // Dispatch
    pub files_written: AtomicU64,
    pub transform_failures: AtomicU64,
    pub write_failures: AtomicU64,
    pub drains: AtomicU64,

    // Cumulative microseconds spent in dispatch ticks
    pub dispatch_time_us: AtomicU64,
}

impl PipelineMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn add_discovered(&self, n: u64) {
        self.files_discovered.fetch_add(n, Ordering::Relaxed);
    }

    #[inline]
    pub fn add_admitted(&self, n: u64) {
        self.files_admitted.fetch_add(n, Ordering::Relaxed);
    }

    #[inline]
    pub fn add_rejected(&self, n: u64) {
        self.files_rejected.fetch_add(n, Ordering::Relaxed);
    }

    #[inline]
    pub fn add_dropped(&self, n: u64) {
        self.files_dropped.fetch_add(n, Ordering::Relaxed);
    }

    #[inline]
    pub fn inc_source_errors(&self) {
        self.source_errors.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn set_seen_files(&self, n: u64) {
        self.seen_files.store(n, Ordering::Relaxed);
    }

    #[inline]
    pub fn add_written(&self, n: u64) {
        self.files_written.fetch_add(n, Ordering::Relaxed);
    }

    #[inline]
    pub fn add_transform_failures(&self, n: u64) {
        self.transform_failures.fetch_add(n, Ordering::Relaxed);
    }

    #[inline]
    pub fn add_write_failures(&self, n: u64) {
        self.write_failures.fetch_add(n, Ordering::Relaxed);
    }

    #[inline]
    pub fn inc_drains(&self) {
        self.drains.fetch_add(1, Ordering::Relaxed);
    }

    /// Record dispatch timing in microseconds
    #[inline]
    pub fn record_dispatch_time(&self, start: Instant) {
        let elapsed_us = start.elapsed().as_micros() as u64;
        self.dispatch_time_us.fetch_add(elapsed_us, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            files_discovered: self.files_discovered.load(Ordering::Relaxed),
            files_admitted: self.files_admitted.load(Ordering::Relaxed),
            files_rejected: self.files_rejected.load(Ordering::Relaxed),
            files_dropped: self.files_dropped.load(Ordering::Relaxed),
            source_errors: self.source_errors.load(Ordering::Relaxed),
            seen_files: self.seen_files.load(Ordering::Relaxed),
            files_written: self.files_written.load(Ordering::Relaxed),
            transform_failures: self.transform_failures.load(Ordering::Relaxed),
            write_failures: self.write_failures.load(Ordering::Relaxed),
            drains: self.drains.load(Ordering::Relaxed),
            dispatch_time_us: self.dispatch_time_us.load(Ordering::Relaxed),
        }
    }
}

/// Immutable snapshot of metrics for reading
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub files_discovered: u64,
    pub files_admitted: u64,
    pub files_rejected: u64,
    pub files_dropped: u64,
    pub source_errors: u64,
    pub seen_files: u64,
    pub files_written: u64,
    pub transform_failures: u64,
    pub write_failures: u64,
    pub drains: u64,
    pub dispatch_time_us: u64,
}

impl MetricsSnapshot {
    /// Average time per drain in milliseconds
    pub fn avg_drain_time_ms(&self) -> f64 {
        if self.drains == 0 {
            0.0
        } else {
            (self.dispatch_time_us as f64 / self.drains as f64) / 1000.0
        }
    }

    /// Format as human-readable summary
    pub fn summary(&self) -> String {
        format!(
            "Intake: {} discovered, {} admitted, {} rejected, {} dropped, {} source errors, {} seen | \
             Dispatch: {} written, {} transform failed, {} write failed | \
             Avg drain: {:.2}ms",
            self.files_discovered,
            self.files_admitted,
            self.files_rejected,
            self.files_dropped,
            self.source_errors,
            self.seen_files,
            self.files_written,
            self.transform_failures,
            self.write_failures,
            self.avg_drain_time_ms(),
        )
    }
}
