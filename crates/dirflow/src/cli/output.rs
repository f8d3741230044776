//! Human-readable rendering of pipeline reports

use dirflow_pipeline::{CycleReport, MetricsSnapshot};
use std::fmt::Write;

/// Render a cycle report as plain text, one line per processed file.
pub fn format_cycle(report: &CycleReport) -> String {
    let mut out = String::new();

    if let Some(err) = &report.source_error {
        let _ = writeln!(out, "Source unavailable: {}", err);
    }

    let intake = &report.intake;
    let _ = writeln!(
        out,
        "Intake:   {} discovered, {} admitted, {} rejected, {} dropped",
        intake.discovered,
        intake.admitted,
        intake.rejected,
        intake.dropped.len()
    );

    let dispatch = &report.dispatch;
    let _ = writeln!(
        out,
        "Dispatch: {} written, {} transform failed, {} write failed",
        dispatch.written.len(),
        dispatch.transform_failed.len(),
        dispatch.write_failed.len()
    );

    let rows = dispatch
        .written
        .iter()
        .map(|name| ("written", name))
        .chain(dispatch.transform_failed.iter().map(|name| ("transform failed", name)))
        .chain(dispatch.write_failed.iter().map(|name| ("write failed", name)))
        .chain(intake.dropped.iter().map(|name| ("dropped", name)));
    for (status, name) in rows {
        let _ = writeln!(out, "  {:<17} {}", status, name);
    }

    out
}

pub fn format_summary(snapshot: &MetricsSnapshot) -> String {
    snapshot.summary()
}
