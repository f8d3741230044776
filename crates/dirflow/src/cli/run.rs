//! The `run` and `once` commands

use super::output;
use anyhow::{Context, Result};
use dirflow_pipeline::{assemble, CycleReport, MetricsSnapshot, PipelineConfig, SeenSetReset};
use serde::Serialize;
use tokio::sync::watch;
use tracing::info;

/// Run both pipeline loops until SIGINT or SIGTERM. SIGHUP clears the
/// seen-set so every file still in the source directory is processed again.
pub fn run(config: &PipelineConfig) -> Result<MetricsSnapshot> {
    let scheduler = assemble(config).context("Failed to assemble pipeline")?;

    info!(
        source = %config.source_dir.display(),
        destination = %config.destination_dir.display(),
        "Starting dirflow"
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    install_signal_handlers(shutdown_tx, scheduler.reset_handle())?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("dirflow-worker")
        .build()
        .context("Failed to build tokio runtime")?;

    let snapshot = runtime
        .block_on(scheduler.run(shutdown_rx))
        .context("Pipeline stopped with an error")?;

    println!("{}", output::format_summary(&snapshot));
    Ok(snapshot)
}

/// Flip the shutdown channel on the first SIGINT/SIGTERM (Ctrl+C on Windows).
fn install_signal_handlers(shutdown_tx: watch::Sender<bool>, reset: SeenSetReset) -> Result<()> {
    #[cfg(unix)]
    {
        use signal_hook::consts::{SIGHUP, SIGINT, SIGTERM};
        use signal_hook::iterator::Signals;

        let mut signals = Signals::new([SIGINT, SIGTERM, SIGHUP])
            .context("Failed to register signal handlers")?;
        std::thread::Builder::new()
            .name("dirflow-signals".to_string())
            .spawn(move || {
                for sig in signals.forever() {
                    if sig == SIGHUP {
                        info!("Received SIGHUP, clearing seen-set on next intake tick");
                        reset.request();
                        continue;
                    }
                    info!("Received signal {}, shutting down...", sig);
                    shutdown_tx.send_replace(true);
                    break;
                }
            })
            .context("Failed to spawn signal thread")?;
    }

    #[cfg(windows)]
    {
        // No SIGHUP equivalent
        drop(reset);
        ctrlc::set_handler(move || {
            info!("Received Ctrl+C, shutting down...");
            shutdown_tx.send_replace(true);
        })
        .context("Failed to register Ctrl+C handler")?;
    }

    Ok(())
}

#[derive(Debug, Serialize)]
struct OnceOutput<'a> {
    #[serde(flatten)]
    report: &'a CycleReport,
    metrics: MetricsSnapshot,
    failed: bool,
}

/// Run a single intake pass and a single drain, then print the report.
///
/// Returns `true` when any file failed or the source was unavailable.
pub fn once(config: &PipelineConfig, json: bool) -> Result<bool> {
    let mut scheduler = assemble(config).context("Failed to assemble pipeline")?;
    let report = scheduler.run_once();
    let failed = report.has_failures();

    if json {
        let out = OnceOutput {
            report: &report,
            metrics: scheduler.metrics().snapshot(),
            failed,
        };
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        print!("{}", output::format_cycle(&report));
    }

    Ok(failed)
}
