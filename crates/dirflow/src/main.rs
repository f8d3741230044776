//! dirflow - polling directory pipeline
//!
//! Watches a source directory, transforms every newly admitted file and
//! writes the result to a destination directory.

use anyhow::Result;
use clap::{Parser, Subcommand};
use dirflow::cli::{self, config::ConfigAction, PipelineOverrides};
use dirflow_logging::{init_logging, LogConfig, Verbosity};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "dirflow", version, about = "Polling directory ETL pipeline")]
struct Cli {
    /// Config file (defaults to ~/.dirflow/dirflow.toml when present)
    #[arg(short, long, global = true, env = "DIRFLOW_CONFIG", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Debug output on stderr
    #[arg(short = 'v', long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only warnings and errors on stderr
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(flatten)]
    overrides: PipelineOverrides,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the pipeline until interrupted
    Run,

    /// Run one intake and one dispatch cycle, then exit
    Once {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show or create the configuration file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Exit code for `once` when at least one file failed
const EXIT_UNIT_FAILURES: u8 = 2;

fn main() -> ExitCode {
    let cli = Cli::parse();

    let verbosity = if cli.verbose {
        Verbosity::Verbose
    } else if cli.quiet {
        Verbosity::Quiet
    } else {
        Verbosity::Normal
    };
    if let Err(err) = init_logging(LogConfig {
        app_name: "dirflow",
        verbosity,
        log_dir: None,
    }) {
        eprintln!("Warning: failed to initialize logging: {:#}", err);
    }

    match run_command(cli) {
        Ok(ExitStatus::Success) => ExitCode::SUCCESS,
        Ok(ExitStatus::UnitFailures) => ExitCode::from(EXIT_UNIT_FAILURES),
        Err(err) => {
            eprintln!("Error: {:?}", err);
            ExitCode::from(1)
        }
    }
}

enum ExitStatus {
    Success,
    UnitFailures,
}

fn run_command(cli: Cli) -> Result<ExitStatus> {
    let explicit = cli.config.as_deref();

    match cli.command {
        Commands::Run => {
            let resolved = cli::config::resolve(explicit, &cli.overrides)?;
            cli::run::run(&resolved.config)?;
            Ok(ExitStatus::Success)
        }
        Commands::Once { json } => {
            let resolved = cli::config::resolve(explicit, &cli.overrides)?;
            if cli::run::once(&resolved.config, json)? {
                Ok(ExitStatus::UnitFailures)
            } else {
                Ok(ExitStatus::Success)
            }
        }
        Commands::Config { action } => {
            cli::config::run(action, explicit, &cli.overrides)?;
            Ok(ExitStatus::Success)
        }
    }
}
