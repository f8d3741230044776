//! Configuration resolution and the `config` command
//!
//! Layering, lowest to highest priority:
//! 1. Built-in defaults
//! 2. The TOML file given by `--config`, or `~/.dirflow/dirflow.toml` when present
//! 3. Command-line flags and `DIRFLOW_*` environment variables

use super::PipelineOverrides;
use anyhow::{bail, Context, Result};
use dirflow_logging::dirflow_home;
use dirflow_pipeline::PipelineConfig;
use std::path::{Path, PathBuf};

/// Get the default config file path: ~/.dirflow/dirflow.toml
pub fn default_config_path() -> PathBuf {
    dirflow_home().join("dirflow.toml")
}

/// Configuration after all layers have been applied.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub config: PipelineConfig,
    /// File the configuration was read from, if any
    pub file: Option<PathBuf>,
}

/// Resolve the effective configuration.
///
/// An explicit `--config` path must exist; the default path is optional.
pub fn resolve(explicit: Option<&Path>, overrides: &PipelineOverrides) -> Result<ResolvedConfig> {
    let (mut config, file) = match explicit {
        Some(path) => {
            let config = PipelineConfig::load(path)
                .with_context(|| format!("Failed to load config file {}", path.display()))?;
            (config, Some(path.to_path_buf()))
        }
        None => {
            let path = default_config_path();
            if path.is_file() {
                let config = PipelineConfig::load(&path)
                    .with_context(|| format!("Failed to load config file {}", path.display()))?;
                (config, Some(path))
            } else {
                (PipelineConfig::default(), None)
            }
        }
    };

    overrides.apply(&mut config);
    config.validate().context("Invalid configuration")?;

    Ok(ResolvedConfig { config, file })
}

#[derive(Debug, clap::Subcommand)]
pub enum ConfigAction {
    /// Print the effective configuration
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Write a configuration file with default values
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

/// Run the config command
pub fn run(
    action: ConfigAction,
    explicit: Option<&Path>,
    overrides: &PipelineOverrides,
) -> Result<()> {
    match action {
        ConfigAction::Show { json } => show(explicit, overrides, json),
        ConfigAction::Init { force } => init(explicit, overrides, force).map(|_| ()),
    }
}

fn show(explicit: Option<&Path>, overrides: &PipelineOverrides, json: bool) -> Result<()> {
    let resolved = resolve(explicit, overrides)?;

    if json {
        let output = serde_json::json!({
            "home": dirflow_home().to_string_lossy(),
            "file": resolved.file.as_ref().map(|p| p.to_string_lossy().to_string()),
            "config": resolved.config,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    match &resolved.file {
        Some(path) => println!("# Loaded from {}", path.display()),
        None => println!("# No config file found, using defaults"),
    }
    print!("{}", resolved.config.to_toml_string()?);
    Ok(())
}

/// Write defaults plus any command-line overrides to the config file.
///
/// Returns the path that was written.
pub fn init(explicit: Option<&Path>, overrides: &PipelineOverrides, force: bool) -> Result<PathBuf> {
    let path = explicit
        .map(Path::to_path_buf)
        .unwrap_or_else(default_config_path);

    if path.exists() && !force {
        bail!(
            "Config file already exists: {} (use --force to overwrite)",
            path.display()
        );
    }

    let mut config = PipelineConfig::default();
    overrides.apply(&mut config);
    config.validate().context("Invalid configuration")?;
    config
        .save(&path)
        .with_context(|| format!("Failed to write config file {}", path.display()))?;

    println!("Wrote {}", path.display());
    Ok(path)
}
