//! Shared logging setup for dirflow binaries.
//!
//! Installs a `tracing` registry with a size-rotated log file and a stderr
//! layer. `RUST_LOG` overrides the default filter for both.

use anyhow::{Context, Result};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

const DEFAULT_LOG_FILTER: &str = "dirflow=info,dirflow_pipeline=info";
/// Active file plus four archives
const LOG_ARCHIVES: usize = 4;
const MAX_LOG_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// How chatty stderr should be. The log file always uses the base filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    /// Warnings and errors only
    Quiet,
    #[default]
    Normal,
    /// Debug output from dirflow crates
    Verbose,
}

/// Logging configuration shared by dirflow binaries.
#[derive(Debug, Clone)]
pub struct LogConfig<'a> {
    pub app_name: &'a str,
    pub verbosity: Verbosity,
    /// Overrides `<home>/logs`
    pub log_dir: Option<PathBuf>,
}

/// Initialize tracing with a rolling file writer and stderr output.
pub fn init_logging(config: LogConfig<'_>) -> Result<()> {
    let log_dir = match config.log_dir {
        Some(dir) => dir,
        None => logs_dir(),
    };
    ensure_dir(&log_dir).context("Failed to ensure log directory")?;
    let rolling = RollingFile::open(&log_dir, config.app_name, LOG_ARCHIVES, MAX_LOG_FILE_SIZE)
        .with_context(|| format!("Failed to open log file in {}", log_dir.display()))?;
    let file_writer = SharedLogFile(Arc::new(Mutex::new(rolling)));

    let file_filter = base_filter();
    let console_filter = match config.verbosity {
        Verbosity::Quiet => EnvFilter::new("warn"),
        Verbosity::Normal => base_filter(),
        Verbosity::Verbose => EnvFilter::new("dirflow=debug,dirflow_pipeline=debug"),
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(file_writer)
                .with_ansi(false)
                .with_filter(file_filter),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_filter(console_filter),
        )
        .try_init()
        .context("A global tracing subscriber is already installed")?;

    Ok(())
}

fn base_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
}

/// Get the dirflow home directory: ~/.dirflow, or `DIRFLOW_HOME` when set
pub fn dirflow_home() -> PathBuf {
    if let Ok(override_path) = std::env::var("DIRFLOW_HOME") {
        return PathBuf::from(override_path);
    }
    dirs::home_dir()
        .map(|home| home.join(".dirflow"))
        .unwrap_or_else(|| PathBuf::from(".dirflow"))
}

/// Get the logs directory: ~/.dirflow/logs
pub fn logs_dir() -> PathBuf {
    dirflow_home().join("logs")
}

fn ensure_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create logs directory: {}", dir.display()))
}

/// Size-capped log file: `<name>.log` plus archives `<name>.log.1` (newest)
/// through `<name>.log.<archives>`. Older content is discarded.
struct RollingFile {
    active: PathBuf,
    archives: usize,
    max_size: u64,
    file: File,
    written: u64,
}

impl RollingFile {
    fn open(dir: &Path, name: &str, archives: usize, max_size: u64) -> io::Result<Self> {
        fs::create_dir_all(dir)?;
        let active = dir.join(format!("{}.log", sanitize_name(name)));
        let (file, written) = open_append(&active)?;
        Ok(Self {
            active,
            archives,
            max_size,
            file,
            written,
        })
    }

    fn archive(&self, index: usize) -> PathBuf {
        let mut path = self.active.clone().into_os_string();
        path.push(format!(".{}", index));
        PathBuf::from(path)
    }

    /// Shift `.N-1 → .N … active → .1`, dropping whatever falls off the end.
    fn rotate(&mut self) -> io::Result<()> {
        self.file.flush()?;
        for index in (1..=self.archives).rev() {
            let from = if index == 1 {
                self.active.clone()
            } else {
                self.archive(index - 1)
            };
            if from.exists() {
                fs::rename(&from, self.archive(index))?;
            }
        }
        if self.archives == 0 {
            File::create(&self.active)?;
        }
        let (file, written) = open_append(&self.active)?;
        self.file = file;
        self.written = written;
        Ok(())
    }
}

fn open_append(path: &Path) -> io::Result<(File, u64)> {
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let len = file.metadata()?.len();
    Ok((file, len))
}

impl Write for RollingFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.written > 0 && self.written + buf.len() as u64 > self.max_size {
            self.rotate()?;
        }
        let n = self.file.write(buf)?;
        self.written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

/// Cloneable writer handed to the fmt layer.
#[derive(Clone)]
struct SharedLogFile(Arc<Mutex<RollingFile>>);

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for SharedLogFile {
    type Writer = SharedLogFile;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

impl Write for SharedLogFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).flush()
    }
}

fn sanitize_name(name: &str) -> String {
    name.chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' {
                ch
            } else {
                '_'
            }
        })
        .collect()
}
