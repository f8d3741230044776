//! End-to-end tests for the pipeline
//!
//! Each test assembles a full pipeline over temp directories and drives it
//! with `run_once`, one intake pass followed by one drain.

use dirflow_pipeline::{
    assemble, assemble_with, AdmissionRule, FileEntry, Filesystem, LocalFs, PipelineConfig,
    TransformPolicy,
};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// Create a test environment with temp directories
struct TestEnv {
    /// Temp directory (cleaned up on drop)
    _temp: TempDir,
    pub source_dir: PathBuf,
    pub dest_dir: PathBuf,
}

impl TestEnv {
    fn new() -> Self {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let source_dir = temp.path().join("input_dir");
        let dest_dir = temp.path().join("output_dir");
        fs::create_dir_all(&source_dir).expect("Failed to create source dir");

        Self {
            _temp: temp,
            source_dir,
            dest_dir,
        }
    }

    fn config(&self) -> PipelineConfig {
        PipelineConfig {
            source_dir: self.source_dir.clone(),
            destination_dir: self.dest_dir.clone(),
            ..PipelineConfig::default()
        }
    }

    fn write_source(&self, name: &str, content: impl AsRef<[u8]>) {
        fs::write(self.source_dir.join(name), content).expect("Failed to write source file");
    }

    fn read_dest(&self, name: &str) -> String {
        fs::read_to_string(self.dest_dir.join(name)).expect("Failed to read destination file")
    }

    fn dest_names(&self) -> Vec<String> {
        let Ok(entries) = fs::read_dir(&self.dest_dir) else {
            return Vec::new();
        };
        let mut names: Vec<String> = entries
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        names.sort();
        names
    }
}

/// Local filesystem that fails reads or writes for selected names.
struct FlakyFs {
    local: LocalFs,
    fail_reads: Vec<String>,
    fail_writes: Vec<String>,
    write_attempts: Mutex<Vec<String>>,
}

impl FlakyFs {
    fn new(fail_reads: &[&str], fail_writes: &[&str]) -> Self {
        Self {
            local: LocalFs::new(),
            fail_reads: fail_reads.iter().map(|s| s.to_string()).collect(),
            fail_writes: fail_writes.iter().map(|s| s.to_string()).collect(),
            write_attempts: Mutex::new(Vec::new()),
        }
    }
}

impl Filesystem for FlakyFs {
    fn list(&self, dir: &Path) -> io::Result<Vec<FileEntry>> {
        self.local.list(dir)
    }

    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
        if self.fail_reads.iter().any(|n| n == name) {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, "permission denied"));
        }
        self.local.read(path)
    }

    fn write_replace(&self, dir: &Path, name: &str, bytes: &[u8]) -> io::Result<()> {
        self.write_attempts.lock().unwrap().push(name.to_string());
        if self.fail_writes.iter().any(|n| n == name) {
            return Err(io::Error::new(io::ErrorKind::Other, "disk full"));
        }
        self.local.write_replace(dir, name, bytes)
    }
}

// ============================================================================
// Cycle tests
// ============================================================================

#[test]
fn test_zebra_is_uppercased() {
    let env = TestEnv::new();
    env.write_source("zebra.txt", "hello\nworld");

    let mut scheduler = assemble(&env.config()).unwrap();
    let report = scheduler.run_once();

    assert_eq!(report.dispatch.written, vec!["zebra.txt"]);
    assert_eq!(env.read_dest("zebra.txt"), "HELLO\nWORLD");
}

#[test]
fn test_matching_files_written_once() {
    let env = TestEnv::new();
    env.write_source("one.txt", "a");
    env.write_source("two.txt", "b");

    let mut scheduler = assemble(&env.config()).unwrap();
    let first = scheduler.run_once();
    assert_eq!(first.dispatch.written, vec!["one.txt", "two.txt"]);

    // Mark the outputs so a second write would be visible
    fs::write(env.dest_dir.join("one.txt"), "sentinel").unwrap();

    let second = scheduler.run_once();
    assert!(second.intake.is_empty());
    assert!(second.dispatch.is_empty());
    assert_eq!(env.read_dest("one.txt"), "sentinel");
    assert_eq!(scheduler.metrics().snapshot().files_written, 2);
}

#[test]
fn test_non_matching_files_never_written() {
    let env = TestEnv::new();
    env.write_source("keep.txt", "keep");
    env.write_source("data.csv", "a,b");
    env.write_source("notes.txt.bak", "old");
    env.write_source("README", "readme");

    let mut scheduler = assemble(&env.config()).unwrap();
    let report = scheduler.run_once();
    scheduler.run_once();

    assert_eq!(report.intake.discovered, 4);
    assert_eq!(report.intake.rejected, 3);
    assert_eq!(env.dest_names(), vec!["keep.txt"]);
}

#[test]
fn test_drain_order_is_alphabetical() {
    let env = TestEnv::new();
    for name in ["b.txt", "a.txt", "c.txt"] {
        env.write_source(name, name);
    }

    let mut scheduler = assemble(&env.config()).unwrap();
    let report = scheduler.run_once();
    assert_eq!(report.dispatch.written, vec!["a.txt", "b.txt", "c.txt"]);
}

#[test]
fn test_existing_destination_fully_replaced() {
    let env = TestEnv::new();
    fs::create_dir_all(&env.dest_dir).unwrap();
    fs::write(
        env.dest_dir.join("report.txt"),
        "previous run\nwith many\nmore lines\n",
    )
    .unwrap();
    env.write_source("report.txt", "new\nreport");

    let mut scheduler = assemble(&env.config()).unwrap();
    scheduler.run_once();

    assert_eq!(env.read_dest("report.txt"), "NEW\nREPORT");
}

#[test]
fn test_transform_failure_isolated() {
    let env = TestEnv::new();
    env.write_source("a.txt", "first");
    env.write_source("b.txt", [0xc3, 0x28, 0xff]);
    env.write_source("c.txt", "third");

    let mut scheduler = assemble(&env.config()).unwrap();
    let report = scheduler.run_once();

    assert_eq!(report.dispatch.written, vec!["a.txt", "c.txt"]);
    assert_eq!(report.dispatch.transform_failed, vec!["b.txt"]);
    assert_eq!(env.dest_names(), vec!["a.txt", "c.txt"]);
    assert!(report.has_failures());

    // Failed units are terminal
    let again = scheduler.run_once();
    assert!(again.dispatch.is_empty());
}

#[test]
fn test_read_failure_is_transform_failure() {
    let env = TestEnv::new();
    env.write_source("a.txt", "first");
    env.write_source("locked.txt", "secret");

    let fs_impl = Arc::new(FlakyFs::new(&["locked.txt"], &[]));
    let mut scheduler = assemble_with(&env.config(), fs_impl).unwrap();
    let report = scheduler.run_once();

    assert_eq!(report.dispatch.written, vec!["a.txt"]);
    assert_eq!(report.dispatch.transform_failed, vec!["locked.txt"]);
    assert_eq!(env.dest_names(), vec!["a.txt"]);
}

#[test]
fn test_write_failure_isolated() {
    let env = TestEnv::new();
    for name in ["a.txt", "b.txt", "c.txt"] {
        env.write_source(name, name);
    }

    let fs_impl = Arc::new(FlakyFs::new(&[], &["b.txt"]));
    let mut scheduler = assemble_with(&env.config(), fs_impl.clone()).unwrap();
    let report = scheduler.run_once();

    assert_eq!(report.dispatch.written, vec!["a.txt", "c.txt"]);
    assert_eq!(report.dispatch.write_failed, vec!["b.txt"]);
    assert_eq!(
        *fs_impl.write_attempts.lock().unwrap(),
        vec!["a.txt", "b.txt", "c.txt"]
    );
    assert_eq!(scheduler.metrics().snapshot().write_failures, 1);
}

#[test]
fn test_capacity_overflow_drops_extra_units() {
    let env = TestEnv::new();
    for name in ["d.txt", "c.txt", "b.txt", "a.txt"] {
        env.write_source(name, name);
    }

    let config = PipelineConfig {
        buffer_capacity: 2,
        ..env.config()
    };
    let mut scheduler = assemble(&config).unwrap();
    let report = scheduler.run_once();

    assert_eq!(report.intake.admitted, 4);
    assert_eq!(report.intake.dropped.len(), 2);
    assert_eq!(report.dispatch.written.len(), 2);
    assert!(report.dispatch.written.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(env.dest_names().len(), 2);
}

#[test]
fn test_missing_source_recovers() {
    let env = TestEnv::new();
    let config = PipelineConfig {
        source_dir: env.source_dir.join("not-yet"),
        ..env.config()
    };
    let mut scheduler = assemble(&config).unwrap();

    let report = scheduler.run_once();
    assert!(report.source_error.is_some());

    fs::create_dir_all(&config.source_dir).unwrap();
    fs::write(config.source_dir.join("late.txt"), "late").unwrap();
    let report = scheduler.run_once();
    assert!(report.source_error.is_none());
    assert_eq!(env.read_dest("late.txt"), "LATE");
}

#[test]
fn test_identity_transform_and_glob_admission() {
    let env = TestEnv::new();
    env.write_source("report-1.txt", "Keep Case\n");
    env.write_source("other.txt", "skip");

    let config = PipelineConfig {
        transform: TransformPolicy::Identity,
        admission: AdmissionRule::Glob("report-*.txt".to_string()),
        ..env.config()
    };
    let mut scheduler = assemble(&config).unwrap();
    scheduler.run_once();

    assert_eq!(env.dest_names(), vec!["report-1.txt"]);
    assert_eq!(env.read_dest("report-1.txt"), "Keep Case\n");
}

#[test]
fn test_invalid_config_rejected_at_assembly() {
    let env = TestEnv::new();
    let config = PipelineConfig {
        dispatch_interval_ms: 0,
        ..env.config()
    };
    assert!(assemble(&config).is_err());
}

#[test]
fn test_hidden_files_ignored_by_default() {
    let env = TestEnv::new();
    env.write_source(".draft.txt", "draft");
    env.write_source("final.txt", "final");

    let mut scheduler = assemble(&env.config()).unwrap();
    let report = scheduler.run_once();

    assert_eq!(report.intake.discovered, 1);
    assert_eq!(env.dest_names(), vec!["final.txt"]);
}

#[test]
fn test_every_written_unit_lands_in_destination() {
    let env = TestEnv::new();
    // The second name looks like a staging file for the first
    env.write_source("a.txt", "plain");
    env.write_source(".a.txt.tmp", "dotted");

    let config = PipelineConfig {
        admission: AdmissionRule::Glob("*".to_string()),
        ignore_hidden: false,
        ..env.config()
    };
    let mut scheduler = assemble(&config).unwrap();
    let report = scheduler.run_once();

    assert_eq!(report.dispatch.written, vec![".a.txt.tmp", "a.txt"]);
    assert_eq!(env.dest_names(), vec![".a.txt.tmp", "a.txt"]);
    assert_eq!(env.read_dest(".a.txt.tmp"), "DOTTED");
    assert_eq!(env.read_dest("a.txt"), "PLAIN");
}
