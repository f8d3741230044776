mod cli_support;

use cli_support::{assert_cli_success, parse_json, run_cli, run_cli_json, stdout_of};
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

#[derive(Debug, Deserialize)]
struct OnceJson {
    intake: IntakeJson,
    dispatch: DispatchJson,
    source_error: Option<String>,
    metrics: MetricsJson,
    failed: bool,
}

#[derive(Debug, Deserialize)]
struct IntakeJson {
    discovered: usize,
    admitted: usize,
    rejected: usize,
    dropped: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct DispatchJson {
    written: Vec<String>,
    transform_failed: Vec<String>,
    write_failed: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct MetricsJson {
    files_written: u64,
    drains: u64,
}

struct Dirs {
    home: TempDir,
    source: PathBuf,
    dest: PathBuf,
}

impl Dirs {
    fn new() -> Self {
        let home = TempDir::new().expect("create temp home");
        let source = home.path().join("input_dir");
        let dest = home.path().join("output_dir");
        fs::create_dir_all(&source).unwrap();
        Self { home, source, dest }
    }

    fn args<'a>(&'a self, extra: &[&'a str]) -> Vec<&'a str> {
        let mut args = vec![
            "--source",
            self.source.to_str().unwrap(),
            "--dest",
            self.dest.to_str().unwrap(),
        ];
        args.extend_from_slice(extra);
        args
    }
}

#[test]
fn test_once_json_processes_matching_files() {
    let dirs = Dirs::new();
    fs::write(dirs.source.join("zebra.txt"), "hello\nworld").unwrap();
    fs::write(dirs.source.join("apple.txt"), "a").unwrap();
    fs::write(dirs.source.join("data.csv"), "x,y").unwrap();

    let args = dirs.args(&["once", "--json"]);
    let out: OnceJson = run_cli_json(&args, dirs.home.path());

    assert_eq!(out.intake.discovered, 3);
    assert_eq!(out.intake.admitted, 2);
    assert_eq!(out.intake.rejected, 1);
    assert!(out.intake.dropped.is_empty());
    assert_eq!(out.dispatch.written, vec!["apple.txt", "zebra.txt"]);
    assert!(out.dispatch.transform_failed.is_empty());
    assert!(out.dispatch.write_failed.is_empty());
    assert!(out.source_error.is_none());
    assert_eq!(out.metrics.files_written, 2);
    assert_eq!(out.metrics.drains, 1);
    assert!(!out.failed);

    assert_eq!(
        fs::read_to_string(dirs.dest.join("zebra.txt")).unwrap(),
        "HELLO\nWORLD"
    );
    assert!(!dirs.dest.join("data.csv").exists());
}

#[test]
fn test_once_text_output() {
    let dirs = Dirs::new();
    fs::write(dirs.source.join("notes.txt"), "x").unwrap();

    let args = dirs.args(&["once"]);
    let output = run_cli(&args, dirs.home.path());
    assert_cli_success(&output, &args);

    let stdout = stdout_of(&output);
    assert!(stdout.contains("1 discovered, 1 admitted"));
    assert!(stdout.contains("notes.txt"));
}

#[test]
fn test_once_exits_non_zero_on_unit_failure() {
    let dirs = Dirs::new();
    fs::write(dirs.source.join("good.txt"), "fine").unwrap();
    fs::write(dirs.source.join("bad.txt"), [0xff, 0xfe, 0x00]).unwrap();

    let args = dirs.args(&["once", "--json"]);
    let output = run_cli(&args, dirs.home.path());
    assert!(!output.status.success());

    let out: OnceJson = parse_json(&output);
    assert!(out.failed);
    assert_eq!(out.dispatch.written, vec!["good.txt"]);
    assert_eq!(out.dispatch.transform_failed, vec!["bad.txt"]);
}

#[test]
fn test_once_reads_config_file_and_flags_override_it() {
    let dirs = Dirs::new();
    fs::write(dirs.source.join("keep.md"), "md").unwrap();
    fs::write(dirs.source.join("skip.txt"), "txt").unwrap();

    let config_path = dirs.home.path().join("custom.toml");
    fs::write(
        &config_path,
        format!(
            "source_dir = {:?}\ndestination_dir = \"/does/not/matter\"\ntransform = \"identity\"\n\n[admission]\nsuffix = \".md\"\n",
            dirs.source.to_str().unwrap()
        ),
    )
    .unwrap();

    let args = [
        "--config",
        config_path.to_str().unwrap(),
        "--dest",
        dirs.dest.to_str().unwrap(),
        "once",
        "--json",
    ];
    let out: OnceJson = run_cli_json(&args, dirs.home.path());

    assert_eq!(out.dispatch.written, vec!["keep.md"]);
    assert_eq!(fs::read_to_string(dirs.dest.join("keep.md")).unwrap(), "md");
}

#[test]
fn test_invalid_override_fails_before_processing() {
    let dirs = Dirs::new();
    fs::write(dirs.source.join("a.txt"), "a").unwrap();

    let args = dirs.args(&["--capacity", "0", "once"]);
    let output = run_cli(&args, dirs.home.path());

    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("buffer_capacity"));
    assert!(!dirs.dest.exists());
}
