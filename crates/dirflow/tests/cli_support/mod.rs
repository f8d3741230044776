#![allow(dead_code)]

use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

pub fn dirflow_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_dirflow"))
}

/// Run the CLI with a clean dirflow environment rooted at `home`.
pub fn run_cli(args: &[&str], home: &Path) -> Output {
    let mut cmd = Command::new(dirflow_bin());
    cmd.args(args);
    for (key, _) in std::env::vars() {
        if key.starts_with("DIRFLOW_") {
            cmd.env_remove(key);
        }
    }
    cmd.env("DIRFLOW_HOME", home);
    cmd.env("RUST_LOG", "error");
    cmd.output().expect("failed to execute dirflow CLI")
}

pub fn assert_cli_success(output: &Output, args: &[&str]) {
    assert!(
        output.status.success(),
        "command failed: {}\nstdout:\n{}\nstderr:\n{}",
        args.join(" "),
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
}

pub fn stdout_of(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

pub fn parse_json<T: DeserializeOwned>(output: &Output) -> T {
    let stdout = String::from_utf8_lossy(&output.stdout);
    serde_json::from_str(&stdout).unwrap_or_else(|err| {
        panic!(
            "failed to parse JSON output: {}\nstdout:\n{}\nstderr:\n{}",
            err,
            stdout,
            String::from_utf8_lossy(&output.stderr)
        )
    })
}

pub fn run_cli_json<T: DeserializeOwned>(args: &[&str], home: &Path) -> T {
    let output = run_cli(args, home);
    assert_cli_success(&output, args);
    parse_json(&output)
}
