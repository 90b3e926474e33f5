//! Process helpers for invoking the built binary.

use std::path::Path;
use std::process::{Command, Output};

pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILURE: i32 = 1;
pub const EXIT_INVALID_CONFIG: i32 = 2;

pub struct CliResult {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

/// Run the binary with `args`, isolated from any `ACTIVATION_GRAPH_*` in the
/// caller's environment.
pub fn invoke(args: &[&str], cwd: &Path) -> CliResult {
    let mut command = Command::new(env!("CARGO_BIN_EXE_activation-graph"));
    command.args(args).current_dir(cwd);
    for (key, _) in std::env::vars() {
        if key.starts_with("ACTIVATION_GRAPH_") {
            command.env_remove(key);
        }
    }
    let Output {
        status,
        stdout,
        stderr,
    } = command.output().expect("failed to spawn activation-graph");
    CliResult {
        exit_code: status.code().unwrap_or(-1),
        stdout: String::from_utf8_lossy(&stdout).into_owned(),
        stderr: String::from_utf8_lossy(&stderr).into_owned(),
    }
}

pub fn report_lines(stdout: &str) -> Vec<serde_json::Value> {
    stdout
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| serde_json::from_str(line).expect("each stdout line is a JSON report"))
        .collect()
}
