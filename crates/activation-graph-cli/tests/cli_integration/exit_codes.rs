//! Exit code contract: 0 ok, 1 runtime failure, 2 invalid configuration.

use tempfile::TempDir;

use crate::helpers::{invoke, EXIT_FAILURE, EXIT_INVALID_CONFIG, EXIT_SUCCESS};

#[test]
fn test_valid_config_exits_zero() {
    let tmp = TempDir::new().expect("create temp dir");
    let path = tmp.path().join("engine.toml");
    std::fs::write(&path, "[scheduler]\nmin_tick_ms = 20\nmax_tick_ms = 2000\n").expect("write");

    let result = invoke(&["-c", path.to_str().expect("utf-8 path"), "validate"], tmp.path());
    assert_eq!(
        result.exit_code, EXIT_SUCCESS,
        "stdout: {}\nstderr: {}",
        result.stdout, result.stderr
    );
    assert!(result.stdout.starts_with("ok: "));
}

#[test]
fn test_out_of_range_value_exits_two() {
    let tmp = TempDir::new().expect("create temp dir");
    let path = tmp.path().join("engine.toml");
    std::fs::write(&path, "[criticality]\ntarget = -1.0\n").expect("write");

    let result = invoke(&["-c", path.to_str().expect("utf-8 path"), "validate"], tmp.path());
    assert_eq!(result.exit_code, EXIT_INVALID_CONFIG, "stderr: {}", result.stderr);
    assert!(result.stderr.contains("[criticality]"), "stderr: {}", result.stderr);
}

#[test]
fn test_unparseable_toml_exits_two() {
    let tmp = TempDir::new().expect("create temp dir");
    let path = tmp.path().join("engine.toml");
    std::fs::write(&path, "[scheduler\nmin_tick_ms = ").expect("write");

    let result = invoke(&["-c", path.to_str().expect("utf-8 path"), "simulate"], tmp.path());
    assert_eq!(result.exit_code, EXIT_INVALID_CONFIG);
    assert!(result.stdout.is_empty(), "nothing runs on a bad config");
}

#[test]
fn test_unwritable_snapshot_exits_one() {
    let tmp = TempDir::new().expect("create temp dir");
    // A directory where the snapshot file should go.
    let blocked = tmp.path().join("taken");
    std::fs::create_dir_all(blocked.join("snapshot.json")).expect("mkdir");
    let target = blocked.join("snapshot.json");

    let result = invoke(
        &[
            "simulate",
            "--ticks",
            "3",
            "--summary-only",
            "--save",
            target.to_str().expect("utf-8 path"),
        ],
        tmp.path(),
    );
    assert_eq!(result.exit_code, EXIT_FAILURE, "stderr: {}", result.stderr);
}

#[test]
fn test_print_defaults_is_valid_config() {
    let tmp = TempDir::new().expect("create temp dir");
    let result = invoke(&["validate", "--print-defaults"], tmp.path());
    assert_eq!(result.exit_code, EXIT_SUCCESS);

    let path = tmp.path().join("defaults.toml");
    std::fs::write(&path, &result.stdout).expect("write");
    let check = invoke(&["-c", path.to_str().expect("utf-8 path"), "validate"], tmp.path());
    assert_eq!(check.exit_code, EXIT_SUCCESS, "stderr: {}", check.stderr);
}
