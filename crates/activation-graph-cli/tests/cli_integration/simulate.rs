//! The `simulate` report stream and snapshot output.

use tempfile::TempDir;

use crate::helpers::{invoke, report_lines, EXIT_SUCCESS};

const RUN: &[&str] = &["simulate", "--nodes", "20", "--links", "60", "--ticks", "30", "--seed", "11"];

#[test]
fn test_one_report_per_tick() {
    let tmp = TempDir::new().expect("create temp dir");
    let result = invoke(RUN, tmp.path());
    assert_eq!(result.exit_code, EXIT_SUCCESS, "stderr: {}", result.stderr);

    let reports = report_lines(&result.stdout);
    assert_eq!(reports.len(), 30);
    for (i, report) in reports.iter().enumerate() {
        assert_eq!(report["tick"].as_u64(), Some(i as u64 + 1));
        let energy = report["total_energy"].as_f64().expect("total_energy");
        assert!(energy.is_finite() && energy >= 0.0);
    }
}

#[test]
fn test_same_seed_same_stream() {
    let tmp = TempDir::new().expect("create temp dir");
    let a = invoke(RUN, tmp.path());
    let b = invoke(RUN, tmp.path());
    assert_eq!(a.exit_code, EXIT_SUCCESS);

    let (a, b) = (report_lines(&a.stdout), report_lines(&b.stdout));
    assert_eq!(a.len(), b.len());
    for (x, y) in a.iter().zip(&b) {
        assert_eq!(x["tick"], y["tick"]);
        assert_eq!(x["frontier_size"], y["frontier_size"]);
        let (ex, ey) = (
            x["total_energy"].as_f64().expect("energy"),
            y["total_energy"].as_f64().expect("energy"),
        );
        assert!((ex - ey).abs() <= 1e-9 * ex.max(1.0), "tick {}: {} vs {}", x["tick"], ex, ey);
    }
}

#[test]
fn test_saved_snapshot_is_json() {
    let tmp = TempDir::new().expect("create temp dir");
    let path = tmp.path().join("out").join("graph.json");
    let mut args = RUN.to_vec();
    args.extend(["--summary-only", "--save", path.to_str().expect("utf-8 path")]);

    let result = invoke(&args, tmp.path());
    assert_eq!(result.exit_code, EXIT_SUCCESS, "stderr: {}", result.stderr);
    assert_eq!(report_lines(&result.stdout).len(), 1);

    let snapshot: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).expect("snapshot written")).expect("json");
    assert_eq!(snapshot["nodes"].as_array().map(Vec::len), Some(20));
    assert_eq!(snapshot["tick"].as_u64(), Some(30));
}
