//! CLI integration tests

use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

const CANONICAL: &str =
    r#"["cpu_usage","memory_usage","active_conns","error_rate","response_p95","capacity"]"#;

fn nbctl(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_nbctl"))
        .args(args)
        .env("NO_COLOR", "1")
        .output()
        .expect("Failed to execute command")
}

fn write(dir: &Path, name: &str, content: &str) -> String {
    let path = dir.join(name);
    std::fs::write(&path, content).unwrap();
    path.display().to_string()
}

/// Test that the CLI shows help
#[test]
fn test_cli_help() {
    let output = nbctl(&["--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI help should succeed");
    assert!(stdout.contains("verify"), "Should show verify command");
    assert!(stdout.contains("show"), "Should show show command");
    assert!(stdout.contains("features"), "Should show features command");
    assert!(stdout.contains("schema"), "Should show schema command");
}

#[test]
fn test_cli_version() {
    let output = nbctl(&["--version"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success());
    assert!(stdout.contains("nbctl"), "Should show binary name");
}

#[test]
fn test_schema_lists_canonical_order() {
    let output = nbctl(&["schema", "--format", "json"]);
    assert!(output.status.success());
    let names: Vec<String> = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(
        names,
        vec![
            "cpu_usage",
            "memory_usage",
            "active_conns",
            "error_rate",
            "response_p95",
            "capacity"
        ]
    );
}

#[test]
fn test_verify_matching_manifest() {
    let dir = TempDir::new().unwrap();
    let manifest = write(dir.path(), "feature_manifest.json", CANONICAL);

    let output = nbctl(&["verify", &manifest]);
    assert!(output.status.success());
}

#[test]
fn test_verify_extra_feature_exits_nonzero() {
    let dir = TempDir::new().unwrap();
    let manifest = write(
        dir.path(),
        "feature_manifest.json",
        r#"{"features":["cpu_usage","memory_usage","active_conns","error_rate","response_p95","capacity","foo"]}"#,
    );

    let output = nbctl(&["--format", "json", "verify", &manifest]);
    assert_eq!(output.status.code(), Some(1));

    let result: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(result["ok"], false);
    assert_eq!(result["missing"], serde_json::json!([]));
    assert_eq!(result["extra"], serde_json::json!(["foo"]));
}

#[test]
fn test_verify_missing_manifest_fails_loudly() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("absent.json").display().to_string();

    let output = nbctl(&["verify", &missing]);
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(!output.status.success());
    assert!(stderr.contains("not found"), "stderr: {}", stderr);
}

#[test]
fn test_features_from_row_dump() {
    let dir = TempDir::new().unwrap();
    let rows = r#"[
        {"request_id": 1, "server_id": 1, "timestamp": "2024-01-01T00:00:00Z",
         "response_time": 100.0, "status": "success", "capacity": 100,
         "metric_timestamp": "2024-01-01T00:00:00Z", "cpu_usage": 50.0,
         "memory_usage": 40.0, "request_count": 1},
        {"request_id": 2, "server_id": 1, "timestamp": "2024-01-01T00:02:00Z",
         "response_time": 200.0, "status": "failure", "capacity": 100,
         "metric_timestamp": "2024-01-01T00:02:00Z", "cpu_usage": 60.0,
         "memory_usage": 40.0, "request_count": 1},
        {"request_id": 3, "server_id": 1, "timestamp": "2024-01-01T00:04:00Z",
         "response_time": 300.0, "status": "success", "capacity": 100,
         "metric_timestamp": "2024-01-01T00:04:00Z", "cpu_usage": 70.0,
         "memory_usage": 40.0, "request_count": 1}
    ]"#;
    let path = write(dir.path(), "rows.json", rows);

    let output = nbctl(&["features", &path, "--format", "json"]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let v = &report["features"][0];
    assert_eq!(v["server_id"], 1);
    assert_eq!(v["cpu_usage"], 60.0);
    assert_eq!(v["active_conns"], 3);
    assert!((v["error_rate"].as_f64().unwrap() - 1.0 / 3.0).abs() < 1e-9);
    assert!((v["response_p95"].as_f64().unwrap() - 290.0).abs() < 1e-9);
    assert_eq!(report["labels"][0]["server_id"], 1);
}

#[test]
fn test_features_empty_dump() {
    let dir = TempDir::new().unwrap();
    let path = write(dir.path(), "rows.json", "[]");

    let output = nbctl(&["features", &path, "--format", "json"]);
    assert!(output.status.success());
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["features"], serde_json::json!([]));
    assert_eq!(report["labels"], serde_json::json!([]));
}
