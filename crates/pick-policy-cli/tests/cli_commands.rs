// crates/pick-policy-cli/tests/cli_commands.rs
// ============================================================================
// Module: CLI Command Tests
// Description: End-to-end tests driving the pick-policy binary.
// Purpose: Ensure the hard stop persists across invocations and resets are gated.
// Dependencies: pick-policy-cli binary
// ============================================================================
//! ## Overview
//! Each test writes a config backed by a temporary `SQLite` store, then runs
//! the binary repeatedly so state must survive process restarts.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only assertions and helpers are permitted."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::process::Command;
use std::process::Output;

use serde_json::Value;
use tempfile::TempDir;

// ============================================================================
// SECTION: Helpers
// ============================================================================

fn pick_policy_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_pick-policy"))
}

fn write_config(dir: &Path) -> PathBuf {
    let path = dir.join("pick-policy.toml");
    let db = dir.join("policy.db");
    let toml = format!(
        "[store]\ntype = \"sqlite\"\npath = \"{}\"\n\n[events]\nsink = \"none\"\n",
        db.display()
    );
    fs::write(&path, toml).unwrap();
    path
}

fn write_input(dir: &Path, name: &str, json: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, json).unwrap();
    path
}

fn run(config: &Path, args: &[&str]) -> Output {
    Command::new(pick_policy_bin()).arg("--config").arg(config).args(args).output().unwrap()
}

fn stdout_json(output: &Output) -> Value {
    serde_json::from_slice(&output.stdout).unwrap()
}

const PASSING: &str = r#"{"prediction_id":"p-ok","metrics":{"confidence":0.8,"drift_score":0.05,"calibration_error":0.02,"data_quality_score":0.9,"data_age_hours":1.0}}"#;
const CRITICAL: &str = r#"{"prediction_id":"p-bad","metrics":{"confidence":0.8,"drift_score":0.05,"calibration_error":0.02,"data_quality_score":0.1,"data_age_hours":1.0}}"#;

// ============================================================================
// SECTION: Tests
// ============================================================================

#[test]
fn evaluate_prints_pick_envelope() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path());
    let input = write_input(dir.path(), "ok.json", PASSING);
    let output = run(&config, &["evaluate", "--input", input.to_str().unwrap(), "--trace-id", "trace-cli-1"]);
    assert!(output.status.success());
    let json = stdout_json(&output);
    assert_eq!(json["data"]["status"], "PICK");
    assert_eq!(json["meta"]["traceId"], "trace-cli-1");
}

#[test]
fn hard_stop_persists_until_admin_reset() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path());
    let bad = write_input(dir.path(), "bad.json", CRITICAL);
    let ok = write_input(dir.path(), "ok.json", PASSING);

    let output = run(&config, &["evaluate", "--input", bad.to_str().unwrap()]);
    assert!(output.status.success());
    assert_eq!(stdout_json(&output)["data"]["status"], "HARD_STOP");

    let output = run(&config, &["evaluate", "--input", ok.to_str().unwrap()]);
    assert_eq!(stdout_json(&output)["data"]["status"], "HARD_STOP");

    let output = run(&config, &["status"]);
    assert_eq!(stdout_json(&output)["data"]["active"], Value::Bool(true));

    let output = run(&config, &["reset", "--actor", "viewer", "--role", "user", "--reason", "let me"]);
    assert!(!output.status.success());
    assert_eq!(stdout_json(&output)["error"]["code"], "UNAUTHORIZED_RESET");

    let output = run(&config, &["reset", "--actor", "admin-1", "--role", "admin", "--reason", "feed repaired"]);
    assert!(output.status.success());
    assert_eq!(stdout_json(&output)["data"]["resetPerformed"], Value::Bool(true));

    let output = run(&config, &["evaluate", "--input", ok.to_str().unwrap()]);
    assert_eq!(stdout_json(&output)["data"]["status"], "PICK");

    let output = run(&config, &["audit", "list"]);
    let entries = stdout_json(&output)["entries"].as_array().unwrap().clone();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["entry"]["action"], "hard_stop_triggered");
    assert_eq!(entries[1]["entry"]["action"], "hard_stop_reset");

    let output = run(&config, &["audit", "verify"]);
    assert!(output.status.success());
    assert_eq!(stdout_json(&output)["status"], "pass");
}

#[test]
fn batch_input_prints_results_in_order() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path());
    let batch = format!("[{PASSING},{{\"metrics\":{{}}}}]");
    let input = write_input(dir.path(), "batch.json", &batch);
    let output = run(&config, &["evaluate", "--input", input.to_str().unwrap()]);
    assert!(!output.status.success());
    let json = stdout_json(&output);
    assert_eq!(json[0]["data"]["predictionId"], "p-ok");
    assert_eq!(json[1]["error"]["code"], "INVALID_INPUT");
}

#[test]
fn config_show_reports_fingerprint() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path());
    let output = run(&config, &["config", "show"]);
    assert!(output.status.success());
    let json = stdout_json(&output);
    assert_eq!(json["data"]["hashAlgorithm"], "sha256");
    assert_eq!(json["data"]["policyHash"].as_str().unwrap().len(), 64);
}

#[test]
fn invalid_config_fails_before_running_command() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("pick-policy.toml");
    fs::write(&config, "[service]\nmax_parallel_evaluations = 0\n").unwrap();
    let output = run(&config, &["config", "validate"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("max_parallel_evaluations"));
}

#[test]
fn audit_commands_require_sqlite_store() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("pick-policy.toml");
    fs::write(&config, "[events]\nsink = \"none\"\n").unwrap();
    let output = run(&config, &["audit", "verify"]);
    assert!(!output.status.success());
    assert!(String::from_utf8(output.stderr).unwrap().contains("sqlite"));
}
