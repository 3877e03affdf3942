// crates/pick-policy-service/tests/bootstrap.rs
// ============================================================================
// Module: Bootstrap Tests
// Description: Service construction from configuration.
// Purpose: Ensure configured backends and sinks are wired and durable.
// ============================================================================

//! Service bootstrap tests from configuration.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only assertions and helpers are permitted."
)]

mod common;

use std::fs;
use std::path::Path;

use pick_policy_config::PickPolicyConfig;
use pick_policy_core::Actor;
use pick_policy_core::ActorRole;
use pick_policy_core::DecisionStatus;
use pick_policy_store_sqlite::SqlitePolicyStore;
use pick_policy_store_sqlite::SqliteStoreConfig;
use pick_policy_service::build_service;
use serde_json::Value;
use tempfile::TempDir;

use crate::common::critical_metrics;
use crate::common::passing_metrics;
use crate::common::prediction;
use crate::common::run_context;

fn sqlite_config(dir: &Path, events: &str) -> PickPolicyConfig {
    let toml = format!(
        "[store]\ntype = \"sqlite\"\npath = \"{}\"\n\n[events]\n{events}\n",
        dir.join("policy.db").display()
    );
    PickPolicyConfig::from_toml_str(&toml).unwrap()
}

#[test]
fn memory_backend_builds_with_defaults() {
    let config = PickPolicyConfig::from_toml_str("[events]\nsink = \"none\"\n").unwrap();
    let service = build_service(&config).unwrap();
    let result = service.evaluate_prediction(&prediction("p-1", passing_metrics()), &run_context()).unwrap();
    assert_eq!(result.status, DecisionStatus::Pick);
}

#[test]
fn sqlite_backend_restores_latch_after_restart() {
    let dir = TempDir::new().unwrap();
    let config = sqlite_config(dir.path(), "sink = \"none\"");
    {
        let service = build_service(&config).unwrap();
        let result =
            service.evaluate_prediction(&prediction("p-1", critical_metrics()), &run_context()).unwrap();
        assert_eq!(result.status, DecisionStatus::HardStop);
    }

    let service = build_service(&config).unwrap();
    assert!(service.get_status().unwrap().active);
    let result = service.evaluate_prediction(&prediction("p-2", passing_metrics()), &run_context()).unwrap();
    assert_eq!(result.status, DecisionStatus::HardStop);

    service
        .reset(Actor::new("admin-1", ActorRole::Admin), Some("vendor fixed".to_string()), None)
        .unwrap();
    drop(service);

    let store = SqlitePolicyStore::new(SqliteStoreConfig::new(dir.path().join("policy.db"))).unwrap();
    let records = store.list_audit_entries(10).unwrap();
    assert_eq!(records.len(), 2);
    assert!(store.verify_audit_chain().unwrap().is_intact());
}

#[test]
fn file_sink_writes_json_lines() {
    let dir = TempDir::new().unwrap();
    let log = dir.path().join("events.jsonl");
    let config = sqlite_config(dir.path(), &format!("sink = \"file\"\npath = \"{}\"", log.display()));
    let service = build_service(&config).unwrap();
    service.evaluate_prediction(&prediction("p-1", critical_metrics()), &run_context()).unwrap();

    let contents = fs::read_to_string(&log).unwrap();
    let events: Vec<Value> = contents.lines().map(|line| serde_json::from_str(line).unwrap()).collect();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0]["event"], "hard_stop_triggered");
    assert_eq!(events[0]["gate"], "data_quality");
    assert_eq!(events[1]["event"], "policy_evaluation");
    assert_eq!(events[1]["status"], "HARD_STOP");
    assert_eq!(events[0]["trace_id"], events[1]["trace_id"]);
}

#[test]
fn invalid_config_is_rejected_before_opening_stores() {
    let mut config = PickPolicyConfig::default();
    config.service.max_parallel_evaluations = 0;
    let err = build_service(&config).err().unwrap();
    assert_eq!(err.code(), "INVALID_CONFIG");
}
