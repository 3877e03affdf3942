// crates/pick-policy-service/tests/service.rs
// ============================================================================
// Module: Policy Service Tests
// Description: Evaluation, audit, alert, and reset behavior of the service.
// Purpose: Ensure audit failures are non-fatal to decisions but fatal to resets.
// ============================================================================

//! ## Overview
//! Exercises the service façade over in-memory stores with a recording event
//! sink, asserting on decisions, audit entries, and emitted event labels.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only assertions and helpers are permitted."
)]

mod common;

use std::sync::Arc;
use std::time::Duration;
use std::time::Instant;

use pick_policy_config::AuditConfig;
use pick_policy_core::Actor;
use pick_policy_core::ActorId;
use pick_policy_core::ActorRole;
use pick_policy_core::AuditAction;
use pick_policy_core::DecisionStatus;
use pick_policy_core::InMemoryHardStopStore;
use pick_policy_core::PredictionInput;
use pick_policy_core::TraceId;
use pick_policy_service::EventDetail;
use pick_policy_service::MemoryEventSink;
use pick_policy_service::ServiceError;

use crate::common::FailingAuditStore;
use crate::common::critical_metrics;
use crate::common::harness;
use crate::common::harness_with;
use crate::common::harness_with_audit;
use crate::common::passing_metrics;
use crate::common::prediction;
use crate::common::run_context;
use crate::common::warning_metrics;

fn admin() -> Actor {
    Actor::new("admin-1", ActorRole::Admin)
}

// ============================================================================
// SECTION: Evaluation
// ============================================================================

#[test]
fn passing_prediction_is_picked_and_logged() {
    let h = harness();
    let result = h.service.evaluate_prediction(&prediction("p-1", passing_metrics()), &run_context()).unwrap();
    assert_eq!(result.status, DecisionStatus::Pick);
    assert_eq!(h.events.labels(), vec!["policy_evaluation"]);
    assert!(h.audit.entries().unwrap().is_empty());
}

#[test]
fn warning_failure_is_no_bet_without_audit() {
    let h = harness();
    let result = h.service.evaluate_prediction(&prediction("p-1", warning_metrics()), &run_context()).unwrap();
    assert_eq!(result.status, DecisionStatus::NoBet);
    assert!(!h.service.latch().is_active());
    assert!(h.audit.entries().unwrap().is_empty());
}

#[test]
fn critical_failure_is_audited_with_the_decision_trace() {
    let h = harness();
    let context = run_context().with_trace_id(TraceId::new("trace-daily-run"));
    let result = h.service.evaluate_prediction(&prediction("p-1", critical_metrics()), &context).unwrap();
    assert_eq!(result.status, DecisionStatus::HardStop);
    assert_eq!(result.trace_id.as_str(), "trace-daily-run");

    let entries = h.audit.entries().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].action, AuditAction::HardStopTriggered);
    assert_eq!(entries[0].trace_id, result.trace_id);
    assert_eq!(h.events.labels(), vec!["hard_stop_triggered", "policy_evaluation"]);
}

fn alert_count(events: &MemoryEventSink) -> usize {
    events.labels().iter().filter(|label| **label == "operational_alert").count()
}

#[test]
fn trigger_audit_failure_still_returns_decision_and_alerts() {
    let failing = Arc::new(FailingAuditStore::default());
    let h = harness_with(InMemoryHardStopStore::new(), Some(failing.clone()), 4);
    let result = h.service.evaluate_prediction(&prediction("p-1", critical_metrics()), &run_context()).unwrap();
    assert_eq!(result.status, DecisionStatus::HardStop);
    assert!(h.service.latch().is_active());

    drop(h.service);
    assert_eq!(failing.calls(), 2);
    let events = h.events.events();
    let alert = events.iter().find(|event| event.event == "operational_alert").unwrap();
    assert!(matches!(
        alert.detail,
        EventDetail::Alert {
            code: "AUDIT_WRITE_FAILURE",
            ..
        }
    ));
}

#[test]
fn trigger_audit_retries_do_not_delay_the_decision() {
    let failing = Arc::new(FailingAuditStore::default());
    let h = harness_with_audit(
        InMemoryHardStopStore::new(),
        Some(failing.clone()),
        4,
        AuditConfig {
            max_attempts: 3,
            retry_backoff_ms: 300,
        },
    );
    let started = Instant::now();
    let result = h.service.evaluate_prediction(&prediction("p-1", critical_metrics()), &run_context()).unwrap();
    assert!(started.elapsed() < Duration::from_millis(250));
    assert_eq!(result.status, DecisionStatus::HardStop);

    let started = Instant::now();
    let later = h.service.evaluate_prediction(&prediction("p-2", passing_metrics()), &run_context()).unwrap();
    assert!(started.elapsed() < Duration::from_millis(250));
    assert_eq!(later.status, DecisionStatus::HardStop);

    drop(h.service);
    assert_eq!(failing.calls(), 3);
    assert_eq!(alert_count(&h.events), 1);
}

#[test]
fn missing_prediction_id_is_invalid_input() {
    let h = harness();
    let input = PredictionInput {
        prediction_id: None,
        event_id: None,
        metrics: critical_metrics(),
    };
    let err = h.service.evaluate_prediction(&input, &run_context()).unwrap_err();
    assert_eq!(err.code(), "INVALID_INPUT");
    assert!(!h.service.latch().is_active());
    assert!(h.events.labels().is_empty());
}

#[test]
fn malformed_trace_id_is_rejected() {
    let h = harness();
    let context = run_context().with_trace_id(TraceId::new("bad trace"));
    let err = h.service.evaluate_prediction(&prediction("p-1", passing_metrics()), &context).unwrap_err();
    assert!(matches!(err, ServiceError::InvalidTraceId(_)));
    assert_eq!(err.code(), "INVALID_INPUT");
}

#[test]
fn issued_trace_ids_are_unique_per_evaluation() {
    let h = harness();
    let first = h.service.evaluate_prediction(&prediction("p-1", passing_metrics()), &run_context()).unwrap();
    let second = h.service.evaluate_prediction(&prediction("p-2", passing_metrics()), &run_context()).unwrap();
    assert_ne!(first.trace_id, second.trace_id);
    assert!(first.trace_id.as_str().starts_with("trace-"));
}

// ============================================================================
// SECTION: Reset
// ============================================================================

#[test]
fn user_reset_is_rejected_and_logged() {
    let h = harness();
    h.service.evaluate_prediction(&prediction("p-1", critical_metrics()), &run_context()).unwrap();
    let err = h
        .service
        .reset(Actor::new("viewer", ActorRole::User), Some("please".to_string()), None)
        .unwrap_err();
    assert_eq!(err.code(), "UNAUTHORIZED_RESET");
    assert!(h.service.latch().is_active());
    assert_eq!(h.events.labels().last(), Some(&"hard_stop_reset_rejected"));
}

#[test]
fn missing_reason_is_rejected() {
    let h = harness();
    h.service.evaluate_prediction(&prediction("p-1", critical_metrics()), &run_context()).unwrap();
    let err = h.service.reset(admin(), Some("  ".to_string()), None).unwrap_err();
    assert_eq!(err.code(), "MISSING_REASON");
    assert!(h.service.latch().is_active());
}

#[test]
fn admin_reset_clears_latch_and_correlates_trace() {
    let h = harness();
    h.service.evaluate_prediction(&prediction("p-1", critical_metrics()), &run_context()).unwrap();
    let outcome = h
        .service
        .reset(admin(), Some("data vendor fixed feed".to_string()), Some("trace-ops-42"))
        .unwrap();
    assert!(outcome.reset_performed);
    assert!(outcome.previous_state.cause.is_some());

    let entries = h.audit.entries().unwrap();
    let reset = entries.last().unwrap();
    assert_eq!(reset.action, AuditAction::HardStopReset);
    assert_eq!(reset.actor_id, ActorId::new("admin-1"));
    assert_eq!(reset.trace_id.as_str(), "trace-ops-42");
    assert_eq!(h.events.labels().last(), Some(&"hard_stop_reset"));

    let after = h.service.evaluate_prediction(&prediction("p-2", passing_metrics()), &run_context()).unwrap();
    assert_eq!(after.status, DecisionStatus::Pick);
}

#[test]
fn reset_blocked_when_audit_unavailable() {
    let h = harness_with(
        InMemoryHardStopStore::new(),
        Some(Arc::new(FailingAuditStore::default())),
        4,
    );
    h.service.evaluate_prediction(&prediction("p-1", critical_metrics()), &run_context()).unwrap();
    let err = h.service.reset(admin(), Some("feed repaired".to_string()), None).unwrap_err();
    assert_eq!(err.code(), "AUDIT_WRITE_FAILURE");
    assert!(h.service.latch().is_active());
    assert!(h.events.labels().contains(&"hard_stop_reset_rejected"));

    drop(h.service);
    assert_eq!(alert_count(&h.events), 2);
}

#[test]
fn reset_while_inactive_is_noop() {
    let h = harness();
    let outcome = h.service.reset(admin(), Some("routine check".to_string()), None).unwrap();
    assert!(!outcome.reset_performed);
    assert_eq!(h.audit.entries().unwrap()[0].action, AuditAction::HardStopResetNoop);
    assert_eq!(h.events.labels(), vec!["hard_stop_reset_noop"]);
}

// ============================================================================
// SECTION: Status and Config
// ============================================================================

#[test]
fn status_reports_cause_and_history() {
    let h = harness();
    assert!(!h.service.get_status().unwrap().active);
    h.service.evaluate_prediction(&prediction("p-1", critical_metrics()), &run_context()).unwrap();
    h.service.evaluate_prediction(&prediction("p-2", passing_metrics()), &run_context()).unwrap();

    let status = h.service.get_status().unwrap();
    assert!(status.active);
    assert!(status.cause.unwrap().contains("data_quality"));
    assert!(status.triggered_at.is_some());
    assert_eq!(status.affected_count, 2);
    assert_eq!(status.history.len(), 1);
}

#[test]
fn config_reports_fingerprint_matching_decisions() {
    let h = harness();
    let config = h.service.get_config();
    assert_eq!(config.policy_version, "v1");
    assert_eq!(config.hash_algorithm, "sha256");
    assert_eq!(config.policy_hash.len(), 64);
    let result = h.service.evaluate_prediction(&prediction("p-1", passing_metrics()), &run_context()).unwrap();
    assert_eq!(result.policy_hash, config.policy_hash);
}

#[test]
fn latch_restores_across_service_instances() {
    let store = InMemoryHardStopStore::new();
    let first = harness_with(store.clone(), None, 4);
    first.service.evaluate_prediction(&prediction("p-1", critical_metrics()), &run_context()).unwrap();
    drop(first);

    let second = harness_with(store, None, 4);
    let result = second.service.evaluate_prediction(&prediction("p-2", passing_metrics()), &run_context()).unwrap();
    assert_eq!(result.status, DecisionStatus::HardStop);
}
