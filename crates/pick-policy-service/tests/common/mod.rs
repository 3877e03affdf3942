// crates/pick-policy-service/tests/common/mod.rs
// ============================================================================
// Module: Service Test Helpers
// Description: Shared fixtures for policy service integration tests.
// Purpose: Build isolated services over in-memory stores and event sinks.
// ============================================================================

#![allow(dead_code, reason = "Shared test helpers may be unused in some cases.")]

use std::sync::Arc;
use std::sync::atomic::AtomicU32;
use std::sync::atomic::Ordering;

use pick_policy_config::AuditConfig;
use pick_policy_core::AuditError;
use pick_policy_core::AuditLogEntry;
use pick_policy_core::AuditStore;
use pick_policy_core::IdGenerator;
use pick_policy_core::InMemoryAuditStore;
use pick_policy_core::InMemoryHardStopStore;
use pick_policy_core::LogicalClock;
use pick_policy_core::PolicyConfig;
use pick_policy_core::PredictionInput;
use pick_policy_core::PredictionMetrics;
use pick_policy_core::RunContext;
use pick_policy_core::Timestamp;
use pick_policy_service::MemoryEventSink;
use pick_policy_service::PolicyService;
use pick_policy_service::PolicyServiceParams;

/// Metrics that pass every default gate.
pub fn passing_metrics() -> PredictionMetrics {
    PredictionMetrics {
        confidence: Some(0.8),
        drift_score: Some(0.05),
        calibration_error: Some(0.02),
        data_quality_score: Some(0.9),
        data_age_hours: Some(2.0),
        kill_switch: Some(false),
        ..PredictionMetrics::default()
    }
}

/// Metrics failing the critical data-quality gate.
pub fn critical_metrics() -> PredictionMetrics {
    PredictionMetrics {
        data_quality_score: Some(0.1),
        ..passing_metrics()
    }
}

/// Metrics failing only the warning drift gate.
pub fn warning_metrics() -> PredictionMetrics {
    PredictionMetrics {
        drift_score: Some(0.4),
        ..passing_metrics()
    }
}

/// Builds a prediction input.
pub fn prediction(id: &str, metrics: PredictionMetrics) -> PredictionInput {
    PredictionInput::new(id, metrics)
}

/// Builds a run context without a trace id.
pub fn run_context() -> RunContext {
    RunContext::new("run-1", "orchestrator", Timestamp::Logical(0))
}

/// Audit store that is always unavailable and counts attempts.
#[derive(Default)]
pub struct FailingAuditStore {
    calls: AtomicU32,
}

impl FailingAuditStore {
    /// Returns the number of append attempts seen.
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

impl AuditStore for FailingAuditStore {
    fn append(&self, _entry: &AuditLogEntry) -> Result<(), AuditError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(AuditError::Unavailable("audit database offline".to_string()))
    }
}

/// Service plus handles on its collaborators.
pub struct Harness {
    pub service: PolicyService,
    pub store: InMemoryHardStopStore,
    pub audit: InMemoryAuditStore,
    pub events: Arc<MemoryEventSink>,
}

/// Builds a service over healthy in-memory stores.
pub fn harness() -> Harness {
    harness_with(InMemoryHardStopStore::new(), None, 4)
}

/// Builds a service with an optional replacement audit store.
pub fn harness_with(
    store: InMemoryHardStopStore,
    audit_override: Option<Arc<dyn AuditStore>>,
    max_parallel_evaluations: usize,
) -> Harness {
    let audit_config = AuditConfig {
        max_attempts: 2,
        retry_backoff_ms: 0,
    };
    harness_with_audit(store, audit_override, max_parallel_evaluations, audit_config)
}

/// Builds a service with an explicit audit retry policy.
pub fn harness_with_audit(
    store: InMemoryHardStopStore,
    audit_override: Option<Arc<dyn AuditStore>>,
    max_parallel_evaluations: usize,
    audit_config: AuditConfig,
) -> Harness {
    let audit = InMemoryAuditStore::new();
    let events = Arc::new(MemoryEventSink::new());
    let audit_store: Arc<dyn AuditStore> =
        audit_override.unwrap_or_else(|| Arc::new(audit.clone()));
    let service = PolicyService::new(PolicyServiceParams {
        policy: PolicyConfig::default(),
        hard_stop_store: Arc::new(store.clone()),
        audit_store,
        events: events.clone(),
        clock: Arc::new(LogicalClock::default()),
        audit: audit_config,
        max_parallel_evaluations,
    })
    .unwrap()
    .with_id_generator(IdGenerator::with_boot_id(7));
    Harness {
        service,
        store,
        audit,
        events,
    }
}
