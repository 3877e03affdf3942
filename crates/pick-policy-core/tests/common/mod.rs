// crates/pick-policy-core/tests/common/mod.rs
// ============================================================================
// Module: Common Test Fixtures
// Description: Shared fixtures for engine, gate, and latch tests.
// Purpose: Build isolated engines with in-memory or failing stores.
// Dependencies: pick-policy-core
// ============================================================================

//! ## Overview
//! Every harness owns its own latch, so tests never share hard-stop state.

#![allow(dead_code, reason = "Shared test helpers may be unused in some cases.")]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::sync::Barrier;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;

use pick_policy_core::Actor;
use pick_policy_core::ActorRole;
use pick_policy_core::AuditError;
use pick_policy_core::AuditLogEntry;
use pick_policy_core::AuditStore;
use pick_policy_core::HardStopLatch;
use pick_policy_core::HardStopState;
use pick_policy_core::HardStopStore;
use pick_policy_core::IdGenerator;
use pick_policy_core::InMemoryAuditStore;
use pick_policy_core::InMemoryHardStopStore;
use pick_policy_core::LogicalClock;
use pick_policy_core::PolicyConfig;
use pick_policy_core::PolicyEngine;
use pick_policy_core::PredictionInput;
use pick_policy_core::PredictionMetrics;
use pick_policy_core::ResetRequest;
use pick_policy_core::RunContext;
use pick_policy_core::StoreError;
use pick_policy_core::Timestamp;
use pick_policy_core::TraceId;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

/// Metrics that pass every default gate.
#[must_use]
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

/// Metrics that fail only the critical data-quality gate.
#[must_use]
pub fn critical_metrics() -> PredictionMetrics {
    PredictionMetrics {
        data_quality_score: Some(0.1),
        ..passing_metrics()
    }
}

/// Metrics that fail only the warning drift gate.
#[must_use]
pub fn warning_metrics() -> PredictionMetrics {
    PredictionMetrics {
        drift_score: Some(0.4),
        ..passing_metrics()
    }
}

/// Builds a prediction with the given id and metrics.
#[must_use]
pub fn prediction(id: &str, metrics: PredictionMetrics) -> PredictionInput {
    PredictionInput::new(id, metrics)
}

/// Deterministic run context.
#[must_use]
pub fn run_context() -> RunContext {
    RunContext::new("run-1", "orchestrator", Timestamp::Logical(0))
}

/// Reset request for the given role and reason.
#[must_use]
pub fn reset_request(role: Option<ActorRole>, reason: Option<&str>) -> ResetRequest {
    ResetRequest {
        actor: Actor {
            user_id: pick_policy_core::ActorId::new("operator-1"),
            role,
        },
        reason: reason.map(str::to_string),
        trace_id: TraceId::new("trace-reset"),
    }
}

// ============================================================================
// SECTION: Harness
// ============================================================================

/// Isolated engine with in-memory collaborators.
pub struct Harness {
    /// Engine under test.
    pub engine: PolicyEngine,
    /// Latch shared with the engine.
    pub latch: Arc<HardStopLatch>,
    /// Backing hard-stop store.
    pub store: InMemoryHardStopStore,
    /// Audit store for resets.
    pub audit: InMemoryAuditStore,
}

/// Builds a harness with the default policy.
#[must_use]
pub fn harness() -> Harness {
    harness_with(PolicyConfig::default(), InMemoryHardStopStore::new())
}

/// Builds a harness with an explicit policy and store.
#[must_use]
pub fn harness_with(config: PolicyConfig, store: InMemoryHardStopStore) -> Harness {
    let clock = Arc::new(LogicalClock::default());
    let latch = Arc::new(HardStopLatch::open(Arc::new(store.clone()), clock.clone()).unwrap());
    let engine = PolicyEngine::new(config, Arc::clone(&latch), clock)
        .unwrap()
        .with_id_generator(IdGenerator::with_boot_id(7));
    Harness {
        engine,
        latch,
        store,
        audit: InMemoryAuditStore::new(),
    }
}

// ============================================================================
// SECTION: Failing Collaborators
// ============================================================================

/// Audit store that always reports unavailability.
#[derive(Debug, Default)]
pub struct FailingAuditStore;

impl AuditStore for FailingAuditStore {
    fn append(&self, _entry: &AuditLogEntry) -> Result<(), AuditError> {
        Err(AuditError::Unavailable("audit backend offline".to_string()))
    }
}

/// Hard-stop store whose saves can be switched to fail.
#[derive(Debug, Default)]
pub struct FlakyHardStopStore {
    /// Inner store.
    pub inner: InMemoryHardStopStore,
    /// When true, saves fail.
    pub fail_saves: AtomicBool,
}

impl FlakyHardStopStore {
    /// Enables or disables save failures.
    pub fn set_failing(&self, failing: bool) {
        self.fail_saves.store(failing, Ordering::SeqCst);
    }
}

impl HardStopStore for FlakyHardStopStore {
    fn load(&self) -> Result<Option<HardStopState>, StoreError> {
        self.inner.load()
    }

    fn save(&self, state: &HardStopState) -> Result<(), StoreError> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(StoreError::Io("disk full".to_string()));
        }
        self.inner.save(state)
    }
}

/// Audit store that parks every append between two rendezvous points.
///
/// A test waits on `entered` to know an append is in flight, then on
/// `release` to let it finish.
pub struct BlockingAuditStore {
    /// Reached once the append has started.
    pub entered: Barrier,
    /// Reached to let the append complete.
    pub release: Barrier,
    /// Entries recorded after release.
    pub inner: InMemoryAuditStore,
}

impl BlockingAuditStore {
    /// Creates a store that blocks a single appender at a time.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entered: Barrier::new(2),
            release: Barrier::new(2),
            inner: InMemoryAuditStore::new(),
        }
    }
}

impl AuditStore for BlockingAuditStore {
    fn append(&self, entry: &AuditLogEntry) -> Result<(), AuditError> {
        self.entered.wait();
        self.release.wait();
        self.inner.append(entry)
    }
}
