// crates/pick-policy-core/src/runtime/engine.rs
// ============================================================================
// Module: Pick Policy Engine
// Description: Ordered gate evaluation, decision aggregation, and latch updates.
// Purpose: Turn one prediction into PICK, NO_BET, or HARD_STOP deterministically.
// Dependencies: crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! The policy engine is the single canonical decision path. Every surface
//! (service, CLI, batch runs) calls [`PolicyEngine::evaluate_detailed`] so the
//! sticky latch, gate ordering, and fail-closed fault handling are applied
//! identically everywhere.
//!
//! Status is a pure function of the prediction metrics, the configuration,
//! and whether the latch was active at the instant of evaluation.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use thiserror::Error;

use crate::core::AuditLogEntry;
use crate::core::DEFAULT_HASH_ALGORITHM;
use crate::core::DecisionStatus;
use crate::core::GateResult;
use crate::core::GateSeverity;
use crate::core::HashError;
use crate::core::PolicyConfig;
use crate::core::PolicyConfigError;
use crate::core::PolicyEvaluationResult;
use crate::core::PredictionInput;
use crate::core::PredictionMetrics;
use crate::core::RunContext;
use crate::core::TraceId;
use crate::interfaces::Clock;
use crate::runtime::gate::Gate;
use crate::runtime::gate::fault_result;
use crate::runtime::ids::IdGenerator;
use crate::runtime::latch::HardStopLatch;
use crate::runtime::latch::LatchError;
use crate::runtime::latch::LatchView;
use crate::runtime::latch::TriggerRequest;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Rationale used when no gate failed.
pub const ALL_GATES_PASSED: &str = "all gates passed";
/// Separator between failing gate messages in a rationale.
const RATIONALE_SEPARATOR: &str = "; ";

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Policy engine errors.
#[derive(Debug, Error)]
pub enum PolicyError {
    /// The prediction is missing its identity.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// The policy configuration failed validation.
    #[error("invalid policy config: {0}")]
    InvalidConfig(#[from] PolicyConfigError),
    /// The policy configuration could not be fingerprinted.
    #[error("policy hash error: {0}")]
    Hash(#[from] HashError),
}

impl PolicyError {
    /// Returns a stable machine-readable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "INVALID_INPUT",
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::Hash(_) => "POLICY_HASH_ERROR",
        }
    }
}

// ============================================================================
// SECTION: Outcomes
// ============================================================================

/// Evaluation result plus the side effects the caller must act on.
#[derive(Debug, Clone)]
pub struct EvaluationOutcome {
    /// Decision returned to the caller.
    pub result: PolicyEvaluationResult,
    /// Audit entry to append when this evaluation engaged the latch.
    pub trigger_audit: Option<AuditLogEntry>,
    /// Latch failure to surface as an operational alert.
    pub latch_error: Option<LatchError>,
}

// ============================================================================
// SECTION: Engine
// ============================================================================

/// Deterministic policy engine bound to one configuration and one latch.
pub struct PolicyEngine {
    /// Validated configuration.
    config: PolicyConfig,
    /// Gates in evaluation order.
    gates: Vec<Gate>,
    /// Canonical configuration fingerprint.
    policy_hash: String,
    /// Shared hard-stop latch.
    latch: Arc<HardStopLatch>,
    /// Time source for `executed_at`.
    clock: Arc<dyn Clock>,
    /// Decision and trace id issuance.
    ids: IdGenerator,
}

impl PolicyEngine {
    /// Builds an engine after validating the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError::InvalidConfig`] when validation fails.
    pub fn new(
        config: PolicyConfig,
        latch: Arc<HardStopLatch>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, PolicyError> {
        let (gates, policy_hash) = compile(&config)?;
        Ok(Self {
            config,
            gates,
            policy_hash,
            latch,
            clock,
            ids: IdGenerator::new(),
        })
    }

    /// Replaces the identifier generator.
    #[must_use]
    pub fn with_id_generator(mut self, ids: IdGenerator) -> Self {
        self.ids = ids;
        self
    }

    /// Swaps in a new configuration; the current one stays on failure.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError::InvalidConfig`] when validation fails.
    pub fn reconfigure(&mut self, config: PolicyConfig) -> Result<(), PolicyError> {
        let (gates, policy_hash) = compile(&config)?;
        self.config = config;
        self.gates = gates;
        self.policy_hash = policy_hash;
        Ok(())
    }

    /// Returns the active configuration.
    #[must_use]
    pub const fn config(&self) -> &PolicyConfig {
        &self.config
    }

    /// Returns the canonical configuration fingerprint.
    #[must_use]
    pub fn policy_hash(&self) -> &str {
        &self.policy_hash
    }

    /// Returns the shared latch.
    #[must_use]
    pub const fn latch(&self) -> &Arc<HardStopLatch> {
        &self.latch
    }

    /// Returns the identifier generator.
    #[must_use]
    pub const fn ids(&self) -> &IdGenerator {
        &self.ids
    }

    /// Evaluates a prediction and returns only the decision.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError::InvalidInput`] when the prediction id is missing.
    pub fn evaluate(
        &self,
        prediction: &PredictionInput,
        context: &RunContext,
    ) -> Result<PolicyEvaluationResult, PolicyError> {
        self.evaluate_detailed(prediction, context).map(|outcome| outcome.result)
    }

    /// Evaluates a prediction and reports latch side effects.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError::InvalidInput`] when the prediction id is missing
    /// or blank. No gate runs and no state changes in that case.
    pub fn evaluate_detailed(
        &self,
        prediction: &PredictionInput,
        context: &RunContext,
    ) -> Result<EvaluationOutcome, PolicyError> {
        let prediction_id = match &prediction.prediction_id {
            Some(id) if !id.is_blank() => id.clone(),
            _ => {
                return Err(PolicyError::InvalidInput(
                    "prediction_id is required".to_string(),
                ));
            }
        };
        let trace_id = context.trace_id.clone().unwrap_or_else(|| self.ids.next_trace_id());

        let (status, rationale, gate_outcomes, trigger_audit, latch_error) =
            match self.latch.observe() {
                LatchView::Active {
                    cause,
                    triggered_at,
                    ..
                } => {
                    let since = triggered_at.map_or_else(|| "unknown".to_string(), |at| at.to_string());
                    let cause = cause.unwrap_or_else(|| "unspecified cause".to_string());
                    let rationale = format!("hard stop active since {since}: {cause}");
                    (DecisionStatus::HardStop, rationale, Vec::new(), None, None)
                }
                LatchView::Unavailable => (
                    DecisionStatus::HardStop,
                    "hard-stop latch unavailable; failing closed".to_string(),
                    Vec::new(),
                    None,
                    Some(LatchError::Poisoned),
                ),
                LatchView::Inactive => {
                    let outcomes = self.run_gates(&prediction.metrics);
                    let status = aggregate_status(&outcomes);
                    let rationale = build_rationale(&outcomes);
                    let (trigger_audit, latch_error) = if status == DecisionStatus::HardStop {
                        self.engage_latch(&outcomes, context, &trace_id)
                    } else {
                        (None, None)
                    };
                    (status, rationale, outcomes, trigger_audit, latch_error)
                }
            };

        let result = PolicyEvaluationResult {
            decision_id: self.ids.next_decision_id(),
            prediction_id,
            run_id: context.run_id.clone(),
            status,
            rationale,
            gate_outcomes,
            recommended_action: status.recommended_action(),
            trace_id,
            executed_at: self.clock.now(),
            policy_version: self.config.policy_version.clone(),
            policy_hash: self.policy_hash.clone(),
        };
        Ok(EvaluationOutcome {
            result,
            trigger_audit,
            latch_error,
        })
    }

    /// Runs every gate in order; faults become critical failures.
    #[must_use]
    pub fn run_gates(&self, metrics: &PredictionMetrics) -> Vec<GateResult> {
        self.gates
            .iter()
            .map(|gate| gate.evaluate(metrics).unwrap_or_else(|fault| fault_result(gate, &fault)))
            .collect()
    }

    /// Engages the latch for a critical failure.
    fn engage_latch(
        &self,
        outcomes: &[GateResult],
        context: &RunContext,
        trace_id: &TraceId,
    ) -> (Option<AuditLogEntry>, Option<LatchError>) {
        let critical: Vec<(&Gate, &GateResult)> = self
            .gates
            .iter()
            .zip(outcomes)
            .filter(|(_, outcome)| outcome.failed_with(GateSeverity::Critical))
            .collect();
        let Some((first, _)) = critical.first() else {
            return (None, None);
        };
        let gate = first.kind();
        let cause = critical
            .iter()
            .map(|(_, outcome)| outcome.message.as_str())
            .collect::<Vec<_>>()
            .join(RATIONALE_SEPARATOR);
        let request = TriggerRequest {
            gate,
            cause,
            actor: context.actor.clone(),
            run_id: context.run_id.clone(),
            trace_id: trace_id.clone(),
        };
        match self.latch.trigger(request) {
            Ok(outcome) => (outcome.audit_entry, outcome.persist_error.map(LatchError::Store)),
            Err(err) => (None, Some(err)),
        }
    }
}

// ============================================================================
// SECTION: Aggregation
// ============================================================================

/// Validates a configuration and builds its gates and fingerprint.
fn compile(config: &PolicyConfig) -> Result<(Vec<Gate>, String), PolicyError> {
    config.validate()?;
    let gates = config.gates.iter().cloned().map(Gate::new).collect();
    let policy_hash = config.fingerprint(DEFAULT_HASH_ALGORITHM)?.value;
    Ok((gates, policy_hash))
}

/// Aggregates gate results: critical failure beats warning failure beats pass.
#[must_use]
pub fn aggregate_status(outcomes: &[GateResult]) -> DecisionStatus {
    if outcomes.iter().any(|outcome| outcome.failed_with(GateSeverity::Critical)) {
        DecisionStatus::HardStop
    } else if outcomes.iter().any(|outcome| outcome.failed_with(GateSeverity::Warning)) {
        DecisionStatus::NoBet
    } else {
        DecisionStatus::Pick
    }
}

/// Joins failing gate messages in evaluation order.
#[must_use]
pub fn build_rationale(outcomes: &[GateResult]) -> String {
    let failing: Vec<&str> = outcomes
        .iter()
        .filter(|outcome| !outcome.passed)
        .map(|outcome| outcome.message.as_str())
        .collect();
    if failing.is_empty() {
        ALL_GATES_PASSED.to_string()
    } else {
        failing.join(RATIONALE_SEPARATOR)
    }
}
