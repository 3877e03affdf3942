// crates/pick-policy-core/src/core/decision.rs
// ============================================================================
// Module: Pick Policy Decisions
// Description: Decision status, recommended actions, and evaluation results.
// Purpose: Define the record returned for every evaluated prediction.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! A [`PolicyEvaluationResult`] is owned by the caller after return; the engine
//! keeps no reference to it.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use crate::core::gates::GateResult;
use crate::core::identifiers::DecisionId;
use crate::core::identifiers::PredictionId;
use crate::core::identifiers::RunId;
use crate::core::identifiers::TraceId;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Decision Status
// ============================================================================

/// Final decision for a prediction.
///
/// # Invariants
/// - Ordered by precedence: `Pick < NoBet < HardStop`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DecisionStatus {
    /// All gates passed.
    Pick,
    /// At least one warning gate failed.
    NoBet,
    /// A critical gate failed or the hard-stop latch is active.
    HardStop,
}

impl DecisionStatus {
    /// Returns the stable wire label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pick => "PICK",
            Self::NoBet => "NO_BET",
            Self::HardStop => "HARD_STOP",
        }
    }

    /// Returns the recommended action for this status.
    #[must_use]
    pub const fn recommended_action(self) -> RecommendedAction {
        match self {
            Self::Pick => RecommendedAction::PublishPick,
            Self::NoBet => RecommendedAction::SkipEvent,
            Self::HardStop => RecommendedAction::HaltAndEscalate,
        }
    }
}

impl fmt::Display for DecisionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Action the caller should take for a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendedAction {
    /// Publish the pick.
    PublishPick,
    /// Skip this event for the day.
    SkipEvent,
    /// Halt the run and escalate to an operator for reset.
    HaltAndEscalate,
}

// ============================================================================
// SECTION: Evaluation Result
// ============================================================================

/// Result of evaluating one prediction.
///
/// # Invariants
/// - `gate_outcomes` is empty when the decision was short-circuited by an active latch.
/// - `status == HardStop` whenever the latch was active at evaluation time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyEvaluationResult {
    /// Decision identifier.
    pub decision_id: DecisionId,
    /// Evaluated prediction identifier.
    pub prediction_id: PredictionId,
    /// Enclosing run identifier.
    pub run_id: RunId,
    /// Final decision status.
    pub status: DecisionStatus,
    /// Human-readable explanation derived from failing gates.
    pub rationale: String,
    /// Gate results in evaluation order.
    pub gate_outcomes: Vec<GateResult>,
    /// Recommended caller action.
    pub recommended_action: RecommendedAction,
    /// Trace identifier shared with audit entries.
    pub trace_id: TraceId,
    /// Evaluation timestamp.
    pub executed_at: Timestamp,
    /// Policy version label of the engine configuration.
    pub policy_version: String,
    /// Canonical fingerprint of the engine configuration.
    pub policy_hash: String,
}

impl PolicyEvaluationResult {
    /// Returns the names of failing gates in evaluation order.
    #[must_use]
    pub fn failing_gates(&self) -> Vec<&str> {
        self.gate_outcomes
            .iter()
            .filter(|outcome| !outcome.passed)
            .map(|outcome| outcome.gate_name.as_str())
            .collect()
    }
}
