// crates/pick-policy-core/src/core/prediction.rs
// ============================================================================
// Module: Pick Policy Prediction Inputs
// Description: Prediction inputs, raw metrics, and the enclosing run context.
// Purpose: Carry everything gates need to evaluate one predicted event.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! A [`PredictionInput`] identifies one predicted event and carries the raw
//! metrics gates consume. Every metric is optional: an absent metric is
//! treated by each gate as the best possible value for that gate, never as a
//! failure. A [`RunContext`] identifies the batch the prediction belongs to.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::ActorId;
use crate::core::identifiers::PredictionId;
use crate::core::identifiers::RunId;
use crate::core::identifiers::TraceId;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Metrics
// ============================================================================

/// Raw metrics reported alongside a model prediction.
///
/// # Invariants
/// - `None` means "not reported", which gates treat as the best possible value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PredictionMetrics {
    /// Model confidence in `[0, 1]`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    /// Home win probability in `[0, 1]`; used to derive confidence when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub home_win_probability: Option<f64>,
    /// Feature drift score (higher is worse).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drift_score: Option<f64>,
    /// Expected calibration error (higher is worse).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calibration_error: Option<f64>,
    /// Input data-quality score in `[0, 1]` (lower is worse).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_quality_score: Option<f64>,
    /// Age of the freshest input data, in hours.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_age_hours: Option<f64>,
    /// Model version that produced the prediction.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_version: Option<String>,
    /// Explicit kill-switch flag raised upstream.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kill_switch: Option<bool>,
}

// ============================================================================
// SECTION: Prediction Input
// ============================================================================

/// One predicted event submitted for a policy decision.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PredictionInput {
    /// Prediction identifier; required by the engine.
    #[serde(default)]
    pub prediction_id: Option<PredictionId>,
    /// Upstream event identifier (for example a game id).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,
    /// Metrics evaluated by gates.
    #[serde(default)]
    pub metrics: PredictionMetrics,
}

impl PredictionInput {
    /// Creates a prediction input with the given identifier and metrics.
    #[must_use]
    pub fn new(prediction_id: impl Into<String>, metrics: PredictionMetrics) -> Self {
        Self {
            prediction_id: Some(PredictionId::new(prediction_id)),
            event_id: None,
            metrics,
        }
    }
}

// ============================================================================
// SECTION: Run Context
// ============================================================================

/// Enclosing batch context for an evaluation.
///
/// # Invariants
/// - Read-only to the engine.
/// - `trace_id`, when set, is propagated to the result and every audit entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunContext {
    /// Run identifier.
    pub run_id: RunId,
    /// Optional caller-supplied trace identifier.
    #[serde(default)]
    pub trace_id: Option<TraceId>,
    /// Actor that triggered the run (orchestrator or API user).
    pub actor: ActorId,
    /// Run start timestamp.
    pub started_at: Timestamp,
}

impl RunContext {
    /// Creates a run context without a trace identifier.
    #[must_use]
    pub fn new(run_id: impl Into<String>, actor: impl Into<String>, started_at: Timestamp) -> Self {
        Self {
            run_id: RunId::new(run_id),
            trace_id: None,
            actor: ActorId::new(actor),
            started_at,
        }
    }

    /// Returns a copy with the trace identifier set.
    #[must_use]
    pub fn with_trace_id(mut self, trace_id: TraceId) -> Self {
        self.trace_id = Some(trace_id);
        self
    }
}
