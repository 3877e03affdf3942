// crates/pick-policy-service/src/response.rs
// ============================================================================
// Module: API Response Shaping
// Description: JSON envelopes and camelCase views for service outputs.
// Purpose: Keep wire field names stable regardless of core type layout.
// Dependencies: pick-policy-core, serde, time
// ============================================================================

//! ## Overview
//! Core types serialize with `snake_case` fields for storage and hashing. API
//! callers instead receive camelCase views wrapped in a common envelope:
//!
//! ```json
//! { "success": true, "data": { ... }, "meta": { "traceId": "...", "timestamp": "..." } }
//! { "success": false, "error": { "code": "...", "message": "..." }, "meta": { ... } }
//! ```
//!
//! Unix-millisecond timestamps render as RFC 3339; logical timestamps render
//! with their `logical:` prefix.

// ============================================================================
// SECTION: Imports
// ============================================================================

use pick_policy_core::DecisionStatus;
use pick_policy_core::GateConfig;
use pick_policy_core::GateKind;
use pick_policy_core::GateResult;
use pick_policy_core::GateSeverity;
use pick_policy_core::HardStopState;
use pick_policy_core::PolicyEvaluationResult;
use pick_policy_core::RecommendedAction;
use pick_policy_core::ResetOutcome;
use pick_policy_core::StateTransition;
use pick_policy_core::Timestamp;
use pick_policy_core::TraceId;
use pick_policy_core::TransitionKind;
use serde::Serialize;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::error::ServiceError;

// ============================================================================
// SECTION: Envelope
// ============================================================================

/// Common response envelope.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiEnvelope<T> {
    /// True for successful responses.
    pub success: bool,
    /// Response payload on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    /// Error payload on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiError>,
    /// Correlation metadata.
    pub meta: ApiMeta,
}

impl<T> ApiEnvelope<T> {
    /// Wraps a successful payload.
    #[must_use]
    pub fn ok(data: T, trace_id: Option<&TraceId>, at: Timestamp) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            meta: ApiMeta::new(trace_id, at),
        }
    }
}

/// Error payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApiError {
    /// Stable machine code.
    pub code: &'static str,
    /// Human-readable message.
    pub message: String,
}

/// Envelope metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiMeta {
    /// Trace identifier, when one was assigned.
    pub trace_id: Option<String>,
    /// Response timestamp.
    pub timestamp: String,
}

impl ApiMeta {
    /// Builds metadata for a response.
    #[must_use]
    pub fn new(trace_id: Option<&TraceId>, at: Timestamp) -> Self {
        Self {
            trace_id: trace_id.map(|trace| trace.as_str().to_string()),
            timestamp: render_timestamp(at),
        }
    }
}

/// Wraps an evaluation result in a success envelope.
#[must_use]
pub fn format_api_response(
    result: &PolicyEvaluationResult,
    at: Timestamp,
) -> ApiEnvelope<EvaluationView> {
    ApiEnvelope::ok(EvaluationView::from(result), Some(&result.trace_id), at)
}

/// Wraps a service error in a failure envelope.
#[must_use]
pub fn format_error_response(
    error: &ServiceError,
    trace_id: Option<&TraceId>,
    at: Timestamp,
) -> ApiEnvelope<()> {
    ApiEnvelope {
        success: false,
        data: None,
        error: Some(ApiError {
            code: error.code(),
            message: error.to_string(),
        }),
        meta: ApiMeta::new(trace_id, at),
    }
}

/// Renders a timestamp for API output.
#[must_use]
pub fn render_timestamp(at: Timestamp) -> String {
    match at {
        Timestamp::UnixMillis(millis) => {
            OffsetDateTime::from_unix_timestamp_nanos(i128::from(millis) * 1_000_000)
                .ok()
                .and_then(|value| value.format(&Rfc3339).ok())
                .unwrap_or_else(|| at.to_string())
        }
        Timestamp::Logical(_) => at.to_string(),
    }
}

// ============================================================================
// SECTION: Evaluation Views
// ============================================================================

/// API view of an evaluation result.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationView {
    /// Decision identifier.
    pub decision_id: String,
    /// Prediction identifier.
    pub prediction_id: String,
    /// Run identifier.
    pub run_id: String,
    /// Decision status.
    pub status: DecisionStatus,
    /// Human-readable rationale.
    pub rationale: String,
    /// Per-gate outcomes.
    pub gate_outcomes: Vec<GateOutcomeView>,
    /// Recommended caller action.
    pub recommended_action: RecommendedAction,
    /// Trace identifier.
    pub trace_id: String,
    /// Evaluation timestamp.
    pub executed_at: String,
    /// Policy version label.
    pub policy_version: String,
    /// Policy configuration fingerprint.
    pub policy_hash: String,
}

impl From<&PolicyEvaluationResult> for EvaluationView {
    fn from(result: &PolicyEvaluationResult) -> Self {
        Self {
            decision_id: result.decision_id.as_str().to_string(),
            prediction_id: result.prediction_id.as_str().to_string(),
            run_id: result.run_id.as_str().to_string(),
            status: result.status,
            rationale: result.rationale.clone(),
            gate_outcomes: result.gate_outcomes.iter().map(GateOutcomeView::from).collect(),
            recommended_action: result.recommended_action,
            trace_id: result.trace_id.as_str().to_string(),
            executed_at: render_timestamp(result.executed_at),
            policy_version: result.policy_version.clone(),
            policy_hash: result.policy_hash.clone(),
        }
    }
}

/// API view of one gate outcome.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GateOutcomeView {
    /// Gate name.
    pub gate_name: String,
    /// Whether the gate passed.
    pub passed: bool,
    /// Observed score.
    pub score: f64,
    /// Configured threshold.
    pub threshold: f64,
    /// Gate severity.
    pub severity: GateSeverity,
    /// Gate message.
    pub message: String,
    /// True when the gate faulted on malformed input.
    pub faulted: bool,
}

impl From<&GateResult> for GateOutcomeView {
    fn from(result: &GateResult) -> Self {
        Self {
            gate_name: result.gate_name.clone(),
            passed: result.passed,
            score: result.score,
            threshold: result.threshold,
            severity: result.severity,
            message: result.message.clone(),
            faulted: result.faulted,
        }
    }
}

// ============================================================================
// SECTION: Status Views
// ============================================================================

/// API view of the hard-stop state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusView {
    /// Whether the latch is engaged.
    pub active: bool,
    /// Recorded cause.
    pub cause: Option<String>,
    /// Time the latch engaged.
    pub triggered_at: Option<String>,
    /// Gate whose failure engaged the latch.
    pub triggered_by_gate: Option<GateKind>,
    /// Evaluations reporting `HARD_STOP` since the latch engaged.
    pub affected_count: u64,
    /// Transition history.
    pub history: Vec<TransitionView>,
}

impl From<&HardStopState> for StatusView {
    fn from(state: &HardStopState) -> Self {
        Self {
            active: state.active,
            cause: state.cause.clone(),
            triggered_at: state.triggered_at.map(render_timestamp),
            triggered_by_gate: state.triggered_by_gate,
            affected_count: state.affected_count,
            history: state.history.iter().map(TransitionView::from).collect(),
        }
    }
}

/// API view of a history entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionView {
    /// Position in history.
    pub sequence: u64,
    /// Transition kind.
    pub kind: TransitionKind,
    /// Transition time.
    pub at: String,
    /// Actor identifier.
    pub actor: String,
    /// Cause or reset reason.
    pub detail: String,
    /// Triggering gate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gate: Option<GateKind>,
    /// Trace identifier.
    pub trace_id: String,
}

impl From<&StateTransition> for TransitionView {
    fn from(entry: &StateTransition) -> Self {
        Self {
            sequence: entry.sequence,
            kind: entry.kind,
            at: render_timestamp(entry.at),
            actor: entry.actor.as_str().to_string(),
            detail: entry.detail.clone(),
            gate: entry.gate,
            trace_id: entry.trace_id.as_str().to_string(),
        }
    }
}

/// API view of an accepted reset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetView {
    /// False when the latch was already inactive.
    pub reset_performed: bool,
    /// State before the reset.
    pub previous_state: StatusView,
    /// True when the audit entry was durably written.
    pub audit_recorded: bool,
}

impl From<&ResetOutcome> for ResetView {
    fn from(outcome: &ResetOutcome) -> Self {
        Self {
            reset_performed: outcome.reset_performed,
            previous_state: StatusView::from(&outcome.previous_state),
            audit_recorded: outcome.audit_error.is_none(),
        }
    }
}

// ============================================================================
// SECTION: Config View
// ============================================================================

/// API view of the active policy configuration.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigView {
    /// Policy version label.
    pub policy_version: String,
    /// Gates in evaluation order.
    pub gates: Vec<GateConfig>,
    /// Canonical configuration fingerprint.
    pub policy_hash: String,
    /// Fingerprint hash algorithm label.
    pub hash_algorithm: &'static str,
}
