// crates/pick-policy-core/src/core/hard_stop.rs
// ============================================================================
// Module: Pick Policy Hard-Stop State
// Description: Hard-stop latch state and its append-only transition history.
// Purpose: Provide the serializable snapshot persisted for every latch transition.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! [`HardStopState`] is the value guarded by [`crate::HardStopLatch`]. It is
//! created inactive, flipped active by a critical gate failure, and cleared
//! only by an authorized reset. Every flip appends one [`StateTransition`];
//! history never shrinks or reorders.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::gates::GateKind;
use crate::core::identifiers::ActorId;
use crate::core::identifiers::TraceId;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Maximum length in bytes of an operator-supplied reset reason.
pub const MAX_RESET_REASON_LENGTH: usize = 1024;
/// Maximum length in bytes of a recorded trigger cause.
pub const MAX_CAUSE_LENGTH: usize = 1024;
/// Marker appended to a cause shortened to [`MAX_CAUSE_LENGTH`].
const TRUNCATION_MARKER: &str = "...";

/// Shortens a cause to at most [`MAX_CAUSE_LENGTH`] bytes on a char boundary.
#[must_use]
pub fn bound_cause(cause: &str) -> String {
    if cause.len() <= MAX_CAUSE_LENGTH {
        return cause.to_string();
    }
    let mut end = MAX_CAUSE_LENGTH - TRUNCATION_MARKER.len();
    while !cause.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}{TRUNCATION_MARKER}", &cause[..end])
}

// ============================================================================
// SECTION: Transitions
// ============================================================================

/// Kind of hard-stop transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionKind {
    /// `INACTIVE -> ACTIVE` after a critical gate failure.
    Triggered,
    /// `ACTIVE -> INACTIVE` after an authorized reset.
    Reset,
}

/// One entry in the hard-stop history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateTransition {
    /// Position in history, starting at 1.
    pub sequence: u64,
    /// Transition kind.
    pub kind: TransitionKind,
    /// Transition timestamp.
    pub at: Timestamp,
    /// Actor that caused the transition.
    pub actor: ActorId,
    /// Trigger cause or reset reason.
    pub detail: String,
    /// Gate that triggered the transition, when applicable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gate: Option<GateKind>,
    /// Trace identifier of the triggering evaluation or reset.
    pub trace_id: TraceId,
}

// ============================================================================
// SECTION: State
// ============================================================================

/// Process-wide hard-stop latch state.
///
/// # Invariants
/// - `active == false` implies `triggered_at`, `cause`, `triggered_by_gate`
///   and `trigger_trace_id` are `None`.
/// - `history` is append-only and ordered by `sequence`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HardStopState {
    /// Whether the latch is engaged.
    pub active: bool,
    /// Timestamp of the transition that engaged the latch.
    #[serde(default)]
    pub triggered_at: Option<Timestamp>,
    /// Cause recorded when the latch engaged.
    #[serde(default)]
    pub cause: Option<String>,
    /// Gate whose failure engaged the latch.
    #[serde(default)]
    pub triggered_by_gate: Option<GateKind>,
    /// Trace identifier of the evaluation that engaged the latch.
    #[serde(default)]
    pub trigger_trace_id: Option<TraceId>,
    /// Evaluations that reported `HARD_STOP` since the latch engaged.
    #[serde(default)]
    pub affected_count: u64,
    /// Append-only transition history.
    #[serde(default)]
    pub history: Vec<StateTransition>,
}

impl Default for HardStopState {
    fn default() -> Self {
        Self::inactive()
    }
}

impl HardStopState {
    /// Returns the initial inactive state with empty history.
    #[must_use]
    pub const fn inactive() -> Self {
        Self {
            active: false,
            triggered_at: None,
            cause: None,
            triggered_by_gate: None,
            trigger_trace_id: None,
            affected_count: 0,
            history: Vec::new(),
        }
    }

    /// Returns the sequence number the next transition receives.
    #[must_use]
    pub fn next_sequence(&self) -> u64 {
        self.history.last().map_or(1, |entry| entry.sequence.saturating_add(1))
    }

    /// Returns the number of recorded transitions of the given kind.
    #[must_use]
    pub fn transitions_of(&self, kind: TransitionKind) -> usize {
        self.history.iter().filter(|entry| entry.kind == kind).count()
    }

    /// Returns the latch fields with only the most recent transition.
    ///
    /// Audit entries embed this form so their size does not track history.
    #[must_use]
    pub fn summary(&self) -> Self {
        Self {
            active: self.active,
            triggered_at: self.triggered_at,
            cause: self.cause.clone(),
            triggered_by_gate: self.triggered_by_gate,
            trigger_trace_id: self.trigger_trace_id.clone(),
            affected_count: self.affected_count,
            history: self.history.last().cloned().into_iter().collect(),
        }
    }
}
