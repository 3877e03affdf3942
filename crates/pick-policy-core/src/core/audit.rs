// crates/pick-policy-core/src/core/audit.rs
// ============================================================================
// Module: Pick Policy Audit Records
// Description: Actors, roles, and append-only audit log entries.
// Purpose: Describe who changed the hard-stop latch, why, and from which state.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Audit entries are write-only from the engine's perspective and owned by the
//! [`crate::AuditStore`]. Each entry carries a snapshot of the hard-stop state
//! as it was before the audited action.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use crate::core::gates::GateKind;
use crate::core::hard_stop::HardStopState;
use crate::core::identifiers::ActorId;
use crate::core::identifiers::RunId;
use crate::core::identifiers::TraceId;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Actors
// ============================================================================

/// Resolved caller role supplied by the authentication boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorRole {
    /// Regular dashboard user.
    User,
    /// Operations staff.
    Ops,
    /// Administrator.
    Admin,
}

impl ActorRole {
    /// Returns true when this role may reset the hard-stop latch.
    #[must_use]
    pub const fn may_reset(self) -> bool {
        matches!(self, Self::Ops | Self::Admin)
    }

    /// Returns the stable role label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Ops => "ops",
            Self::Admin => "admin",
        }
    }
}

impl fmt::Display for ActorRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolved caller identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    /// Caller identifier.
    pub user_id: ActorId,
    /// Caller role; `None` when the boundary supplied no role.
    #[serde(default)]
    pub role: Option<ActorRole>,
}

impl Actor {
    /// Creates an actor with a resolved role.
    #[must_use]
    pub fn new(user_id: impl Into<String>, role: ActorRole) -> Self {
        Self {
            user_id: ActorId::new(user_id),
            role: Some(role),
        }
    }
}

// ============================================================================
// SECTION: Audit Entries
// ============================================================================

/// Audited action kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    /// The latch engaged after a critical gate failure.
    HardStopTriggered,
    /// An authorized reset cleared the latch.
    HardStopReset,
    /// An authorized reset found the latch already inactive.
    HardStopResetNoop,
}

impl AuditAction {
    /// Returns the stable action label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::HardStopTriggered => "hard_stop_triggered",
            Self::HardStopReset => "hard_stop_reset",
            Self::HardStopResetNoop => "hard_stop_reset_noop",
        }
    }
}

/// Append-only audit record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditLogEntry {
    /// Actor responsible for the action.
    pub actor_id: ActorId,
    /// Audited action.
    pub action: AuditAction,
    /// Trigger cause or reset reason.
    pub reason: String,
    /// Trace identifier correlating the action with evaluations.
    pub trace_id: TraceId,
    /// Action timestamp.
    pub timestamp: Timestamp,
    /// Hard-stop state before the action.
    pub previous_state_snapshot: HardStopState,
    /// Run identifier for triggers raised during a run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_id: Option<RunId>,
    /// Triggering gate for trigger entries.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gate: Option<GateKind>,
}
