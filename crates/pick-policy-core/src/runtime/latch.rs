// crates/pick-policy-core/src/runtime/latch.rs
// ============================================================================
// Module: Pick Policy Hard-Stop Latch
// Description: Sticky, persisted hard-stop latch with an authorized reset path.
// Purpose: Serialize every latch transition behind one synchronization boundary.
// Dependencies: crate::{core, interfaces}, thiserror
// ============================================================================

//! ## Overview
//! [`HardStopLatch`] owns the single shared mutable resource of the policy
//! engine. Decision reads take the read side of an [`RwLock`]; triggers and
//! reset commits take the write side, so a reader never observes `active`
//! flipped without the matching cause and history entry.
//!
//! Persistence failures on trigger keep the latch engaged in memory (fail
//! closed) and are reported to the caller. Resets are serialized by a separate
//! mutex and write their audit entry before touching the state lock, so a slow
//! audit store delays only the resetting caller. The cleared snapshot is then
//! persisted and committed under a brief write lock.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::RwLock;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use thiserror::Error;

use crate::core::Actor;
use crate::core::ActorId;
use crate::core::ActorRole;
use crate::core::AuditAction;
use crate::core::AuditLogEntry;
use crate::core::GateKind;
use crate::core::HardStopState;
use crate::core::MAX_RESET_REASON_LENGTH;
use crate::core::RunId;
use crate::core::StateTransition;
use crate::core::Timestamp;
use crate::core::TraceId;
use crate::core::TransitionKind;
use crate::core::bound_cause;
use crate::interfaces::AuditError;
use crate::interfaces::AuditStore;
use crate::interfaces::Clock;
use crate::interfaces::HardStopStore;
use crate::interfaces::StoreError;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Latch access errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LatchError {
    /// The latch lock was poisoned by a panicking holder.
    #[error("hard-stop latch lock poisoned")]
    Poisoned,
    /// The hard-stop store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl LatchError {
    /// Returns a stable machine-readable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Poisoned => "LATCH_UNAVAILABLE",
            Self::Store(_) => "STATE_PERSIST_FAILURE",
        }
    }
}

/// Reset rejections and failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResetError {
    /// Caller role is missing or not permitted to reset.
    #[error("reset requires ops or admin role")]
    Unauthorized {
        /// Role supplied by the caller, if any.
        role: Option<ActorRole>,
    },
    /// Reason is missing or blank.
    #[error("reset requires a non-empty reason")]
    MissingReason,
    /// Reason exceeds the accepted length.
    #[error("reset reason exceeds {max_length} bytes")]
    ReasonTooLong {
        /// Maximum accepted reason length in bytes.
        max_length: usize,
    },
    /// The reset audit entry could not be written; the latch is unchanged.
    #[error("reset audit write failed: {0}")]
    AuditWrite(AuditError),
    /// The cleared state could not be persisted; the latch is unchanged.
    #[error("reset state persist failed: {0}")]
    Store(StoreError),
    /// The latch lock is poisoned.
    #[error("hard-stop latch lock poisoned")]
    LatchPoisoned,
}

impl ResetError {
    /// Returns a stable machine-readable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Unauthorized {
                ..
            } => "UNAUTHORIZED_RESET",
            Self::MissingReason => "MISSING_REASON",
            Self::ReasonTooLong {
                ..
            } => "REASON_TOO_LONG",
            Self::AuditWrite(_) => "AUDIT_WRITE_FAILURE",
            Self::Store(_) => "STATE_PERSIST_FAILURE",
            Self::LatchPoisoned => "LATCH_UNAVAILABLE",
        }
    }
}

// ============================================================================
// SECTION: Requests and Outcomes
// ============================================================================

/// Latch state as observed for one decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LatchView {
    /// The latch is clear; gates must run.
    Inactive,
    /// The latch is engaged.
    Active {
        /// Recorded cause.
        cause: Option<String>,
        /// Trigger timestamp.
        triggered_at: Option<Timestamp>,
        /// Triggering gate.
        gate: Option<GateKind>,
    },
    /// The latch cannot be read; callers fail closed.
    Unavailable,
}

/// Request to engage the latch after a critical failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerRequest {
    /// First failing critical gate.
    pub gate: GateKind,
    /// Cause recorded on the state.
    pub cause: String,
    /// Actor of the enclosing run.
    pub actor: ActorId,
    /// Enclosing run identifier.
    pub run_id: RunId,
    /// Trace identifier of the evaluation.
    pub trace_id: TraceId,
}

/// Result of a trigger attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerOutcome {
    /// True when this call performed the `INACTIVE -> ACTIVE` transition.
    pub transitioned: bool,
    /// Audit entry for the transition, when one occurred.
    pub audit_entry: Option<AuditLogEntry>,
    /// Snapshot persist failure; the latch stays engaged in memory.
    pub persist_error: Option<StoreError>,
}

/// Authorized reset request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResetRequest {
    /// Caller identity and role.
    pub actor: Actor,
    /// Operator-supplied reason.
    pub reason: Option<String>,
    /// Trace identifier correlating the reset.
    pub trace_id: TraceId,
}

/// Result of an accepted reset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResetOutcome {
    /// False when the latch was already inactive.
    pub reset_performed: bool,
    /// State before the reset, carrying only its latest transition.
    pub previous_state: HardStopState,
    /// State after the reset.
    pub current_state: HardStopState,
    /// Audit entry written (or attempted, for no-ops).
    pub audit_entry: AuditLogEntry,
    /// Audit failure for a no-op reset; always `None` for performed resets.
    pub audit_error: Option<AuditError>,
}

// ============================================================================
// SECTION: Latch
// ============================================================================

/// Process-wide hard-stop latch.
///
/// # Invariants
/// - Transitions are persisted before they become visible through the state
///   lock.
/// - At most one reset is in flight; an active latch only changes through it.
/// - History never shrinks or reorders.
pub struct HardStopLatch {
    /// Guarded latch state.
    state: RwLock<HardStopState>,
    /// Serializes resets without blocking decision reads.
    reset_lock: Mutex<()>,
    /// Evaluations reporting `HARD_STOP` since the latch engaged.
    affected: AtomicU64,
    /// Durable snapshot store.
    store: Arc<dyn HardStopStore>,
    /// Transition time source.
    clock: Arc<dyn Clock>,
}

impl HardStopLatch {
    /// Restores the latch from the store, starting inactive when nothing is persisted.
    ///
    /// # Errors
    ///
    /// Returns [`LatchError::Store`] when the persisted snapshot cannot be
    /// loaded or fails integrity checks.
    pub fn open(store: Arc<dyn HardStopStore>, clock: Arc<dyn Clock>) -> Result<Self, LatchError> {
        let state = store.load()?.unwrap_or_else(HardStopState::inactive);
        Ok(Self {
            affected: AtomicU64::new(state.affected_count),
            state: RwLock::new(state),
            reset_lock: Mutex::new(()),
            store,
            clock,
        })
    }

    /// Observes the latch for one decision.
    ///
    /// An active latch counts the observing evaluation as affected.
    #[must_use]
    pub fn observe(&self) -> LatchView {
        let Ok(guard) = self.state.read() else {
            return LatchView::Unavailable;
        };
        if !guard.active {
            return LatchView::Inactive;
        }
        self.affected.fetch_add(1, Ordering::Relaxed);
        LatchView::Active {
            cause: guard.cause.clone(),
            triggered_at: guard.triggered_at,
            gate: guard.triggered_by_gate,
        }
    }

    /// Returns true when the latch is engaged or cannot be read.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.state.read().map_or(true, |guard| guard.active)
    }

    /// Returns a snapshot of the current state.
    ///
    /// # Errors
    ///
    /// Returns [`LatchError::Poisoned`] when the lock is poisoned.
    pub fn snapshot(&self) -> Result<HardStopState, LatchError> {
        let guard = self.state.read().map_err(|_| LatchError::Poisoned)?;
        Ok(self.with_affected(&guard))
    }

    /// Engages the latch. Idempotent when already engaged.
    ///
    /// # Errors
    ///
    /// Returns [`LatchError::Poisoned`] when the lock is poisoned.
    pub fn trigger(&self, request: TriggerRequest) -> Result<TriggerOutcome, LatchError> {
        let mut guard = self.state.write().map_err(|_| LatchError::Poisoned)?;
        if guard.active {
            self.affected.fetch_add(1, Ordering::Relaxed);
            return Ok(TriggerOutcome {
                transitioned: false,
                audit_entry: None,
                persist_error: None,
            });
        }
        let previous = guard.summary();
        let at = self.clock.now();
        let cause = bound_cause(&request.cause);
        let transition = StateTransition {
            sequence: guard.next_sequence(),
            kind: TransitionKind::Triggered,
            at,
            actor: request.actor.clone(),
            detail: cause.clone(),
            gate: Some(request.gate),
            trace_id: request.trace_id.clone(),
        };
        guard.active = true;
        guard.triggered_at = Some(at);
        guard.cause = Some(cause.clone());
        guard.triggered_by_gate = Some(request.gate);
        guard.trigger_trace_id = Some(request.trace_id.clone());
        guard.affected_count = 1;
        guard.history.push(transition);
        self.affected.store(1, Ordering::Relaxed);
        let persist_error = self.store.save(&guard).err();
        drop(guard);

        Ok(TriggerOutcome {
            transitioned: true,
            audit_entry: Some(AuditLogEntry {
                actor_id: request.actor,
                action: AuditAction::HardStopTriggered,
                reason: cause,
                trace_id: request.trace_id,
                timestamp: at,
                previous_state_snapshot: previous,
                run_id: Some(request.run_id),
                gate: Some(request.gate),
            }),
            persist_error,
        })
    }

    /// Clears the latch for an authorized caller.
    ///
    /// The audit entry is appended before the cleared state is persisted; the
    /// latch only changes in memory once both succeed. Decision reads proceed
    /// while the audit append runs. A reset of an inactive latch is a reported
    /// no-op whose audit failure is non-fatal.
    ///
    /// # Errors
    ///
    /// Returns [`ResetError`] when the caller is unauthorized, the reason is
    /// blank or too long, the audit write fails, or the cleared state cannot
    /// be persisted.
    pub fn reset(
        &self,
        request: ResetRequest,
        audit: &dyn AuditStore,
    ) -> Result<ResetOutcome, ResetError> {
        let role = request.actor.role;
        if !role.is_some_and(ActorRole::may_reset) {
            return Err(ResetError::Unauthorized {
                role,
            });
        }
        let reason = request
            .reason
            .as_deref()
            .map(str::trim)
            .filter(|reason| !reason.is_empty())
            .ok_or(ResetError::MissingReason)?;
        if reason.len() > MAX_RESET_REASON_LENGTH {
            return Err(ResetError::ReasonTooLong {
                max_length: MAX_RESET_REASON_LENGTH,
            });
        }
        let reason = reason.to_string();

        let reset_guard = self.reset_lock.lock().map_err(|_| ResetError::LatchPoisoned)?;
        let previous = self.snapshot().map_err(|_| ResetError::LatchPoisoned)?;
        let at = self.clock.now();
        let summary = previous.summary();

        if !previous.active {
            let entry = AuditLogEntry {
                actor_id: request.actor.user_id,
                action: AuditAction::HardStopResetNoop,
                reason,
                trace_id: request.trace_id,
                timestamp: at,
                previous_state_snapshot: summary.clone(),
                run_id: None,
                gate: None,
            };
            let audit_error = audit.append(&entry).err();
            drop(reset_guard);
            return Ok(ResetOutcome {
                reset_performed: false,
                previous_state: summary,
                current_state: previous,
                audit_entry: entry,
                audit_error,
            });
        }

        let sequence = previous.next_sequence();
        let mut cleared = HardStopState::inactive();
        cleared.history = previous.history;
        cleared.history.push(StateTransition {
            sequence,
            kind: TransitionKind::Reset,
            at,
            actor: request.actor.user_id.clone(),
            detail: reason.clone(),
            gate: None,
            trace_id: request.trace_id.clone(),
        });
        let entry = AuditLogEntry {
            actor_id: request.actor.user_id,
            action: AuditAction::HardStopReset,
            reason,
            trace_id: request.trace_id,
            timestamp: at,
            previous_state_snapshot: summary.clone(),
            run_id: None,
            gate: summary.triggered_by_gate,
        };
        audit.append(&entry).map_err(ResetError::AuditWrite)?;

        let mut guard = self.state.write().map_err(|_| ResetError::LatchPoisoned)?;
        self.store.save(&cleared).map_err(ResetError::Store)?;
        *guard = cleared.clone();
        self.affected.store(0, Ordering::Relaxed);
        drop(guard);
        drop(reset_guard);

        Ok(ResetOutcome {
            reset_performed: true,
            previous_state: summary,
            current_state: cleared,
            audit_entry: entry,
            audit_error: None,
        })
    }

    /// Clones the state with the live affected counter applied.
    fn with_affected(&self, state: &HardStopState) -> HardStopState {
        let mut snapshot = state.clone();
        if snapshot.active {
            snapshot.affected_count = self.affected.load(Ordering::Relaxed);
        }
        snapshot
    }
}
