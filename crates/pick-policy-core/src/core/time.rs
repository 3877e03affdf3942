// crates/pick-policy-core/src/core/time.rs
// ============================================================================
// Module: Pick Policy Time Model
// Description: Canonical timestamp representations for decisions and audit logs.
// Purpose: Provide deterministic, replayable time values across policy records.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Pick Policy stamps decisions, hard-stop transitions, and audit entries with
//! explicit time values. The core never reads wall-clock time directly; hosts
//! inject a [`crate::Clock`] and the engine asks it for timestamps.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Time Values
// ============================================================================

/// Canonical timestamp used in decisions, transitions, and audit entries.
///
/// # Invariants
/// - Values are produced by an injected clock; the core never reads wall-clock time.
/// - No validation is performed; monotonicity is a clock responsibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Timestamp {
    /// Unix epoch milliseconds.
    UnixMillis(i64),
    /// Monotonic logical time value.
    Logical(u64),
}

impl Timestamp {
    /// Returns the timestamp as unix milliseconds when available.
    #[must_use]
    pub const fn as_unix_millis(&self) -> Option<i64> {
        match self {
            Self::UnixMillis(value) => Some(*value),
            Self::Logical(_) => None,
        }
    }

    /// Returns the timestamp as logical time when available.
    #[must_use]
    pub const fn as_logical(&self) -> Option<u64> {
        match self {
            Self::UnixMillis(_) => None,
            Self::Logical(value) => Some(*value),
        }
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnixMillis(value) => write!(f, "unix_ms:{value}"),
            Self::Logical(value) => write!(f, "logical:{value}"),
        }
    }
}
