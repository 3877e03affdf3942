// crates/pick-policy-core/src/interfaces/mod.rs
// ============================================================================
// Module: Pick Policy Interfaces
// Description: Backend-agnostic interfaces for time, hard-stop persistence, and audit.
// Purpose: Define the contract surfaces used by the Pick Policy runtime.
// Dependencies: crate::core
// ============================================================================

//! ## Overview
//! Interfaces define how Pick Policy integrates with external systems without
//! embedding backend-specific details. Implementations must fail closed on
//! missing or invalid data: a store that cannot prove its snapshot is intact
//! returns an error rather than an inactive latch.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

use crate::core::audit::AuditLogEntry;
use crate::core::hard_stop::HardStopState;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Clock
// ============================================================================

/// Time source injected into the engine and the hard-stop latch.
pub trait Clock: Send + Sync {
    /// Returns the current timestamp.
    fn now(&self) -> Timestamp;
}

// ============================================================================
// SECTION: Hard-Stop Store
// ============================================================================

/// Hard-stop store errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Store I/O error.
    #[error("hard-stop store io error: {0}")]
    Io(String),
    /// Store data is corrupted or fails integrity checks.
    #[error("hard-stop store corruption: {0}")]
    Corrupt(String),
    /// Store data version is incompatible.
    #[error("hard-stop store version mismatch: {0}")]
    VersionMismatch(String),
    /// Store data is invalid.
    #[error("hard-stop store invalid data: {0}")]
    Invalid(String),
    /// Store reported an error.
    #[error("hard-stop store error: {0}")]
    Store(String),
}

impl StoreError {
    /// Returns a stable machine-readable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Io(_) => "STORE_IO",
            Self::Corrupt(_) => "STORE_CORRUPT",
            Self::VersionMismatch(_) => "STORE_VERSION_MISMATCH",
            Self::Invalid(_) => "STORE_INVALID",
            Self::Store(_) => "STORE_ERROR",
        }
    }
}

/// Durable storage for the hard-stop state.
pub trait HardStopStore: Send + Sync {
    /// Loads the latest persisted hard-stop state.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when loading fails or the snapshot is corrupt.
    fn load(&self) -> Result<Option<HardStopState>, StoreError>;

    /// Persists a full hard-stop state snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when saving fails.
    fn save(&self, state: &HardStopState) -> Result<(), StoreError>;
}

// ============================================================================
// SECTION: Audit Store
// ============================================================================

/// Audit store errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuditError {
    /// The audit store is temporarily unavailable; the write may be retried.
    #[error("audit store unavailable: {0}")]
    Unavailable(String),
    /// The audit store rejected the entry; retrying will not help.
    #[error("audit store rejected entry: {0}")]
    Rejected(String),
}

impl AuditError {
    /// Returns true when a retry may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

/// Append-only audit store.
pub trait AuditStore: Send + Sync {
    /// Appends an audit entry.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError`] when the entry is not durably recorded.
    fn append(&self, entry: &AuditLogEntry) -> Result<(), AuditError>;
}
