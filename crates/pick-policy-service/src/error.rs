// crates/pick-policy-service/src/error.rs
// ============================================================================
// Module: Service Errors
// Description: Error taxonomy surfaced by the policy service.
// Purpose: Map core, config, and store failures onto stable API codes.
// Dependencies: pick-policy-core, pick-policy-config, thiserror
// ============================================================================

//! ## Overview
//! [`ServiceError`] is what API callers see. Each variant carries a stable
//! machine code via [`ServiceError::code`], which is what
//! [`crate::format_error_response`] reports.

use pick_policy_config::ConfigError;
use pick_policy_core::LatchError;
use pick_policy_core::PolicyError;
use pick_policy_core::ResetError;
use pick_policy_store_sqlite::SqliteStoreError;
use thiserror::Error;

use crate::correlation::TraceIdRejection;

/// Policy service errors.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Evaluation rejected before any gate ran.
    #[error(transparent)]
    Policy(#[from] PolicyError),
    /// Reset rejected or failed.
    #[error(transparent)]
    Reset(#[from] ResetError),
    /// Latch could not be opened or read.
    #[error(transparent)]
    Latch(#[from] LatchError),
    /// Caller trace identifier was rejected.
    #[error("invalid trace id: {0}")]
    InvalidTraceId(TraceIdRejection),
    /// Configuration failed to load or validate.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// Durable store could not be opened.
    #[error("store error: {0}")]
    Store(#[from] SqliteStoreError),
    /// Event sink could not be opened.
    #[error("event sink error: {0}")]
    EventSink(String),
    /// A batch worker terminated without producing a result.
    #[error("evaluation worker failed: {0}")]
    Worker(String),
}

impl ServiceError {
    /// Returns the stable machine-readable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Policy(err) => err.code(),
            Self::Reset(err) => err.code(),
            Self::Latch(err) => err.code(),
            Self::InvalidTraceId(_) => "INVALID_INPUT",
            Self::Config(err) => err.code(),
            Self::Store(_) => "STORE_UNAVAILABLE",
            Self::EventSink(_) => "EVENT_SINK_UNAVAILABLE",
            Self::Worker(_) => "INTERNAL_ERROR",
        }
    }
}

impl From<TraceIdRejection> for ServiceError {
    fn from(rejection: TraceIdRejection) -> Self {
        Self::InvalidTraceId(rejection)
    }
}
