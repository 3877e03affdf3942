// crates/pick-policy-core/src/core/mod.rs
// ============================================================================
// Module: Pick Policy Core Types
// Description: Canonical prediction, gate, decision, and hard-stop structures.
// Purpose: Provide stable, serializable types for policy evaluation and audit.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Core types define prediction inputs, gate configuration and results,
//! evaluation results, the hard-stop state, and audit entries. These types are
//! the canonical source of truth for any derived API surfaces (service
//! responses, CLI output, or persisted snapshots).

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod audit;
pub mod decision;
pub mod gates;
pub mod hard_stop;
pub mod hashing;
pub mod identifiers;
pub mod policy;
pub mod prediction;
pub mod time;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use audit::Actor;
pub use audit::ActorRole;
pub use audit::AuditAction;
pub use audit::AuditLogEntry;
pub use decision::DecisionStatus;
pub use decision::PolicyEvaluationResult;
pub use decision::RecommendedAction;
pub use gates::GateConfig;
pub use gates::GateKind;
pub use gates::GateResult;
pub use gates::GateSeverity;
pub use hard_stop::HardStopState;
pub use hard_stop::MAX_CAUSE_LENGTH;
pub use hard_stop::MAX_RESET_REASON_LENGTH;
pub use hard_stop::StateTransition;
pub use hard_stop::TransitionKind;
pub use hard_stop::bound_cause;
pub use hashing::DEFAULT_HASH_ALGORITHM;
pub use hashing::HashAlgorithm;
pub use hashing::HashDigest;
pub use hashing::HashError;
pub use identifiers::ActorId;
pub use identifiers::DecisionId;
pub use identifiers::PredictionId;
pub use identifiers::RunId;
pub use identifiers::TraceId;
pub use policy::PolicyConfig;
pub use policy::PolicyConfigError;
pub use prediction::PredictionInput;
pub use prediction::PredictionMetrics;
pub use prediction::RunContext;
pub use time::Timestamp;
