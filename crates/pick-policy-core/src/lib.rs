// crates/pick-policy-core/src/lib.rs
// ============================================================================
// Module: Pick Policy Core Library
// Description: Public API surface for the Pick Policy decision core.
// Purpose: Expose core types, interfaces, and runtime helpers.
// Dependencies: crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! Pick Policy core turns a single model prediction into one of three
//! outcomes (PICK, NO_BET, HARD_STOP) by running it through an ordered set of
//! quality and risk gates. It also owns the hard-stop latch: a sticky,
//! persisted safety state that overrides every evaluation until an authorized
//! operator clears it. The core is backend-agnostic and integrates with
//! persistence and audit storage through explicit interfaces.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use core::*;

pub use interfaces::AuditError;
pub use interfaces::AuditStore;
pub use interfaces::Clock;
pub use interfaces::HardStopStore;
pub use interfaces::StoreError;
pub use runtime::ALL_GATES_PASSED;
pub use runtime::EvaluationOutcome;
pub use runtime::Gate;
pub use runtime::GateFault;
pub use runtime::HardStopLatch;
pub use runtime::IdGenerator;
pub use runtime::InMemoryAuditStore;
pub use runtime::InMemoryHardStopStore;
pub use runtime::LatchError;
pub use runtime::LatchView;
pub use runtime::LogicalClock;
pub use runtime::PolicyEngine;
pub use runtime::PolicyError;
pub use runtime::ResetError;
pub use runtime::ResetOutcome;
pub use runtime::ResetRequest;
pub use runtime::TriggerOutcome;
pub use runtime::TriggerRequest;
pub use runtime::aggregate_status;
pub use runtime::build_rationale;
