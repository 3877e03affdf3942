// crates/pick-policy-core/src/runtime/mod.rs
// ============================================================================
// Module: Pick Policy Runtime
// Description: Gate evaluation, policy engine, hard-stop latch, and helpers.
// Purpose: Execute policy decisions against injected stores and clocks.
// Dependencies: crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! Runtime modules implement gate evaluation, decision aggregation, the
//! hard-stop latch, identifier issuance, and in-memory stores. All external
//! surfaces must call into the same engine to preserve decision invariants.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod clock;
pub mod engine;
pub mod gate;
pub mod ids;
pub mod latch;
pub mod store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use clock::LogicalClock;
pub use engine::ALL_GATES_PASSED;
pub use engine::EvaluationOutcome;
pub use engine::PolicyEngine;
pub use engine::PolicyError;
pub use engine::aggregate_status;
pub use engine::build_rationale;
pub use gate::Gate;
pub use gate::GateFault;
pub use ids::IdGenerator;
pub use latch::HardStopLatch;
pub use latch::LatchError;
pub use latch::LatchView;
pub use latch::ResetError;
pub use latch::ResetOutcome;
pub use latch::ResetRequest;
pub use latch::TriggerOutcome;
pub use latch::TriggerRequest;
pub use store::InMemoryAuditStore;
pub use store::InMemoryHardStopStore;
