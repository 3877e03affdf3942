// crates/pick-policy-core/src/runtime/ids.rs
// ============================================================================
// Module: Pick Policy Identifier Issuance
// Description: Boot-scoped generator for decision and trace identifiers.
// Purpose: Issue process-unique identifiers without coordination.
// Dependencies: rand
// ============================================================================

//! ## Overview
//! Identifiers combine a random boot id drawn from the OS RNG with a
//! monotonic counter, so they are unique within a process and unlikely to
//! collide across restarts.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use rand::RngCore;
use rand::rngs::OsRng;

use crate::core::DecisionId;
use crate::core::TraceId;

// ============================================================================
// SECTION: Generator
// ============================================================================

/// Prefix for issued decision identifiers.
const DECISION_PREFIX: &str = "dec";
/// Prefix for issued trace identifiers.
const TRACE_PREFIX: &str = "trace";

/// Boot-scoped identifier generator.
///
/// # Invariants
/// - Issued identifiers are unique within the process lifetime.
#[derive(Debug)]
pub struct IdGenerator {
    /// Boot-scoped random identifier for entropy.
    boot_id: u64,
    /// Monotonic counter shared by all identifier kinds.
    counter: AtomicU64,
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl IdGenerator {
    /// Creates a generator seeded from the OS RNG.
    #[must_use]
    pub fn new() -> Self {
        let mut bytes = [0u8; 8];
        OsRng.fill_bytes(&mut bytes);
        Self::with_boot_id(u64::from_be_bytes(bytes))
    }

    /// Creates a generator with a fixed boot id (deterministic tests).
    #[must_use]
    pub const fn with_boot_id(boot_id: u64) -> Self {
        Self {
            boot_id,
            counter: AtomicU64::new(1),
        }
    }

    /// Issues a new decision identifier.
    #[must_use]
    pub fn next_decision_id(&self) -> DecisionId {
        DecisionId::new(self.issue(DECISION_PREFIX))
    }

    /// Issues a new trace identifier.
    #[must_use]
    pub fn next_trace_id(&self) -> TraceId {
        TraceId::new(self.issue(TRACE_PREFIX))
    }

    /// Formats the next identifier with the given prefix.
    fn issue(&self, prefix: &str) -> String {
        let seq = self.counter.fetch_add(1, Ordering::Relaxed);
        format!("{}-{:016x}-{:016x}", prefix, self.boot_id, seq)
    }
}
