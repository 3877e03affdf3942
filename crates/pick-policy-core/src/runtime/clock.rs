// crates/pick-policy-core/src/runtime/clock.rs
// ============================================================================
// Module: Pick Policy Logical Clock
// Description: Deterministic monotonic clock for tests and replay.
// Purpose: Provide a Clock implementation that never reads wall-clock time.
// Dependencies: crate::interfaces
// ============================================================================

//! ## Overview
//! [`LogicalClock`] issues strictly increasing logical timestamps. Hosts that
//! need wall-clock time inject their own [`Clock`].

use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use crate::core::Timestamp;
use crate::interfaces::Clock;

/// Monotonic logical clock.
#[derive(Debug, Default)]
pub struct LogicalClock {
    /// Last issued tick.
    tick: AtomicU64,
}

impl LogicalClock {
    /// Creates a clock whose first reading is `start + 1`.
    #[must_use]
    pub const fn starting_at(start: u64) -> Self {
        Self {
            tick: AtomicU64::new(start),
        }
    }
}

impl Clock for LogicalClock {
    fn now(&self) -> Timestamp {
        let previous = self.tick.fetch_add(1, Ordering::SeqCst);
        Timestamp::Logical(previous.saturating_add(1))
    }
}
