// crates/pick-policy-service/src/clock.rs
// ============================================================================
// Module: System Clock
// Description: Wall-clock implementation of the core clock interface.
// Purpose: Stamp decisions and transitions with unix milliseconds.
// Dependencies: pick-policy-core
// ============================================================================

//! ## Overview
//! The core never reads wall-clock time directly. Production wiring injects
//! [`SystemClock`]; tests inject the core's logical clock.

use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use pick_policy_core::Clock;
use pick_policy_core::Timestamp;

/// Wall clock reporting unix milliseconds.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        let elapsed = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default();
        Timestamp::UnixMillis(i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
    }
}
