// crates/pick-policy-service/src/events.rs
// ============================================================================
// Module: Policy Events
// Description: Structured operational events for evaluations and resets.
// Purpose: Emit JSON-line events without hard logging dependencies.
// Dependencies: pick-policy-core, serde, serde_json
// ============================================================================

//! ## Overview
//! Every evaluation, latch transition, reset attempt, and operational alert is
//! emitted as one JSON object per line. Sinks are intentionally lightweight so
//! deployments can route events to their preferred logging pipeline.
//! Event payloads carry identifiers and labels only; metric values and
//! free-form prediction data are not logged.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use pick_policy_core::ActorRole;
use pick_policy_core::GateKind;
use pick_policy_core::PolicyEvaluationResult;
use serde::Serialize;

// ============================================================================
// SECTION: Event Payloads
// ============================================================================

/// Structured policy event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PolicyEvent {
    /// Event label.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Trace identifier correlating the event.
    pub trace_id: String,
    /// Event-specific fields.
    #[serde(flatten)]
    pub detail: EventDetail,
}

/// Event-specific payload fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum EventDetail {
    /// A completed evaluation.
    Evaluation {
        /// Decision identifier.
        decision_id: String,
        /// Prediction identifier.
        prediction_id: String,
        /// Run identifier.
        run_id: String,
        /// Decision status label.
        status: &'static str,
        /// Failing gate names in evaluation order.
        failing_gates: Vec<String>,
        /// Policy configuration fingerprint.
        policy_hash: String,
    },
    /// The latch engaged.
    HardStopTriggered {
        /// Gate whose failure engaged the latch.
        gate: Option<GateKind>,
        /// Recorded cause.
        cause: String,
        /// Run identifier.
        run_id: Option<String>,
    },
    /// A reset attempt, accepted or not.
    Reset {
        /// Caller identifier.
        actor_id: String,
        /// Caller role, when supplied.
        role: Option<ActorRole>,
        /// Rejection code for refused resets.
        #[serde(skip_serializing_if = "Option::is_none")]
        error_code: Option<&'static str>,
    },
    /// An operational alert that did not block the caller.
    Alert {
        /// Alert code.
        code: &'static str,
        /// Alert message.
        message: String,
    },
}

impl PolicyEvent {
    /// Creates an event with a consistent timestamp.
    #[must_use]
    pub fn new(event: &'static str, trace_id: impl Into<String>, detail: EventDetail) -> Self {
        let timestamp_ms =
            SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis();
        Self {
            event,
            timestamp_ms,
            trace_id: trace_id.into(),
            detail,
        }
    }

    /// Builds a `policy_evaluation` event from a decision.
    #[must_use]
    pub fn evaluation(result: &PolicyEvaluationResult) -> Self {
        Self::new(
            "policy_evaluation",
            result.trace_id.as_str(),
            EventDetail::Evaluation {
                decision_id: result.decision_id.as_str().to_string(),
                prediction_id: result.prediction_id.as_str().to_string(),
                run_id: result.run_id.as_str().to_string(),
                status: result.status.as_str(),
                failing_gates: result.failing_gates().into_iter().map(str::to_string).collect(),
                policy_hash: result.policy_hash.clone(),
            },
        )
    }

    /// Builds an `operational_alert` event.
    #[must_use]
    pub fn alert(trace_id: impl Into<String>, code: &'static str, message: String) -> Self {
        Self::new(
            "operational_alert",
            trace_id,
            EventDetail::Alert {
                code,
                message,
            },
        )
    }
}

// ============================================================================
// SECTION: Sinks
// ============================================================================

/// Sink for policy events.
pub trait PolicyEventSink: Send + Sync {
    /// Record an event.
    fn record(&self, event: &PolicyEvent);
}

/// Event sink that logs JSON lines to stderr.
pub struct StderrEventSink;

impl PolicyEventSink for StderrEventSink {
    fn record(&self, event: &PolicyEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr(), "{payload}");
        }
    }
}

/// Event sink that appends JSON lines to a file.
pub struct FileEventSink {
    /// File handle used for append-only logging.
    file: Mutex<std::fs::File>,
}

impl FileEventSink {
    /// Opens the event log file in append mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn new(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl PolicyEventSink for FileEventSink {
    fn record(&self, event: &PolicyEvent) {
        if let Ok(payload) = serde_json::to_string(event)
            && let Ok(mut file) = self.file.lock()
        {
            let _ = writeln!(file, "{payload}");
            let _ = file.flush();
        }
    }
}

/// No-op event sink.
pub struct NoopEventSink;

impl PolicyEventSink for NoopEventSink {
    fn record(&self, _event: &PolicyEvent) {}
}

/// In-memory event sink used by tests and embedding callers.
#[derive(Default)]
pub struct MemoryEventSink {
    /// Recorded events in emission order.
    events: Mutex<Vec<PolicyEvent>>,
}

impl MemoryEventSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns recorded events; empty when the lock is poisoned.
    #[must_use]
    pub fn events(&self) -> Vec<PolicyEvent> {
        self.events.lock().map(|events| events.clone()).unwrap_or_default()
    }

    /// Returns labels of recorded events in order.
    #[must_use]
    pub fn labels(&self) -> Vec<&'static str> {
        self.events().iter().map(|event| event.event).collect()
    }
}

impl PolicyEventSink for MemoryEventSink {
    fn record(&self, event: &PolicyEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}
