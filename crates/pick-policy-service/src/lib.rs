// crates/pick-policy-service/src/lib.rs
// ============================================================================
// Module: Pick Policy Service Library
// Description: Service façade over the policy engine and hard-stop latch.
// Purpose: Wire stores, audit, events, and response shaping around the core.
// Dependencies: pick-policy-core, pick-policy-config, pick-policy-store-sqlite
// ============================================================================

//! ## Overview
//! The service layer owns everything the core leaves to its caller: trace
//! identifier issuance and sanitization, audit writes with bounded retry,
//! operational alerts, JSON-line event sinks, batch evaluation, and the API
//! envelopes returned to dashboards and the CLI.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod audit;
pub mod bootstrap;
pub mod clock;
pub mod correlation;
pub mod error;
pub mod events;
pub mod response;
pub mod service;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use audit::AuditDispatcher;
pub use audit::AuditWriter;
pub use bootstrap::build_service;
pub use bootstrap::event_sink_from_config;
pub use clock::SystemClock;
pub use correlation::MAX_TRACE_ID_LENGTH;
pub use correlation::TraceIdRejection;
pub use correlation::resolve_trace_id;
pub use correlation::sanitize_trace_id;
pub use error::ServiceError;
pub use events::EventDetail;
pub use events::FileEventSink;
pub use events::MemoryEventSink;
pub use events::NoopEventSink;
pub use events::PolicyEvent;
pub use events::PolicyEventSink;
pub use events::StderrEventSink;
pub use response::ApiEnvelope;
pub use response::ApiError;
pub use response::ApiMeta;
pub use response::ConfigView;
pub use response::EvaluationView;
pub use response::GateOutcomeView;
pub use response::ResetView;
pub use response::StatusView;
pub use response::TransitionView;
pub use response::format_api_response;
pub use response::format_error_response;
pub use response::render_timestamp;
pub use service::PolicyService;
pub use service::PolicyServiceParams;
