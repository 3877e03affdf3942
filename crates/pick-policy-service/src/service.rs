// crates/pick-policy-service/src/service.rs
// ============================================================================
// Module: Policy Service
// Description: Façade over the policy engine, latch, audit log, and events.
// Purpose: Serve evaluations, status, config, and resets to API callers.
// Dependencies: pick-policy-core, pick-policy-config
// ============================================================================

//! ## Overview
//! [`PolicyService`] is the entry point used by the orchestrator, dashboards,
//! and the CLI. It assigns or validates the trace identifier of every call,
//! writes audit entries for latch transitions, and emits operational events.
//!
//! Audit failures on the evaluation path never block the decision. Trigger
//! entries get one inline attempt through the [`AuditDispatcher`]; transient
//! failures are retried on its worker thread, and an `AUDIT_WRITE_FAILURE`
//! alert is emitted once retries run out. Resets write through the blocking
//! [`AuditWriter`], and an audit failure fails the reset.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::thread;

use pick_policy_config::AuditConfig;
use pick_policy_core::Actor;
use pick_policy_core::AuditLogEntry;
use pick_policy_core::AuditStore;
use pick_policy_core::Clock;
use pick_policy_core::DEFAULT_HASH_ALGORITHM;
use pick_policy_core::EvaluationOutcome;
use pick_policy_core::HardStopLatch;
use pick_policy_core::HardStopStore;
use pick_policy_core::IdGenerator;
use pick_policy_core::PolicyConfig;
use pick_policy_core::PolicyEngine;
use pick_policy_core::PolicyEvaluationResult;
use pick_policy_core::PredictionInput;
use pick_policy_core::ResetError;
use pick_policy_core::ResetOutcome;
use pick_policy_core::ResetRequest;
use pick_policy_core::RunContext;
use pick_policy_core::TraceId;

use crate::audit::AUDIT_WRITE_FAILURE;
use crate::audit::AuditDispatcher;
use crate::audit::AuditWriter;
use crate::audit::audit_failure_alert;
use crate::correlation::resolve_trace_id;
use crate::correlation::sanitize_trace_id;
use crate::error::ServiceError;
use crate::events::EventDetail;
use crate::events::PolicyEvent;
use crate::events::PolicyEventSink;
use crate::response::ApiEnvelope;
use crate::response::ConfigView;
use crate::response::EvaluationView;
use crate::response::StatusView;
use crate::response::format_api_response;
use crate::response::format_error_response;

// ============================================================================
// SECTION: Construction
// ============================================================================

/// Dependencies required to build a [`PolicyService`].
pub struct PolicyServiceParams {
    /// Gate configuration.
    pub policy: PolicyConfig,
    /// Durable hard-stop store.
    pub hard_stop_store: Arc<dyn HardStopStore>,
    /// Append-only audit store.
    pub audit_store: Arc<dyn AuditStore>,
    /// Event sink.
    pub events: Arc<dyn PolicyEventSink>,
    /// Clock used for decisions and transitions.
    pub clock: Arc<dyn Clock>,
    /// Audit retry policy.
    pub audit: AuditConfig,
    /// Maximum evaluations running at once inside a batch.
    pub max_parallel_evaluations: usize,
}

/// Policy service façade.
///
/// # Invariants
/// - The service and its engine share one latch.
/// - Every latch transition produced through the service is offered to the
///   audit store.
pub struct PolicyService {
    /// Gate runner and aggregator.
    engine: PolicyEngine,
    /// Shared hard-stop latch.
    latch: Arc<HardStopLatch>,
    /// Blocking retrying audit writer for resets.
    audit: Arc<AuditWriter>,
    /// Non-blocking audit path for evaluations.
    dispatcher: AuditDispatcher,
    /// Operational event sink.
    events: Arc<dyn PolicyEventSink>,
    /// Clock for response metadata.
    clock: Arc<dyn Clock>,
    /// Batch parallelism bound.
    max_parallel: usize,
}

impl PolicyService {
    /// Restores the latch from the store and builds the engine.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Latch`] when the persisted state cannot be
    /// loaded, [`ServiceError::Policy`] when the gate configuration is
    /// invalid, and [`ServiceError::Worker`] when the audit retry worker
    /// cannot start.
    pub fn new(params: PolicyServiceParams) -> Result<Self, ServiceError> {
        let latch =
            Arc::new(HardStopLatch::open(params.hard_stop_store, Arc::clone(&params.clock))?);
        let engine =
            PolicyEngine::new(params.policy, Arc::clone(&latch), Arc::clone(&params.clock))?;
        let audit = Arc::new(AuditWriter::new(params.audit_store, params.audit));
        let dispatcher = AuditDispatcher::spawn(Arc::clone(&audit), Arc::clone(&params.events))
            .map_err(|err| ServiceError::Worker(format!("audit retry worker: {err}")))?;
        Ok(Self {
            engine,
            latch,
            audit,
            dispatcher,
            events: params.events,
            clock: params.clock,
            max_parallel: params.max_parallel_evaluations.max(1),
        })
    }

    /// Replaces the decision and trace identifier generator.
    #[must_use]
    pub fn with_id_generator(mut self, ids: IdGenerator) -> Self {
        self.engine = self.engine.with_id_generator(ids);
        self
    }

    /// Returns the shared latch.
    #[must_use]
    pub const fn latch(&self) -> &Arc<HardStopLatch> {
        &self.latch
    }

    /// Returns the engine.
    #[must_use]
    pub const fn engine(&self) -> &PolicyEngine {
        &self.engine
    }
}

// ============================================================================
// SECTION: Evaluation
// ============================================================================

impl PolicyService {
    /// Evaluates one prediction.
    ///
    /// A caller trace id on `context` is sanitized; when absent one is issued.
    /// Audit and persistence failures caused by a latch transition are
    /// reported as alerts and do not fail the call.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::InvalidTraceId`] for a malformed trace id and
    /// [`ServiceError::Policy`] when the prediction id is missing.
    pub fn evaluate_prediction(
        &self,
        prediction: &PredictionInput,
        context: &RunContext,
    ) -> Result<PolicyEvaluationResult, ServiceError> {
        let trace_id =
            resolve_trace_id(context.trace_id.as_ref().map(TraceId::as_str), self.engine.ids())?;
        let context = context.clone().with_trace_id(trace_id);
        let outcome = self.engine.evaluate_detailed(prediction, &context)?;
        self.publish(&outcome);
        Ok(outcome.result)
    }

    /// Evaluates a run's predictions in parallel, preserving input order.
    ///
    /// Each prediction gets its own result; one invalid prediction does not
    /// fail the batch. At most `max_parallel_evaluations` run at once.
    #[must_use]
    pub fn evaluate_batch(
        &self,
        predictions: &[PredictionInput],
        context: &RunContext,
    ) -> Vec<Result<PolicyEvaluationResult, ServiceError>> {
        if let Err(rejection) = sanitize_trace_id(context.trace_id.as_ref().map(TraceId::as_str)) {
            return predictions.iter().map(|_| Err(ServiceError::from(rejection))).collect();
        }
        let workers = self.max_parallel.min(predictions.len()).max(1);
        let mut slots: Vec<Option<Result<PolicyEvaluationResult, ServiceError>>> =
            predictions.iter().map(|_| None).collect();

        thread::scope(|scope| {
            let handles: Vec<_> = (0..workers)
                .map(|worker| {
                    scope.spawn(move || {
                        predictions
                            .iter()
                            .enumerate()
                            .skip(worker)
                            .step_by(workers)
                            .map(|(index, prediction)| {
                                (index, self.evaluate_prediction(prediction, context))
                            })
                            .collect::<Vec<_>>()
                    })
                })
                .collect();
            for handle in handles {
                if let Ok(results) = handle.join() {
                    for (index, result) in results {
                        if let Some(slot) = slots.get_mut(index) {
                            *slot = Some(result);
                        }
                    }
                }
            }
        });

        slots
            .into_iter()
            .map(|slot| {
                slot.unwrap_or_else(|| {
                    Err(ServiceError::Worker("evaluation worker panicked".to_string()))
                })
            })
            .collect()
    }

    /// Writes trigger audit entries and emits events for one evaluation.
    fn publish(&self, outcome: &EvaluationOutcome) {
        let result = &outcome.result;
        let trace = result.trace_id.as_str();
        if let Some(entry) = &outcome.trigger_audit {
            self.events.record(&PolicyEvent::new(
                "hard_stop_triggered",
                trace,
                EventDetail::HardStopTriggered {
                    gate: entry.gate,
                    cause: entry.reason.clone(),
                    run_id: entry.run_id.as_ref().map(|run| run.as_str().to_string()),
                },
            ));
            self.write_audit(entry);
        }
        if let Some(err) = &outcome.latch_error {
            self.events.record(&PolicyEvent::alert(trace, err.code(), err.to_string()));
        }
        self.events.record(&PolicyEvent::evaluation(result));
    }

    /// Hands an audit entry to the dispatcher; inline failures become alerts.
    fn write_audit(&self, entry: &AuditLogEntry) {
        if let Err(err) = self.dispatcher.dispatch(entry) {
            self.events.record(&audit_failure_alert(entry, &err));
        }
    }
}

// ============================================================================
// SECTION: Status, Config, Reset
// ============================================================================

impl PolicyService {
    /// Returns a read-only snapshot of the hard-stop state.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Latch`] when the latch lock is poisoned.
    pub fn get_status(&self) -> Result<StatusView, ServiceError> {
        let state = self.latch.snapshot()?;
        Ok(StatusView::from(&state))
    }

    /// Returns the active configuration and its fingerprint.
    #[must_use]
    pub fn get_config(&self) -> ConfigView {
        let config = self.engine.config();
        ConfigView {
            policy_version: config.policy_version.clone(),
            gates: config.gates.clone(),
            policy_hash: self.engine.policy_hash().to_string(),
            hash_algorithm: DEFAULT_HASH_ALGORITHM.label(),
        }
    }

    /// Clears the hard-stop latch on behalf of an authorized operator.
    ///
    /// Resetting an inactive latch succeeds as a no-op and is still audited.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Reset`] when the role or reason is missing,
    /// the audit entry cannot be written, or the cleared state cannot be
    /// persisted. The latch is unchanged in every error case.
    pub fn reset(
        &self,
        actor: Actor,
        reason: Option<String>,
        trace_id: Option<&str>,
    ) -> Result<ResetOutcome, ServiceError> {
        let trace_id = resolve_trace_id(trace_id, self.engine.ids())?;
        let actor_id = actor.user_id.as_str().to_string();
        let role = actor.role;
        let detail = |error_code| EventDetail::Reset {
            actor_id: actor_id.clone(),
            role,
            error_code,
        };
        let request = ResetRequest {
            actor,
            reason,
            trace_id: trace_id.clone(),
        };
        match self.latch.reset(request, self.audit.as_ref()) {
            Ok(outcome) => {
                let label =
                    if outcome.reset_performed { "hard_stop_reset" } else { "hard_stop_reset_noop" };
                self.events.record(&PolicyEvent::new(label, trace_id.as_str(), detail(None)));
                if let Some(err) = &outcome.audit_error {
                    self.events.record(&PolicyEvent::alert(
                        trace_id.as_str(),
                        AUDIT_WRITE_FAILURE,
                        format!("no-op reset audit entry not recorded: {err}"),
                    ));
                }
                Ok(outcome)
            }
            Err(err) => {
                self.events.record(&PolicyEvent::new(
                    "hard_stop_reset_rejected",
                    trace_id.as_str(),
                    detail(Some(err.code())),
                ));
                if let ResetError::AuditWrite(audit_err) = &err {
                    self.events.record(&PolicyEvent::alert(
                        trace_id.as_str(),
                        AUDIT_WRITE_FAILURE,
                        format!("reset blocked: {audit_err}"),
                    ));
                }
                Err(err.into())
            }
        }
    }
}

// ============================================================================
// SECTION: Response Shaping
// ============================================================================

impl PolicyService {
    /// Wraps an evaluation result in a success envelope stamped now.
    #[must_use]
    pub fn format_api_response(
        &self,
        result: &PolicyEvaluationResult,
    ) -> ApiEnvelope<EvaluationView> {
        format_api_response(result, self.clock.now())
    }

    /// Wraps an arbitrary payload in a success envelope stamped now.
    #[must_use]
    pub fn format_data_response<T>(&self, data: T, trace_id: Option<&TraceId>) -> ApiEnvelope<T> {
        ApiEnvelope::ok(data, trace_id, self.clock.now())
    }

    /// Wraps an error in a failure envelope stamped now.
    #[must_use]
    pub fn format_error_response(
        &self,
        error: &ServiceError,
        trace_id: Option<&TraceId>,
    ) -> ApiEnvelope<()> {
        format_error_response(error, trace_id, self.clock.now())
    }
}
