// crates/pick-policy-service/src/audit.rs
// ============================================================================
// Module: Audit Writer
// Description: Retrying wrapper and background retry queue for audit writes.
// Purpose: Keep transient audit failures off the decision path.
// Dependencies: pick-policy-core, pick-policy-config
// ============================================================================

//! ## Overview
//! [`AuditWriter`] retries [`AuditError::Unavailable`] with exponential
//! backoff up to the configured attempt budget. Rejections are never retried.
//! The writer itself implements [`AuditStore`] so the latch reset path blocks
//! until its entry is durable or the budget is spent.
//!
//! Trigger entries go through [`AuditDispatcher`] instead: one inline attempt,
//! then a bounded queue drained by a single worker thread that runs the
//! remaining attempts and raises an `AUDIT_WRITE_FAILURE` alert when they are
//! exhausted. Dropping the dispatcher closes the queue and waits for pending
//! retries.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io;
use std::sync::Arc;
use std::sync::mpsc;
use std::sync::mpsc::Receiver;
use std::sync::mpsc::SyncSender;
use std::sync::mpsc::TrySendError;
use std::thread;
use std::thread::JoinHandle;
use std::time::Duration;

use pick_policy_config::AuditConfig;
use pick_policy_config::MAX_AUDIT_RETRY_BACKOFF_MS;
use pick_policy_core::AuditError;
use pick_policy_core::AuditLogEntry;
use pick_policy_core::AuditStore;

use crate::events::PolicyEvent;
use crate::events::PolicyEventSink;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Alert code for audit writes that failed after retries.
pub(crate) const AUDIT_WRITE_FAILURE: &str = "AUDIT_WRITE_FAILURE";
/// Entries awaiting retry before new failures are alerted immediately.
const RETRY_QUEUE_CAPACITY: usize = 1024;
/// Name of the retry worker thread.
const RETRY_THREAD_NAME: &str = "pick-policy-audit-retry";

// ============================================================================
// SECTION: Writer
// ============================================================================

/// Audit store wrapper with bounded retry.
pub struct AuditWriter {
    /// Underlying append-only store.
    store: Arc<dyn AuditStore>,
    /// Total attempts per write, including the first.
    max_attempts: u32,
    /// Base delay before the first retry.
    retry_backoff: Duration,
}

impl AuditWriter {
    /// Wraps a store with the configured retry policy.
    #[must_use]
    pub fn new(store: Arc<dyn AuditStore>, config: AuditConfig) -> Self {
        Self {
            store,
            max_attempts: config.max_attempts.max(1),
            retry_backoff: Duration::from_millis(config.retry_backoff_ms),
        }
    }

    /// Appends an entry, retrying transient failures.
    ///
    /// Returns the number of attempts used.
    ///
    /// # Errors
    ///
    /// Returns the last [`AuditError`] once attempts are exhausted, or the
    /// first non-retryable error.
    pub fn write(&self, entry: &AuditLogEntry) -> Result<u32, AuditError> {
        match self.store.append(entry) {
            Ok(()) => Ok(1),
            Err(err) => self.retry(entry, 1, err),
        }
    }

    /// Continues a write after `attempt` failed attempts ending in `last`.
    fn retry(
        &self,
        entry: &AuditLogEntry,
        mut attempt: u32,
        mut last: AuditError,
    ) -> Result<u32, AuditError> {
        while last.is_retryable() && attempt < self.max_attempts {
            thread::sleep(self.delay_for(attempt));
            attempt += 1;
            match self.store.append(entry) {
                Ok(()) => return Ok(attempt),
                Err(err) => last = err,
            }
        }
        Err(last)
    }

    /// Returns true when a failed first attempt has retries left.
    fn can_retry(&self, err: &AuditError) -> bool {
        err.is_retryable() && self.max_attempts > 1
    }

    /// Returns the delay after the given failed attempt.
    fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt.saturating_sub(1)).unwrap_or(u32::MAX);
        self.retry_backoff
            .saturating_mul(factor)
            .min(Duration::from_millis(MAX_AUDIT_RETRY_BACKOFF_MS))
    }
}

impl AuditStore for AuditWriter {
    fn append(&self, entry: &AuditLogEntry) -> Result<(), AuditError> {
        self.write(entry).map(|_| ())
    }
}

// ============================================================================
// SECTION: Background Retry
// ============================================================================

/// Entry whose first attempt failed with a retryable error.
struct PendingAudit {
    /// Entry to append.
    entry: AuditLogEntry,
    /// Error from the inline attempt.
    error: AuditError,
}

/// Decision-path audit writer backed by a retry worker.
pub struct AuditDispatcher {
    /// Shared retrying writer.
    writer: Arc<AuditWriter>,
    /// Queue feeding the worker; `None` once closed.
    queue: Option<SyncSender<PendingAudit>>,
    /// Worker thread handle; `None` once joined.
    worker: Option<JoinHandle<()>>,
}

impl AuditDispatcher {
    /// Starts the retry worker.
    ///
    /// # Errors
    ///
    /// Returns [`io::Error`] when the worker thread cannot be spawned.
    pub fn spawn(writer: Arc<AuditWriter>, events: Arc<dyn PolicyEventSink>) -> io::Result<Self> {
        let (sender, receiver) = mpsc::sync_channel(RETRY_QUEUE_CAPACITY);
        let worker_writer = Arc::clone(&writer);
        let worker = thread::Builder::new()
            .name(RETRY_THREAD_NAME.to_string())
            .spawn(move || retry_loop(&worker_writer, events.as_ref(), &receiver))?;
        Ok(Self {
            writer,
            queue: Some(sender),
            worker: Some(worker),
        })
    }

    /// Makes one inline attempt and queues a retryable failure for the worker.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError`] when the entry was neither written nor queued:
    /// the store rejected it, no retries are configured, or the queue is full.
    pub fn dispatch(&self, entry: &AuditLogEntry) -> Result<(), AuditError> {
        let error = match self.writer.store.append(entry) {
            Ok(()) => return Ok(()),
            Err(err) if self.writer.can_retry(&err) => err,
            Err(err) => return Err(err),
        };
        let Some(queue) = &self.queue else {
            return Err(error);
        };
        let pending = PendingAudit {
            entry: entry.clone(),
            error,
        };
        match queue.try_send(pending) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(pending) | TrySendError::Disconnected(pending)) => {
                Err(pending.error)
            }
        }
    }
}

impl Drop for AuditDispatcher {
    fn drop(&mut self) {
        drop(self.queue.take());
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

/// Drains the retry queue until every sender is gone.
fn retry_loop(
    writer: &AuditWriter,
    events: &dyn PolicyEventSink,
    receiver: &Receiver<PendingAudit>,
) {
    while let Ok(pending) = receiver.recv() {
        if let Err(err) = writer.retry(&pending.entry, 1, pending.error) {
            events.record(&audit_failure_alert(&pending.entry, &err));
        }
    }
}

/// Builds the alert raised when an audit entry could not be recorded.
pub(crate) fn audit_failure_alert(entry: &AuditLogEntry, err: &AuditError) -> PolicyEvent {
    PolicyEvent::alert(
        entry.trace_id.as_str(),
        AUDIT_WRITE_FAILURE,
        format!("{} audit entry not recorded: {err}", entry.action.as_str()),
    )
}

// ============================================================================
// SECTION: Tests
// ============================================================================
