// crates/pick-policy-core/tests/concurrency.rs
// ============================================================================
// Module: Concurrent Evaluation Tests
// Description: Parallel evaluations racing on the hard-stop latch.
// Purpose: Ensure exactly one trigger transition under concurrent critical failures.
// ============================================================================

//! ## Overview
//! Threads are released together by a barrier so evaluations overlap on the
//! latch. History must gain exactly one trigger entry however they interleave.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only assertions and helpers are permitted."
)]

mod common;

use std::sync::Barrier;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use pick_policy_core::ActorRole;
use pick_policy_core::DecisionStatus;
use pick_policy_core::TransitionKind;

use crate::common::BlockingAuditStore;
use crate::common::critical_metrics;
use crate::common::harness;
use crate::common::passing_metrics;
use crate::common::prediction;
use crate::common::reset_request;
use crate::common::run_context;

const THREADS: usize = 16;

#[test]
fn concurrent_critical_failures_trigger_once() {
    let h = harness();
    let barrier = Barrier::new(THREADS);

    let outcomes: Vec<_> = thread::scope(|scope| {
        let handles: Vec<_> = (0..THREADS)
            .map(|index| {
                let engine = &h.engine;
                let barrier = &barrier;
                scope.spawn(move || {
                    barrier.wait();
                    engine
                        .evaluate_detailed(
                            &prediction(&format!("p-{index}"), critical_metrics()),
                            &run_context(),
                        )
                        .unwrap()
                })
            })
            .collect();
        handles.into_iter().map(|handle| handle.join().unwrap()).collect()
    });

    assert!(outcomes.iter().all(|o| o.result.status == DecisionStatus::HardStop));
    let triggers = outcomes.iter().filter(|o| o.trigger_audit.is_some()).count();
    assert_eq!(triggers, 1);

    let state = h.latch.snapshot().unwrap();
    assert_eq!(state.transitions_of(TransitionKind::Triggered), 1);
    assert_eq!(state.history.len(), 1);
    assert_eq!(state.affected_count, THREADS as u64);
    assert_eq!(h.store.save_count().unwrap(), 1);
}

#[test]
fn one_critical_among_passing_predictions() {
    let h = harness();
    let barrier = Barrier::new(THREADS);

    let statuses: Vec<DecisionStatus> = thread::scope(|scope| {
        let handles: Vec<_> = (0..THREADS)
            .map(|index| {
                let engine = &h.engine;
                let barrier = &barrier;
                scope.spawn(move || {
                    let metrics = if index == 0 { critical_metrics() } else { passing_metrics() };
                    barrier.wait();
                    engine
                        .evaluate(&prediction(&format!("p-{index}"), metrics), &run_context())
                        .unwrap()
                        .status
                })
            })
            .collect();
        handles.into_iter().map(|handle| handle.join().unwrap()).collect()
    });

    assert_eq!(statuses[0], DecisionStatus::HardStop);
    assert!(statuses.iter().all(|status| *status != DecisionStatus::NoBet));
    let state = h.latch.snapshot().unwrap();
    assert_eq!(state.transitions_of(TransitionKind::Triggered), 1);

    let later = h.engine.evaluate(&prediction("p-late", passing_metrics()), &run_context()).unwrap();
    assert_eq!(later.status, DecisionStatus::HardStop);
}

#[test]
fn readers_never_see_active_without_cause() {
    let h = harness();
    let barrier = Barrier::new(2);

    thread::scope(|scope| {
        scope.spawn(|| {
            barrier.wait();
            h.engine.evaluate(&prediction("p-trip", critical_metrics()), &run_context()).unwrap();
        });
        scope.spawn(|| {
            barrier.wait();
            for _ in 0..1_000 {
                let state = h.latch.snapshot().unwrap();
                if state.active {
                    assert!(state.cause.is_some());
                    assert!(state.triggered_at.is_some());
                    assert_eq!(state.history.len(), 1);
                }
            }
        });
    });
}

#[test]
fn evaluations_proceed_while_reset_audit_is_in_flight() {
    let h = harness();
    h.engine.evaluate(&prediction("p-trip", critical_metrics()), &run_context()).unwrap();
    let audit = BlockingAuditStore::new();
    let (sender, receiver) = mpsc::channel();

    thread::scope(|scope| {
        let resetting = scope.spawn(|| {
            h.latch.reset(reset_request(Some(ActorRole::Ops), Some("feed repaired")), &audit)
        });
        audit.entered.wait();

        scope.spawn(|| {
            let result =
                h.engine.evaluate(&prediction("p-during", passing_metrics()), &run_context());
            sender.send(result.map(|result| result.status)).unwrap();
        });
        let during = receiver.recv_timeout(Duration::from_secs(5));
        audit.release.wait();

        assert_eq!(during.unwrap().unwrap(), DecisionStatus::HardStop);
        assert!(resetting.join().unwrap().unwrap().reset_performed);
    });

    assert!(!h.latch.is_active());
    assert_eq!(audit.inner.entries().unwrap().len(), 1);
    let after = h.engine.evaluate(&prediction("p-after", passing_metrics()), &run_context()).unwrap();
    assert_eq!(after.status, DecisionStatus::Pick);
}
