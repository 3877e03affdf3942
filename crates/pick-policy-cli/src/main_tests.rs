// crates/pick-policy-cli/src/main_tests.rs
// ============================================================================
// Module: CLI Main Helpers Tests
// Description: Unit tests for input parsing and bounded reads.
// Purpose: Ensure oversized or malformed prediction inputs fail closed.
// Dependencies: pick-policy-cli main helpers
// ============================================================================

//! ## Overview
//! Validates prediction input parsing and `read_bytes_with_limit`.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    reason = "Test-only assertions and helpers are permitted."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;

use pick_policy_core::ActorRole;
use pick_policy_core::PredictionId;
use tempfile::TempDir;

use super::PredictionBatch;
use super::ReadLimitError;
use super::RoleArg;
use super::parse_predictions;
use super::read_bytes_with_limit;

// ============================================================================
// SECTION: Tests
// ============================================================================

#[test]
fn parses_single_prediction_object() {
    let batch =
        parse_predictions(br#"{"prediction_id":"p-1","metrics":{"confidence":0.7}}"#).unwrap();
    let PredictionBatch::Single(input) = batch else {
        panic!("expected single prediction");
    };
    assert_eq!(input.prediction_id, Some(PredictionId::new("p-1")));
    assert_eq!(input.metrics.confidence, Some(0.7));
}

#[test]
fn parses_prediction_array_as_batch() {
    let batch = parse_predictions(br#"[{"prediction_id":"a"},{"prediction_id":"b"}]"#).unwrap();
    let PredictionBatch::Many(inputs) = batch else {
        panic!("expected batch");
    };
    assert_eq!(inputs.len(), 2);
}

#[test]
fn rejects_non_prediction_json() {
    assert!(parse_predictions(b"42").is_err());
    assert!(parse_predictions(b"{not json").is_err());
    assert!(parse_predictions(br#"{"metrics":{"confidence":"high"}}"#).is_err());
}

#[test]
fn read_bytes_with_limit_rejects_oversized_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("input.json");
    fs::write(&path, vec![b'x'; 32]).unwrap();
    match read_bytes_with_limit(&path, 16) {
        Err(ReadLimitError::TooLarge {
            size,
            limit,
        }) => {
            assert_eq!(size, 32);
            assert_eq!(limit, 16);
        }
        other => panic!("unexpected result: {other:?}"),
    }
    assert_eq!(read_bytes_with_limit(&path, 32).unwrap().len(), 32);
}

#[test]
fn read_bytes_with_limit_reports_missing_file() {
    let dir = TempDir::new().unwrap();
    assert!(matches!(
        read_bytes_with_limit(&dir.path().join("absent.json"), 16),
        Err(ReadLimitError::Io(_))
    ));
}

#[test]
fn role_arguments_map_to_actor_roles() {
    assert_eq!(ActorRole::from(RoleArg::User), ActorRole::User);
    assert_eq!(ActorRole::from(RoleArg::Ops), ActorRole::Ops);
    assert_eq!(ActorRole::from(RoleArg::Admin), ActorRole::Admin);
}
