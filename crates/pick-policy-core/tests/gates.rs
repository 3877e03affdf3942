// crates/pick-policy-core/tests/gates.rs
// ============================================================================
// Module: Gate Evaluation Tests
// Description: Threshold direction, inclusivity, missing metrics, and faults.
// Purpose: Pin the verdict of every gate kind at and around its threshold.
// ============================================================================

//! ## Overview
//! Exercises each gate kind in isolation against boundary and malformed inputs.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::float_cmp,
    reason = "Test-only assertions and helpers are permitted."
)]

use pick_policy_core::Gate;
use pick_policy_core::GateConfig;
use pick_policy_core::GateFault;
use pick_policy_core::GateKind;
use pick_policy_core::GateSeverity;
use pick_policy_core::PredictionMetrics;

fn drift_gate() -> Gate {
    Gate::new(GateConfig::Drift {
        max_drift_score: 0.15,
    })
}

fn drift_metrics(drift: Option<f64>) -> PredictionMetrics {
    PredictionMetrics {
        drift_score: drift,
        ..PredictionMetrics::default()
    }
}

// ============================================================================
// SECTION: Boundary Inclusivity
// ============================================================================

#[test]
fn drift_at_threshold_passes() {
    let result = drift_gate().evaluate(&drift_metrics(Some(0.15))).unwrap();
    assert!(result.passed);
    assert_eq!(result.score, 0.15);
    assert_eq!(result.threshold, 0.15);
}

#[test]
fn drift_above_threshold_fails() {
    let result = drift_gate().evaluate(&drift_metrics(Some(0.16))).unwrap();
    assert!(!result.passed);
    assert_eq!(result.severity, GateSeverity::Warning);
    assert!(result.message.contains("exceeds max"));
}

#[test]
fn drift_below_threshold_passes() {
    let result = drift_gate().evaluate(&drift_metrics(Some(0.14))).unwrap();
    assert!(result.passed);
}

#[test]
fn missing_drift_is_treated_as_zero() {
    let result = drift_gate().evaluate(&drift_metrics(None)).unwrap();
    assert!(result.passed);
    assert_eq!(result.score, 0.0);
    assert_eq!(result.gate_name, "drift");
}

#[test]
fn confidence_at_minimum_passes() {
    let gate = Gate::new(GateConfig::Confidence {
        min_confidence: 0.6,
    });
    let at_min = PredictionMetrics {
        confidence: Some(0.6),
        ..PredictionMetrics::default()
    };
    let below = PredictionMetrics {
        confidence: Some(0.59),
        ..PredictionMetrics::default()
    };
    assert!(gate.evaluate(&at_min).unwrap().passed);
    let failed = gate.evaluate(&below).unwrap();
    assert!(!failed.passed);
    assert!(failed.message.contains("below min"));
}

// ============================================================================
// SECTION: Derived and Missing Metrics
// ============================================================================

#[test]
fn confidence_is_derived_from_win_probability() {
    let gate = Gate::new(GateConfig::Confidence {
        min_confidence: 0.6,
    });
    let strong = PredictionMetrics {
        home_win_probability: Some(0.9),
        ..PredictionMetrics::default()
    };
    let coin_flip = PredictionMetrics {
        home_win_probability: Some(0.55),
        ..PredictionMetrics::default()
    };
    let result = gate.evaluate(&strong).unwrap();
    assert!(result.passed);
    assert!((result.score - 0.8).abs() < 1e-9);
    assert!(result.message.contains("derived from home_win_probability"));
    assert!(!gate.evaluate(&coin_flip).unwrap().passed);
}

#[test]
fn explicit_confidence_wins_over_derived() {
    let gate = Gate::new(GateConfig::Confidence {
        min_confidence: 0.6,
    });
    let metrics = PredictionMetrics {
        confidence: Some(0.2),
        home_win_probability: Some(0.99),
        ..PredictionMetrics::default()
    };
    assert!(!gate.evaluate(&metrics).unwrap().passed);
}

#[test]
fn missing_metrics_pass_every_gate() {
    let gates = [
        GateConfig::Confidence {
            min_confidence: 0.99,
        },
        GateConfig::CalibrationError {
            max_calibration_error: 0.0,
        },
        GateConfig::DataFreshness {
            max_age_hours: 1.0,
        },
        GateConfig::ModelVersion {
            allowed_versions: vec!["v3".to_string()],
        },
        GateConfig::DataQuality {
            min_quality_score: 1.0,
        },
        GateConfig::KillSwitch,
    ];
    for config in gates {
        let result = Gate::new(config).evaluate(&PredictionMetrics::default()).unwrap();
        assert!(result.passed, "{} should pass on missing metric", result.gate_name);
    }
}

// ============================================================================
// SECTION: Categorical Gates
// ============================================================================

#[test]
fn model_version_allow_list() {
    let gate = Gate::new(GateConfig::ModelVersion {
        allowed_versions: vec!["xgb-2024.1".to_string(), "xgb-2024.2".to_string()],
    });
    let allowed = PredictionMetrics {
        model_version: Some("xgb-2024.2".to_string()),
        ..PredictionMetrics::default()
    };
    let unknown = PredictionMetrics {
        model_version: Some("xgb-2023.9".to_string()),
        ..PredictionMetrics::default()
    };
    assert!(gate.evaluate(&allowed).unwrap().passed);
    let failed = gate.evaluate(&unknown).unwrap();
    assert!(!failed.passed);
    assert_eq!(failed.score, 0.0);
    assert_eq!(failed.severity, GateSeverity::Warning);
}

#[test]
fn kill_switch_is_critical() {
    let gate = Gate::new(GateConfig::KillSwitch);
    let engaged = PredictionMetrics {
        kill_switch: Some(true),
        ..PredictionMetrics::default()
    };
    let result = gate.evaluate(&engaged).unwrap();
    assert!(!result.passed);
    assert_eq!(result.severity, GateSeverity::Critical);
}

#[test]
fn data_quality_failure_is_critical() {
    let gate = Gate::new(GateConfig::DataQuality {
        min_quality_score: 0.5,
    });
    let poor = PredictionMetrics {
        data_quality_score: Some(0.2),
        ..PredictionMetrics::default()
    };
    let result = gate.evaluate(&poor).unwrap();
    assert!(!result.passed);
    assert_eq!(result.severity, GateSeverity::Critical);
}

// ============================================================================
// SECTION: Faults
// ============================================================================

#[test]
fn nan_metric_faults() {
    let fault = drift_gate().evaluate(&drift_metrics(Some(f64::NAN))).unwrap_err();
    assert_eq!(fault.gate(), GateKind::Drift);
    assert!(matches!(fault, GateFault::NonFinite { .. }));
}

#[test]
fn infinite_metric_faults() {
    assert!(drift_gate().evaluate(&drift_metrics(Some(f64::INFINITY))).is_err());
}

#[test]
fn negative_data_age_faults() {
    let gate = Gate::new(GateConfig::DataFreshness {
        max_age_hours: 24.0,
    });
    let metrics = PredictionMetrics {
        data_age_hours: Some(-1.0),
        ..PredictionMetrics::default()
    };
    assert!(matches!(gate.evaluate(&metrics), Err(GateFault::OutOfRange { .. })));
}

#[test]
fn probability_out_of_range_faults() {
    let gate = Gate::new(GateConfig::Confidence {
        min_confidence: 0.6,
    });
    let metrics = PredictionMetrics {
        home_win_probability: Some(1.4),
        ..PredictionMetrics::default()
    };
    assert!(gate.evaluate(&metrics).is_err());
}

#[test]
fn blank_model_version_faults() {
    let gate = Gate::new(GateConfig::ModelVersion {
        allowed_versions: vec!["v1".to_string()],
    });
    let metrics = PredictionMetrics {
        model_version: Some("  ".to_string()),
        ..PredictionMetrics::default()
    };
    assert!(matches!(gate.evaluate(&metrics), Err(GateFault::BlankModelVersion { .. })));
}

#[test]
fn severity_is_static_per_kind() {
    assert_eq!(GateKind::Confidence.severity(), GateSeverity::Warning);
    assert_eq!(GateKind::Drift.severity(), GateSeverity::Warning);
    assert_eq!(GateKind::CalibrationError.severity(), GateSeverity::Warning);
    assert_eq!(GateKind::DataFreshness.severity(), GateSeverity::Warning);
    assert_eq!(GateKind::ModelVersion.severity(), GateSeverity::Warning);
    assert_eq!(GateKind::DataQuality.severity(), GateSeverity::Critical);
    assert_eq!(GateKind::KillSwitch.severity(), GateSeverity::Critical);
}
