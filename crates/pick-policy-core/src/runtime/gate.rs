// crates/pick-policy-core/src/runtime/gate.rs
// ============================================================================
// Module: Pick Policy Gate Evaluation
// Description: Pure threshold evaluation of prediction metrics per gate kind.
// Purpose: Convert one metric and one configured threshold into a gate verdict.
// Dependencies: crate::core, thiserror
// ============================================================================

//! ## Overview
//! A [`Gate`] compares one metric against one threshold using a fixed,
//! inclusive comparison direction. Missing metrics are substituted with the
//! best possible value for the gate. Malformed metrics (non-finite values,
//! probabilities outside `[0, 1]`, negative ages, blank model versions) raise
//! a [`GateFault`]; the engine converts faults into critical failures so that
//! gates fail closed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

use crate::core::GateConfig;
use crate::core::GateKind;
use crate::core::GateResult;
use crate::core::GateSeverity;
use crate::core::PredictionMetrics;

// ============================================================================
// SECTION: Gate Faults
// ============================================================================

/// Fault raised when a gate cannot evaluate malformed input.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GateFault {
    /// A metric is NaN or infinite.
    #[error("{gate}: metric {metric} is not finite")]
    NonFinite {
        /// Gate that faulted.
        gate: GateKind,
        /// Metric field name.
        metric: &'static str,
    },
    /// A metric lies outside its valid domain.
    #[error("{gate}: metric {metric} out of range ({value}); expected {expected}")]
    OutOfRange {
        /// Gate that faulted.
        gate: GateKind,
        /// Metric field name.
        metric: &'static str,
        /// Reported value.
        value: f64,
        /// Description of the valid domain.
        expected: &'static str,
    },
    /// The reported model version is blank.
    #[error("{gate}: model_version is blank")]
    BlankModelVersion {
        /// Gate that faulted.
        gate: GateKind,
    },
}

impl GateFault {
    /// Returns the gate that faulted.
    #[must_use]
    pub const fn gate(&self) -> GateKind {
        match self {
            Self::NonFinite {
                gate, ..
            }
            | Self::OutOfRange {
                gate, ..
            }
            | Self::BlankModelVersion {
                gate,
            } => *gate,
        }
    }

    /// Returns the stable machine-readable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        "GATE_FAULT"
    }
}

// ============================================================================
// SECTION: Bounds
// ============================================================================

/// Inclusive comparison direction for numeric gates.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Bound {
    /// Value must be greater than or equal to the threshold.
    AtLeast(f64),
    /// Value must be less than or equal to the threshold.
    AtMost(f64),
}

impl Bound {
    /// Returns the threshold value.
    const fn threshold(self) -> f64 {
        match self {
            Self::AtLeast(value) | Self::AtMost(value) => value,
        }
    }

    /// Returns true when the value satisfies the bound (boundary passes).
    fn admits(self, value: f64) -> bool {
        match self {
            Self::AtLeast(threshold) => value >= threshold,
            Self::AtMost(threshold) => value <= threshold,
        }
    }

    /// Describes the outcome for a gate message.
    const fn verdict(self, passed: bool) -> &'static str {
        match (self, passed) {
            (Self::AtLeast(_), true) => "meets min",
            (Self::AtLeast(_), false) => "below min",
            (Self::AtMost(_), true) => "within max",
            (Self::AtMost(_), false) => "exceeds max",
        }
    }
}

/// Metric value as seen by a numeric gate.
enum Reading {
    /// Reported by the caller.
    Reported(f64),
    /// Derived from another reported metric.
    Derived(f64, &'static str),
    /// Not reported; substituted with the best value.
    Missing(f64),
}

// ============================================================================
// SECTION: Gate
// ============================================================================

/// One configured gate.
///
/// # Invariants
/// - [`Gate::evaluate`] is pure: identical metrics always yield identical results.
#[derive(Debug, Clone, PartialEq)]
pub struct Gate {
    /// Validated gate configuration.
    config: GateConfig,
}

impl Gate {
    /// Creates a gate from an already-validated configuration.
    #[must_use]
    pub const fn new(config: GateConfig) -> Self {
        Self {
            config,
        }
    }

    /// Returns the gate kind.
    #[must_use]
    pub const fn kind(&self) -> GateKind {
        self.config.kind()
    }

    /// Returns the gate configuration.
    #[must_use]
    pub const fn config(&self) -> &GateConfig {
        &self.config
    }

    /// Returns the numeric threshold reported in gate results.
    #[must_use]
    pub const fn threshold(&self) -> f64 {
        match &self.config {
            GateConfig::Confidence {
                min_confidence,
            } => *min_confidence,
            GateConfig::Drift {
                max_drift_score,
            } => *max_drift_score,
            GateConfig::CalibrationError {
                max_calibration_error,
            } => *max_calibration_error,
            GateConfig::DataFreshness {
                max_age_hours,
            } => *max_age_hours,
            GateConfig::ModelVersion {
                ..
            } => 1.0,
            GateConfig::DataQuality {
                min_quality_score,
            } => *min_quality_score,
            GateConfig::KillSwitch => 0.0,
        }
    }

    /// Evaluates the gate against prediction metrics.
    ///
    /// # Errors
    ///
    /// Returns [`GateFault`] when the relevant metric is malformed.
    pub fn evaluate(&self, metrics: &PredictionMetrics) -> Result<GateResult, GateFault> {
        let kind = self.kind();
        match &self.config {
            GateConfig::Confidence {
                min_confidence,
            } => {
                let reading = confidence_reading(kind, metrics)?;
                Ok(numeric_result(kind, Bound::AtLeast(*min_confidence), &reading))
            }
            GateConfig::Drift {
                max_drift_score,
            } => {
                let reading = optional_reading(kind, "drift_score", metrics.drift_score, 0.0)?;
                Ok(numeric_result(kind, Bound::AtMost(*max_drift_score), &reading))
            }
            GateConfig::CalibrationError {
                max_calibration_error,
            } => {
                let reading =
                    optional_reading(kind, "calibration_error", metrics.calibration_error, 0.0)?;
                Ok(numeric_result(kind, Bound::AtMost(*max_calibration_error), &reading))
            }
            GateConfig::DataFreshness {
                max_age_hours,
            } => {
                let reading =
                    optional_reading(kind, "data_age_hours", metrics.data_age_hours, 0.0)?;
                if let Reading::Reported(age) = reading
                    && age < 0.0
                {
                    return Err(GateFault::OutOfRange {
                        gate: kind,
                        metric: "data_age_hours",
                        value: age,
                        expected: "a non-negative age",
                    });
                }
                Ok(numeric_result(kind, Bound::AtMost(*max_age_hours), &reading))
            }
            GateConfig::ModelVersion {
                allowed_versions,
            } => evaluate_model_version(kind, allowed_versions, metrics.model_version.as_deref()),
            GateConfig::DataQuality {
                min_quality_score,
            } => {
                let reading =
                    optional_reading(kind, "data_quality_score", metrics.data_quality_score, 1.0)?;
                if let Reading::Reported(score) = reading {
                    check_probability(kind, "data_quality_score", score)?;
                }
                Ok(numeric_result(kind, Bound::AtLeast(*min_quality_score), &reading))
            }
            GateConfig::KillSwitch => Ok(evaluate_kill_switch(kind, metrics.kill_switch)),
        }
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the confidence reading, deriving it from the win probability when needed.
fn confidence_reading(kind: GateKind, metrics: &PredictionMetrics) -> Result<Reading, GateFault> {
    if let Some(confidence) = metrics.confidence {
        check_finite(kind, "confidence", confidence)?;
        check_probability(kind, "confidence", confidence)?;
        return Ok(Reading::Reported(confidence));
    }
    if let Some(probability) = metrics.home_win_probability {
        check_finite(kind, "home_win_probability", probability)?;
        check_probability(kind, "home_win_probability", probability)?;
        let derived = (probability - 0.5).abs() * 2.0;
        return Ok(Reading::Derived(derived, "home_win_probability"));
    }
    Ok(Reading::Missing(1.0))
}

/// Resolves an optional numeric metric, substituting `best` when absent.
fn optional_reading(
    kind: GateKind,
    metric: &'static str,
    value: Option<f64>,
    best: f64,
) -> Result<Reading, GateFault> {
    match value {
        Some(value) => {
            check_finite(kind, metric, value)?;
            Ok(Reading::Reported(value))
        }
        None => Ok(Reading::Missing(best)),
    }
}

/// Rejects NaN and infinite metric values.
const fn check_finite(kind: GateKind, metric: &'static str, value: f64) -> Result<(), GateFault> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(GateFault::NonFinite {
            gate: kind,
            metric,
        })
    }
}

/// Rejects probability-like metrics outside `[0, 1]`.
fn check_probability(kind: GateKind, metric: &'static str, value: f64) -> Result<(), GateFault> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(GateFault::OutOfRange {
            gate: kind,
            metric,
            value,
            expected: "a value within [0, 1]",
        })
    }
}

/// Builds the result for a numeric gate.
fn numeric_result(kind: GateKind, bound: Bound, reading: &Reading) -> GateResult {
    let threshold = bound.threshold();
    let (score, message) = match reading {
        Reading::Reported(value) => {
            let passed = bound.admits(*value);
            (*value, format!("{kind} {value} {} {threshold}", bound.verdict(passed)))
        }
        Reading::Derived(value, source) => {
            let passed = bound.admits(*value);
            (
                *value,
                format!(
                    "{kind} {value} (derived from {source}) {} {threshold}",
                    bound.verdict(passed)
                ),
            )
        }
        Reading::Missing(value) => (*value, format!("{kind} not reported; treated as {value}")),
    };
    GateResult {
        gate_name: kind.as_str().to_string(),
        passed: bound.admits(score),
        score,
        threshold,
        severity: kind.severity(),
        message,
        faulted: false,
    }
}

/// Evaluates the model version allow-list.
fn evaluate_model_version(
    kind: GateKind,
    allowed_versions: &[String],
    reported: Option<&str>,
) -> Result<GateResult, GateFault> {
    let (passed, message) = match reported {
        None => (true, format!("{kind} not reported; treated as allowed")),
        Some(version) if version.trim().is_empty() => {
            return Err(GateFault::BlankModelVersion {
                gate: kind,
            });
        }
        Some(version) => {
            if allowed_versions.iter().any(|allowed| allowed == version) {
                (true, format!("{kind} {version} is allowed"))
            } else {
                (false, format!("{kind} {version} is not in the allow-list"))
            }
        }
    };
    Ok(GateResult {
        gate_name: kind.as_str().to_string(),
        passed,
        score: if passed { 1.0 } else { 0.0 },
        threshold: 1.0,
        severity: kind.severity(),
        message,
        faulted: false,
    })
}

/// Evaluates the kill-switch flag.
fn evaluate_kill_switch(kind: GateKind, engaged: Option<bool>) -> GateResult {
    let engaged = engaged.unwrap_or(false);
    let message = if engaged {
        format!("{kind} engaged upstream")
    } else {
        format!("{kind} not engaged")
    };
    GateResult {
        gate_name: kind.as_str().to_string(),
        passed: !engaged,
        score: if engaged { 1.0 } else { 0.0 },
        threshold: 0.0,
        severity: GateSeverity::Critical,
        message,
        faulted: false,
    }
}

/// Converts a gate fault into a synthetic critical failure.
#[must_use]
pub fn fault_result(gate: &Gate, fault: &GateFault) -> GateResult {
    GateResult {
        gate_name: gate.kind().as_str().to_string(),
        passed: false,
        score: 0.0,
        threshold: gate.threshold(),
        severity: GateSeverity::Critical,
        message: format!("gate fault: {fault}"),
        faulted: true,
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bound_boundary_is_inclusive() {
        assert!(Bound::AtMost(0.15).admits(0.15));
        assert!(!Bound::AtMost(0.15).admits(0.16));
        assert!(Bound::AtLeast(0.6).admits(0.6));
        assert!(!Bound::AtLeast(0.6).admits(0.59));
    }

    #[test]
    fn missing_reading_reports_best_value() {
        let result = numeric_result(GateKind::Drift, Bound::AtMost(0.15), &Reading::Missing(0.0));
        assert!(result.passed);
        assert!(result.message.contains("not reported"));
    }
}
