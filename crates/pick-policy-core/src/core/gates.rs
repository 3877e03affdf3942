// crates/pick-policy-core/src/core/gates.rs
// ============================================================================
// Module: Pick Policy Gate Types
// Description: Gate kinds, gate configuration variants, and gate results.
// Purpose: Define the closed set of gates and the verdict each one produces.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Gate configuration is a closed tagged-variant set: one variant per gate
//! kind, validated when the engine is built rather than when predictions are
//! evaluated. Severity is a static property of the gate kind, never of the
//! measured value.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use crate::core::policy::PolicyConfigError;

// ============================================================================
// SECTION: Severity
// ============================================================================

/// Severity of a gate failure.
///
/// # Invariants
/// - `Warning` failures degrade a decision to `NO_BET`.
/// - `Critical` failures force `HARD_STOP` and trigger the hard-stop latch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateSeverity {
    /// Degrades the decision to `NO_BET`.
    Warning,
    /// Forces `HARD_STOP`.
    Critical,
}

impl GateSeverity {
    /// Returns a stable label for the severity.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Warning => "warning",
            Self::Critical => "critical",
        }
    }
}

// ============================================================================
// SECTION: Gate Kind
// ============================================================================

/// Gate kinds supported by the policy engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateKind {
    /// Minimum model confidence.
    Confidence,
    /// Maximum feature drift score.
    Drift,
    /// Maximum calibration error.
    CalibrationError,
    /// Maximum input data age.
    DataFreshness,
    /// Allow-listed model versions.
    ModelVersion,
    /// Minimum data-quality score (safety gate).
    DataQuality,
    /// Explicit upstream kill switch (safety gate).
    KillSwitch,
}

impl GateKind {
    /// Returns the stable gate name used in results and rationales.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Confidence => "confidence",
            Self::Drift => "drift",
            Self::CalibrationError => "calibration_error",
            Self::DataFreshness => "data_freshness",
            Self::ModelVersion => "model_version",
            Self::DataQuality => "data_quality",
            Self::KillSwitch => "kill_switch",
        }
    }

    /// Returns the static severity for this gate kind.
    #[must_use]
    pub const fn severity(self) -> GateSeverity {
        match self {
            Self::Confidence
            | Self::Drift
            | Self::CalibrationError
            | Self::DataFreshness
            | Self::ModelVersion => GateSeverity::Warning,
            Self::DataQuality | Self::KillSwitch => GateSeverity::Critical,
        }
    }
}

impl fmt::Display for GateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Gate Configuration
// ============================================================================

/// Configuration record for one gate.
///
/// # Invariants
/// - Exactly one variant per [`GateKind`].
/// - Thresholds are finite; ranges are enforced by [`GateConfig::validate`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GateConfig {
    /// Confidence must be at least `min_confidence`.
    Confidence {
        /// Minimum accepted confidence in `[0, 1]`.
        min_confidence: f64,
    },
    /// Drift score must be at most `max_drift_score`.
    Drift {
        /// Maximum accepted drift score (non-negative).
        max_drift_score: f64,
    },
    /// Calibration error must be at most `max_calibration_error`.
    CalibrationError {
        /// Maximum accepted calibration error in `[0, 1]`.
        max_calibration_error: f64,
    },
    /// Input data must be at most `max_age_hours` old.
    DataFreshness {
        /// Maximum accepted data age in hours (positive).
        max_age_hours: f64,
    },
    /// Model version must appear in `allowed_versions`.
    ModelVersion {
        /// Allowed model versions (non-empty).
        allowed_versions: Vec<String>,
    },
    /// Data-quality score must be at least `min_quality_score`.
    DataQuality {
        /// Minimum accepted data-quality score in `[0, 1]`.
        min_quality_score: f64,
    },
    /// Kill-switch flag must not be raised.
    KillSwitch,
}

impl GateConfig {
    /// Returns the gate kind for this configuration.
    #[must_use]
    pub const fn kind(&self) -> GateKind {
        match self {
            Self::Confidence {
                ..
            } => GateKind::Confidence,
            Self::Drift {
                ..
            } => GateKind::Drift,
            Self::CalibrationError {
                ..
            } => GateKind::CalibrationError,
            Self::DataFreshness {
                ..
            } => GateKind::DataFreshness,
            Self::ModelVersion {
                ..
            } => GateKind::ModelVersion,
            Self::DataQuality {
                ..
            } => GateKind::DataQuality,
            Self::KillSwitch => GateKind::KillSwitch,
        }
    }

    /// Validates threshold ranges for the gate.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyConfigError::InvalidThreshold`] when a threshold is
    /// non-finite or out of range, and [`PolicyConfigError::InvalidAllowList`]
    /// when a model allow-list is empty or contains blank entries.
    pub fn validate(&self) -> Result<(), PolicyConfigError> {
        match self {
            Self::Confidence {
                min_confidence,
            } => validate_unit_interval(GateKind::Confidence, *min_confidence),
            Self::Drift {
                max_drift_score,
            } => validate_non_negative(GateKind::Drift, *max_drift_score),
            Self::CalibrationError {
                max_calibration_error,
            } => validate_unit_interval(GateKind::CalibrationError, *max_calibration_error),
            Self::DataFreshness {
                max_age_hours,
            } => {
                validate_non_negative(GateKind::DataFreshness, *max_age_hours)?;
                if *max_age_hours == 0.0 {
                    return Err(PolicyConfigError::InvalidThreshold {
                        gate: GateKind::DataFreshness,
                        detail: "max_age_hours must be greater than zero".to_string(),
                    });
                }
                Ok(())
            }
            Self::ModelVersion {
                allowed_versions,
            } => {
                if allowed_versions.is_empty() {
                    return Err(PolicyConfigError::InvalidAllowList(
                        "allowed_versions must be non-empty".to_string(),
                    ));
                }
                if allowed_versions.iter().any(|version| version.trim().is_empty()) {
                    return Err(PolicyConfigError::InvalidAllowList(
                        "allowed_versions entries must be non-empty".to_string(),
                    ));
                }
                Ok(())
            }
            Self::DataQuality {
                min_quality_score,
            } => validate_unit_interval(GateKind::DataQuality, *min_quality_score),
            Self::KillSwitch => Ok(()),
        }
    }
}

/// Validates a threshold that must lie in `[0, 1]`.
fn validate_unit_interval(gate: GateKind, value: f64) -> Result<(), PolicyConfigError> {
    if !value.is_finite() || !(0.0..=1.0).contains(&value) {
        return Err(PolicyConfigError::InvalidThreshold {
            gate,
            detail: format!("threshold must be within [0, 1], got {value}"),
        });
    }
    Ok(())
}

/// Validates a threshold that must be finite and non-negative.
fn validate_non_negative(gate: GateKind, value: f64) -> Result<(), PolicyConfigError> {
    if !value.is_finite() || value < 0.0 {
        return Err(PolicyConfigError::InvalidThreshold {
            gate,
            detail: format!("threshold must be finite and non-negative, got {value}"),
        });
    }
    Ok(())
}

// ============================================================================
// SECTION: Gate Result
// ============================================================================

/// Verdict produced by one gate for one prediction.
///
/// # Invariants
/// - Produced fresh per evaluation; never persisted outside an evaluation result.
/// - `faulted == true` implies `passed == false` and `severity == Critical`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateResult {
    /// Gate name (see [`GateKind::as_str`]).
    pub gate_name: String,
    /// Whether the gate passed.
    pub passed: bool,
    /// Measured (or substituted) metric value.
    pub score: f64,
    /// Configured threshold.
    pub threshold: f64,
    /// Gate severity.
    pub severity: GateSeverity,
    /// Human-readable verdict.
    pub message: String,
    /// True when this result was synthesized from a gate fault.
    #[serde(default)]
    pub faulted: bool,
}

impl GateResult {
    /// Returns true when this result is a failure with the given severity.
    #[must_use]
    pub fn failed_with(&self, severity: GateSeverity) -> bool {
        !self.passed && self.severity == severity
    }
}
