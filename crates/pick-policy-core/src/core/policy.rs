// crates/pick-policy-core/src/core/policy.rs
// ============================================================================
// Module: Pick Policy Configuration Model
// Description: Ordered gate configuration and policy-level validation.
// Purpose: Provide a validated, fingerprinted policy configuration for the engine.
// Dependencies: serde, crate::core::{gates, hashing}
// ============================================================================

//! ## Overview
//! A [`PolicyConfig`] is loaded once per engine instance. Changing it requires
//! constructing or explicitly reconfiguring the engine; there is no implicit
//! global mutation. Gates run in the configured order, which is also the order
//! failing-gate messages appear in a rationale.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::gates::GateConfig;
use crate::core::gates::GateKind;
use crate::core::hashing::HashAlgorithm;
use crate::core::hashing::HashDigest;
use crate::core::hashing::HashError;
use crate::core::hashing::hash_canonical_json;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default policy version label.
pub const DEFAULT_POLICY_VERSION: &str = "v1";
/// Maximum length of a policy version label.
const MAX_POLICY_VERSION_LENGTH: usize = 64;
/// Maximum number of model versions per allow-list.
const MAX_ALLOWED_MODEL_VERSIONS: usize = 64;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Policy configuration validation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolicyConfigError {
    /// No gates are configured.
    #[error("policy must configure at least one gate")]
    NoGates,
    /// The same gate kind is configured more than once.
    #[error("gate {0} is configured more than once")]
    DuplicateGate(GateKind),
    /// A gate threshold is out of range.
    #[error("invalid threshold for gate {gate}: {detail}")]
    InvalidThreshold {
        /// Gate kind.
        gate: GateKind,
        /// Validation detail.
        detail: String,
    },
    /// A model version allow-list is invalid.
    #[error("invalid model version allow-list: {0}")]
    InvalidAllowList(String),
    /// The policy version label is invalid.
    #[error("invalid policy version: {0}")]
    InvalidVersion(String),
}

// ============================================================================
// SECTION: Policy Config
// ============================================================================

/// Ordered gate configuration for the policy engine.
///
/// # Invariants
/// - At most one gate per [`GateKind`] once validated.
/// - Gate order is evaluation order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// Policy version label recorded on every decision.
    #[serde(default = "default_policy_version")]
    pub policy_version: String,
    /// Ordered gate configuration.
    #[serde(default = "default_gates")]
    pub gates: Vec<GateConfig>,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            policy_version: default_policy_version(),
            gates: default_gates(),
        }
    }
}

impl PolicyConfig {
    /// Validates the gate set for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyConfigError`] when the policy is invalid.
    pub fn validate(&self) -> Result<(), PolicyConfigError> {
        let version = self.policy_version.trim();
        if version.is_empty() {
            return Err(PolicyConfigError::InvalidVersion(
                "policy_version must be non-empty".to_string(),
            ));
        }
        if version.len() > MAX_POLICY_VERSION_LENGTH {
            return Err(PolicyConfigError::InvalidVersion(
                "policy_version exceeds max length".to_string(),
            ));
        }
        if self.gates.is_empty() {
            return Err(PolicyConfigError::NoGates);
        }
        let mut seen = BTreeSet::new();
        for gate in &self.gates {
            if !seen.insert(gate.kind()) {
                return Err(PolicyConfigError::DuplicateGate(gate.kind()));
            }
            if let GateConfig::ModelVersion {
                allowed_versions,
            } = gate
                && allowed_versions.len() > MAX_ALLOWED_MODEL_VERSIONS
            {
                return Err(PolicyConfigError::InvalidAllowList(
                    "too many allowed_versions entries".to_string(),
                ));
            }
            gate.validate()?;
        }
        Ok(())
    }

    /// Returns the canonical fingerprint of this configuration.
    ///
    /// # Errors
    ///
    /// Returns [`HashError`] when the configuration cannot be canonicalized.
    pub fn fingerprint(&self, algorithm: HashAlgorithm) -> Result<HashDigest, HashError> {
        hash_canonical_json(algorithm, self)
    }
}

/// Returns the default policy version label.
fn default_policy_version() -> String {
    DEFAULT_POLICY_VERSION.to_string()
}

/// Returns the default gate set.
#[must_use]
pub fn default_gates() -> Vec<GateConfig> {
    vec![
        GateConfig::Confidence {
            min_confidence: 0.60,
        },
        GateConfig::Drift {
            max_drift_score: 0.15,
        },
        GateConfig::CalibrationError {
            max_calibration_error: 0.10,
        },
        GateConfig::DataFreshness {
            max_age_hours: 24.0,
        },
        GateConfig::DataQuality {
            min_quality_score: 0.50,
        },
        GateConfig::KillSwitch,
    ]
}
