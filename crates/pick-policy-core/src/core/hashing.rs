// crates/pick-policy-core/src/core/hashing.rs
// ============================================================================
// Module: Pick Policy Digests
// Description: Canonical JSON encoding and digests for fingerprints and stored rows.
// Purpose: Fingerprint policy configs and let stores detect tampered rows.
// Dependencies: serde, serde_jcs, sha2, thiserror
// ============================================================================

//! ## Overview
//! Policy fingerprints and every persisted snapshot, transition, and audit row
//! are hashed over their RFC 8785 canonical JSON form. Stores keep the
//! algorithm label next to each digest and verify rows against it on read.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt::Write;

use serde::Deserialize;
use serde::Serialize;
use sha2::Digest;
use sha2::Sha256;
use thiserror::Error;

// ============================================================================
// SECTION: Algorithms
// ============================================================================

/// Digest algorithm recorded with every stored hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HashAlgorithm {
    /// SHA-256.
    Sha256,
}

/// Algorithm used for new fingerprints and rows.
pub const DEFAULT_HASH_ALGORITHM: HashAlgorithm = HashAlgorithm::Sha256;

impl HashAlgorithm {
    /// Returns the label persisted next to a digest.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Sha256 => "sha256",
        }
    }

    /// Parses a persisted label; unknown labels yield `None`.
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "sha256" => Some(Self::Sha256),
            _ => None,
        }
    }

    /// Digests raw bytes.
    #[must_use]
    pub fn digest(self, bytes: &[u8]) -> HashDigest {
        let raw = match self {
            Self::Sha256 => Sha256::digest(bytes).to_vec(),
        };
        HashDigest {
            algorithm: self,
            value: to_hex(&raw),
        }
    }

    /// Returns true when `bytes` digest to the stored hex `expected`.
    #[must_use]
    pub fn verify(self, bytes: &[u8], expected: &str) -> bool {
        self.digest(bytes).value == expected
    }
}

/// Hex digest tagged with its algorithm.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HashDigest {
    /// Algorithm that produced `value`.
    pub algorithm: HashAlgorithm,
    /// Lowercase hex digest.
    pub value: String,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Canonical encoding failures.
#[derive(Debug, Error)]
pub enum HashError {
    /// The value could not be serialized to canonical JSON.
    #[error("failed to canonicalize json: {0}")]
    Canonicalization(String),
}

// ============================================================================
// SECTION: Canonical JSON
// ============================================================================

/// Encodes a value as RFC 8785 canonical JSON.
///
/// # Errors
///
/// Returns [`HashError::Canonicalization`] when serialization fails.
pub fn canonical_json_bytes<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, HashError> {
    serde_jcs::to_vec(value).map_err(|err| HashError::Canonicalization(err.to_string()))
}

/// Digests the canonical JSON form of a value.
///
/// # Errors
///
/// Returns [`HashError::Canonicalization`] when serialization fails.
pub fn hash_canonical_json<T: Serialize + ?Sized>(
    algorithm: HashAlgorithm,
    value: &T,
) -> Result<HashDigest, HashError> {
    Ok(algorithm.digest(&canonical_json_bytes(value)?))
}

/// Lowercase hex encoding.
fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().fold(String::with_capacity(bytes.len() * 2), |mut out, byte| {
        let _ = write!(out, "{byte:02x}");
        out
    })
}

// ============================================================================
// SECTION: Tests
// ============================================================================
