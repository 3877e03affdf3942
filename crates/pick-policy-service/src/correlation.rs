// crates/pick-policy-service/src/correlation.rs
// ============================================================================
// Module: Trace Correlation
// Description: Sanitization and issuance of trace identifiers.
// Purpose: Correlate evaluations, audit entries, and resets end-to-end.
// Dependencies: pick-policy-core
// ============================================================================

//! ## Overview
//! Caller-supplied trace identifiers are untrusted input. They are trimmed and
//! accepted only when they form a short ASCII token; anything else is rejected
//! rather than rewritten so the caller can see why its identifier was refused.
//! When no identifier is supplied the engine's boot-scoped generator issues
//! one.

use std::fmt;

use pick_policy_core::IdGenerator;
use pick_policy_core::TraceId;

/// Maximum accepted length for caller-supplied trace identifiers.
pub const MAX_TRACE_ID_LENGTH: usize = 128;

/// Typed rejection reason for invalid trace identifiers.
///
/// # Invariants
/// - Variants are stable for audit labeling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceIdRejection {
    /// Input was empty after trimming.
    EmptyAfterTrim,
    /// Input exceeded the maximum length.
    TooLong,
    /// Input contained whitespace after trimming.
    ContainsWhitespace,
    /// Input contained non-ASCII characters.
    NonAscii,
    /// Input contained control or punctuation characters outside the token set.
    ContainsDisallowedChar,
}

impl TraceIdRejection {
    /// Returns a stable label for this rejection reason.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::EmptyAfterTrim => "empty_after_trim",
            Self::TooLong => "too_long",
            Self::ContainsWhitespace => "contains_whitespace",
            Self::NonAscii => "non_ascii",
            Self::ContainsDisallowedChar => "contains_disallowed_char",
        }
    }
}

impl fmt::Display for TraceIdRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Sanitizes a caller-supplied trace identifier.
///
/// Returns `Ok(None)` when no value is provided.
///
/// # Errors
///
/// Returns [`TraceIdRejection`] when the value is empty, too long, or contains
/// characters outside `[A-Za-z0-9._:-]`.
pub fn sanitize_trace_id(value: Option<&str>) -> Result<Option<TraceId>, TraceIdRejection> {
    let Some(value) = value else {
        return Ok(None);
    };
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(TraceIdRejection::EmptyAfterTrim);
    }
    if trimmed.len() > MAX_TRACE_ID_LENGTH {
        return Err(TraceIdRejection::TooLong);
    }
    for ch in trimmed.chars() {
        if !ch.is_ascii() {
            return Err(TraceIdRejection::NonAscii);
        }
        if ch.is_ascii_whitespace() {
            return Err(TraceIdRejection::ContainsWhitespace);
        }
        if !is_trace_char(ch) {
            return Err(TraceIdRejection::ContainsDisallowedChar);
        }
    }
    Ok(Some(TraceId::new(trimmed)))
}

/// Returns the sanitized caller trace id, or issues a new one.
///
/// # Errors
///
/// Returns [`TraceIdRejection`] when a supplied value is invalid.
pub fn resolve_trace_id(
    value: Option<&str>,
    ids: &IdGenerator,
) -> Result<TraceId, TraceIdRejection> {
    Ok(sanitize_trace_id(value)?.unwrap_or_else(|| ids.next_trace_id()))
}

/// Returns true when the character may appear in a trace identifier.
const fn is_trace_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.' | ':')
}

// ============================================================================
// SECTION: Tests
// ============================================================================
