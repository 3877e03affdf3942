// crates/pick-policy-config/src/lib.rs
// ============================================================================
// Module: Pick Policy Config Library
// Description: Canonical config model and validation for pick-policy.toml.
// Purpose: Single source of truth for service, store, and gate settings.
// Dependencies: pick-policy-core, pick-policy-store-sqlite, serde, toml
// ============================================================================

//! ## Overview
//! `pick-policy-config` defines the configuration model for the pick policy
//! service. Loading is strict and fails closed: oversized files, non-UTF-8
//! content, unknown store settings, and invalid gate thresholds are rejected
//! before any engine is built.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
