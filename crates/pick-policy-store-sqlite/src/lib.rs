// crates/pick-policy-store-sqlite/src/lib.rs
// ============================================================================
// Module: SQLite Policy Store
// Description: Durable HardStopStore and AuditStore backends using SQLite WAL.
// Purpose: Persist the hard-stop latch and its audit trail across restarts.
// Dependencies: pick-policy-core, rusqlite
// ============================================================================

//! ## Overview
//! This crate provides a SQLite-backed [`pick_policy_core::HardStopStore`]
//! that persists canonical hard-stop snapshots in a versioned table, and an
//! append-only [`pick_policy_core::AuditStore`] whose rows are hash-chained so
//! tampering is detectable. Loads verify stored hashes and fail closed.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use store::AuditChainReport;
pub use store::AuditRecord;
pub use store::GENESIS_HASH;
pub use store::MAX_STATE_BYTES;
pub use store::SqlitePolicyStore;
pub use store::SqliteStoreConfig;
pub use store::SqliteStoreError;
pub use store::SqliteStoreMode;
pub use store::SqliteSyncMode;
