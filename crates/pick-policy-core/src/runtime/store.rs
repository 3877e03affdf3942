// crates/pick-policy-core/src/runtime/store.rs
// ============================================================================
// Module: Pick Policy In-Memory Stores
// Description: In-memory hard-stop and audit stores for tests and local runs.
// Purpose: Provide deterministic store implementations without external deps.
// Dependencies: crate::core, crate::interfaces
// ============================================================================

//! ## Overview
//! This module provides simple in-memory implementations of
//! [`HardStopStore`] and [`AuditStore`] for tests and local demos. State does
//! not survive process restarts; use the SQLite store for durability.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::sync::Mutex;

use crate::core::AuditLogEntry;
use crate::core::HardStopState;
use crate::interfaces::AuditError;
use crate::interfaces::AuditStore;
use crate::interfaces::HardStopStore;
use crate::interfaces::StoreError;

// ============================================================================
// SECTION: Hard-Stop Store
// ============================================================================

/// In-memory hard-stop store for tests and examples.
#[derive(Debug, Default, Clone)]
pub struct InMemoryHardStopStore {
    /// Latest snapshot protected by a mutex.
    state: Arc<Mutex<Option<HardStopState>>>,
    /// Number of successful saves.
    saves: Arc<Mutex<u64>>,
}

impl InMemoryHardStopStore {
    /// Creates an empty in-memory hard-stop store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-seeded with a snapshot.
    #[must_use]
    pub fn with_state(state: HardStopState) -> Self {
        Self {
            state: Arc::new(Mutex::new(Some(state))),
            saves: Arc::new(Mutex::new(0)),
        }
    }

    /// Returns the number of successful saves.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store mutex is poisoned.
    pub fn save_count(&self) -> Result<u64, StoreError> {
        self.saves
            .lock()
            .map(|guard| *guard)
            .map_err(|_| StoreError::Store("hard-stop store mutex poisoned".to_string()))
    }
}

impl HardStopStore for InMemoryHardStopStore {
    fn load(&self) -> Result<Option<HardStopState>, StoreError> {
        let guard = self
            .state
            .lock()
            .map_err(|_| StoreError::Store("hard-stop store mutex poisoned".to_string()))?;
        Ok(guard.clone())
    }

    fn save(&self, state: &HardStopState) -> Result<(), StoreError> {
        *self
            .state
            .lock()
            .map_err(|_| StoreError::Store("hard-stop store mutex poisoned".to_string()))? =
            Some(state.clone());
        let mut saves = self
            .saves
            .lock()
            .map_err(|_| StoreError::Store("hard-stop store mutex poisoned".to_string()))?;
        *saves = saves.saturating_add(1);
        drop(saves);
        Ok(())
    }
}

// ============================================================================
// SECTION: Audit Store
// ============================================================================

/// In-memory append-only audit store for tests and examples.
#[derive(Debug, Default, Clone)]
pub struct InMemoryAuditStore {
    /// Appended entries in order.
    entries: Arc<Mutex<Vec<AuditLogEntry>>>,
}

impl InMemoryAuditStore {
    /// Creates an empty in-memory audit store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of all appended entries in order.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError`] when the store mutex is poisoned.
    pub fn entries(&self) -> Result<Vec<AuditLogEntry>, AuditError> {
        self.entries
            .lock()
            .map(|guard| guard.clone())
            .map_err(|_| AuditError::Unavailable("audit store mutex poisoned".to_string()))
    }
}

impl AuditStore for InMemoryAuditStore {
    fn append(&self, entry: &AuditLogEntry) -> Result<(), AuditError> {
        self.entries
            .lock()
            .map_err(|_| AuditError::Unavailable("audit store mutex poisoned".to_string()))?
            .push(entry.clone());
        Ok(())
    }
}
