// crates/pick-policy-store-sqlite/src/store.rs
// ============================================================================
// Module: SQLite Policy Store
// Description: Durable hard-stop snapshots, transitions, and hash-chained audit rows.
// Purpose: Persist latch transitions and audit entries with integrity checks.
// Dependencies: pick-policy-core, rusqlite, serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! Each hard-stop save produces a canonical JSON snapshot of the latch fields
//! stored in an append-only version table. Transition history lives in its own
//! table with one hashed row per transition, so a save only writes the
//! transitions the store has not seen and snapshot size stays flat no matter
//! how many trigger/reset cycles have run. Loads verify every stored hash,
//! rebuild history from the transition rows, and fail closed on corruption or
//! sequence gaps. Audit entries are appended to a second table where every row
//! stores the hash of its predecessor, so edits and deletions break the chain
//! and are reported by [`SqlitePolicyStore::verify_audit_chain`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use pick_policy_core::AuditError;
use pick_policy_core::AuditLogEntry;
use pick_policy_core::AuditStore;
use pick_policy_core::HardStopState;
use pick_policy_core::HardStopStore;
use pick_policy_core::StateTransition;
use pick_policy_core::StoreError;
use pick_policy_core::hashing::DEFAULT_HASH_ALGORITHM;
use pick_policy_core::hashing::HashAlgorithm;
use pick_policy_core::hashing::canonical_json_bytes;
use rusqlite::Connection;
use rusqlite::OpenFlags;
use rusqlite::OptionalExtension;
use rusqlite::params;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// `SQLite` schema version for the store.
const SCHEMA_VERSION: i64 = 1;
/// Default busy timeout (ms).
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Maximum payload size of any single row accepted by the store.
pub const MAX_STATE_BYTES: usize = 1024 * 1024;
/// Predecessor hash recorded on the first audit row.
pub const GENESIS_HASH: &str = "0000000000000000000000000000000000000000000000000000000000000000";

// ============================================================================
// SECTION: Config
// ============================================================================

/// `SQLite` journal mode configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteStoreMode {
    /// WAL journal mode (recommended).
    #[default]
    Wal,
    /// Delete journal mode (legacy).
    Delete,
}

impl SqliteStoreMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Wal => "wal",
            Self::Delete => "delete",
        }
    }
}

/// `SQLite` sync mode configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteSyncMode {
    /// Full synchronous mode (safest).
    #[default]
    Full,
    /// Normal synchronous mode (balanced).
    Normal,
}

impl SqliteSyncMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Normal => "normal",
        }
    }
}

/// Configuration for the `SQLite` policy store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SqliteStoreConfig {
    /// Path to the `SQLite` database file.
    pub path: PathBuf,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: SqliteStoreMode,
    /// `SQLite` sync mode.
    #[serde(default)]
    pub sync_mode: SqliteSyncMode,
    /// Optional maximum hard-stop snapshot versions (older versions pruned).
    #[serde(default)]
    pub max_versions: Option<u64>,
}

impl SqliteStoreConfig {
    /// Creates a configuration with default pragmas for the given path.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            journal_mode: SqliteStoreMode::default(),
            sync_mode: SqliteSyncMode::default(),
            max_versions: None,
        }
    }
}

/// Returns the default busy timeout for `SQLite` connections.
const fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// `SQLite` store errors.
#[derive(Debug, Error)]
pub enum SqliteStoreError {
    /// Store I/O error.
    #[error("sqlite store io error: {0}")]
    Io(String),
    /// `SQLite` engine error.
    #[error("sqlite store db error: {0}")]
    Db(String),
    /// Store corruption or hash mismatch.
    #[error("sqlite store corruption: {0}")]
    Corrupt(String),
    /// Store schema version mismatch.
    #[error("sqlite store version mismatch: {0}")]
    VersionMismatch(String),
    /// Invalid store data.
    #[error("sqlite store invalid data: {0}")]
    Invalid(String),
    /// Store payload exceeded configured size limits.
    #[error("sqlite store payload too large: {actual_bytes} bytes (max {max_bytes})")]
    TooLarge {
        /// Maximum allowed bytes.
        max_bytes: usize,
        /// Actual payload size in bytes.
        actual_bytes: usize,
    },
}

impl From<SqliteStoreError> for StoreError {
    fn from(error: SqliteStoreError) -> Self {
        match error {
            SqliteStoreError::Io(message) => Self::Io(message),
            SqliteStoreError::Db(message) => Self::Store(message),
            SqliteStoreError::Corrupt(message) => Self::Corrupt(message),
            SqliteStoreError::VersionMismatch(message) => Self::VersionMismatch(message),
            SqliteStoreError::Invalid(message) => Self::Invalid(message),
            SqliteStoreError::TooLarge {
                max_bytes,
                actual_bytes,
            } => Self::Invalid(format!(
                "state_json exceeds size limit: {actual_bytes} bytes (max {max_bytes})"
            )),
        }
    }
}

impl From<SqliteStoreError> for AuditError {
    fn from(error: SqliteStoreError) -> Self {
        match error {
            SqliteStoreError::Io(_) | SqliteStoreError::Db(_) => {
                Self::Unavailable(error.to_string())
            }
            SqliteStoreError::Corrupt(_)
            | SqliteStoreError::VersionMismatch(_)
            | SqliteStoreError::Invalid(_)
            | SqliteStoreError::TooLarge {
                ..
            } => Self::Rejected(error.to_string()),
        }
    }
}

// ============================================================================
// SECTION: Audit Records
// ============================================================================

/// Audit row as read back from the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditRecord {
    /// Row sequence number (starts at 1).
    pub sequence: i64,
    /// Decoded audit entry.
    pub entry: AuditLogEntry,
    /// Chain hash of this row.
    pub entry_hash: String,
    /// Chain hash of the preceding row.
    pub prev_hash: String,
    /// Wall-clock append time in unix milliseconds.
    pub recorded_at_ms: i64,
}

/// Result of recomputing the audit hash chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditChainReport {
    /// Rows checked before the first break (or all rows).
    pub checked: u64,
    /// Hash of the last verified row.
    pub head_hash: Option<String>,
    /// Sequence of the first row that fails verification.
    pub broken_at: Option<i64>,
}

impl AuditChainReport {
    /// Returns true when every row verified.
    #[must_use]
    pub const fn is_intact(&self) -> bool {
        self.broken_at.is_none()
    }
}

/// Raw audit row prior to decoding.
struct RawAuditRow {
    /// Row sequence number.
    sequence: i64,
    /// Canonical entry JSON.
    entry_json: Vec<u8>,
    /// Stored chain hash.
    entry_hash: String,
    /// Stored predecessor hash.
    prev_hash: String,
    /// Stored hash algorithm label.
    hash_algorithm: String,
    /// Append time.
    recorded_at: i64,
}

// ============================================================================
// SECTION: Store
// ============================================================================

/// `SQLite`-backed hard-stop and audit store with WAL support.
#[derive(Clone)]
pub struct SqlitePolicyStore {
    /// Store configuration.
    config: SqliteStoreConfig,
    /// Shared `SQLite` connection guarded by a mutex.
    connection: Arc<Mutex<Connection>>,
}

impl SqlitePolicyStore {
    /// Opens an `SQLite`-backed policy store.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the database cannot be opened or
    /// initialized.
    pub fn new(config: SqliteStoreConfig) -> Result<Self, SqliteStoreError> {
        validate_store_path(&config.path)?;
        ensure_parent_dir(&config.path)?;
        let mut connection = open_connection(&config)?;
        initialize_schema(&mut connection)?;
        Ok(Self {
            config,
            connection: Arc::new(Mutex::new(connection)),
        })
    }

    /// Returns the store configuration.
    #[must_use]
    pub const fn config(&self) -> &SqliteStoreConfig {
        &self.config
    }
}

impl HardStopStore for SqlitePolicyStore {
    fn load(&self) -> Result<Option<HardStopState>, StoreError> {
        self.load_state().map_err(StoreError::from)
    }

    fn save(&self, state: &HardStopState) -> Result<(), StoreError> {
        self.save_state(state).map_err(StoreError::from)
    }
}

impl AuditStore for SqlitePolicyStore {
    fn append(&self, entry: &AuditLogEntry) -> Result<(), AuditError> {
        self.append_entry(entry).map_err(AuditError::from)
    }
}

impl SqlitePolicyStore {
    /// Loads the latest hard-stop snapshot.
    fn load_state(&self) -> Result<Option<HardStopState>, SqliteStoreError> {
        let row = {
            let mut guard = self
                .connection
                .lock()
                .map_err(|_| SqliteStoreError::Db("mutex poisoned".to_string()))?;
            let tx = guard.transaction().map_err(|err| SqliteStoreError::Db(err.to_string()))?;
            let metadata = tx
                .query_row(
                    "SELECT version, length(state_json), state_hash, hash_algorithm FROM \
                     hard_stop_versions ORDER BY version DESC LIMIT 1",
                    params![],
                    |row| {
                        let version: i64 = row.get(0)?;
                        let length: i64 = row.get(1)?;
                        let hash: String = row.get(2)?;
                        let algorithm: String = row.get(3)?;
                        Ok((version, length, hash, algorithm))
                    },
                )
                .optional()
                .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
            let row = if let Some((version, length, hash, algorithm)) = metadata {
                let length_usize = usize::try_from(length).map_err(|_| {
                    SqliteStoreError::Invalid(format!(
                        "negative hard-stop state length at version {version}"
                    ))
                })?;
                if length_usize > MAX_STATE_BYTES {
                    return Err(SqliteStoreError::TooLarge {
                        max_bytes: MAX_STATE_BYTES,
                        actual_bytes: length_usize,
                    });
                }
                let bytes: Vec<u8> = tx
                    .query_row(
                        "SELECT state_json FROM hard_stop_versions WHERE version = ?1",
                        params![version],
                        |row| row.get(0),
                    )
                    .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
                let transitions = read_transition_rows(&tx)?;
                Some((version, bytes, hash, algorithm, transitions))
            } else {
                None
            };
            tx.commit().map_err(|err| SqliteStoreError::Db(err.to_string()))?;
            drop(guard);
            row
        };
        let Some((version, bytes, hash_value, hash_algorithm, transitions)) = row else {
            return Ok(None);
        };
        let algorithm = parse_hash_algorithm(&hash_algorithm)?;
        if !algorithm.verify(&bytes, &hash_value) {
            return Err(SqliteStoreError::Corrupt(format!(
                "hash mismatch for hard-stop state version {version}"
            )));
        }
        let mut state: HardStopState = serde_json::from_slice(&bytes)
            .map_err(|err| SqliteStoreError::Invalid(err.to_string()))?;
        state.history = decode_transitions(transitions)?;
        Ok(Some(state))
    }

    /// Saves the latch fields as the next version and appends unseen transitions.
    fn save_state(&self, state: &HardStopState) -> Result<(), SqliteStoreError> {
        let canonical_json = canonical_json_bytes(&latch_fields(state))
            .map_err(|err| SqliteStoreError::Invalid(err.to_string()))?;
        if canonical_json.len() > MAX_STATE_BYTES {
            return Err(SqliteStoreError::TooLarge {
                max_bytes: MAX_STATE_BYTES,
                actual_bytes: canonical_json.len(),
            });
        }
        let digest = DEFAULT_HASH_ALGORITHM.digest(&canonical_json);
        let saved_at = unix_millis();
        let mut guard = self
            .connection
            .lock()
            .map_err(|_| SqliteStoreError::Db("mutex poisoned".to_string()))?;
        let tx = guard.transaction().map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        let latest_version: Option<i64> = tx
            .query_row("SELECT MAX(version) FROM hard_stop_versions", params![], |row| row.get(0))
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        let next_version = match latest_version {
            None => 1,
            Some(value) if value < 1 => {
                return Err(SqliteStoreError::Corrupt(format!(
                    "invalid hard-stop state version {value}"
                )));
            }
            Some(value) => value.checked_add(1).ok_or_else(|| {
                SqliteStoreError::Corrupt("hard-stop state version overflow".to_string())
            })?,
        };
        tx.execute(
            "INSERT INTO hard_stop_versions (version, state_json, state_hash, hash_algorithm, \
             saved_at) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                next_version,
                canonical_json,
                digest.value,
                digest.algorithm.label(),
                saved_at
            ],
        )
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        append_new_transitions(&tx, &state.history, saved_at)?;
        enforce_retention(&tx, next_version, self.config.max_versions)?;
        tx.commit().map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        drop(guard);
        Ok(())
    }

    /// Appends an audit entry linked to the current chain head.
    fn append_entry(&self, entry: &AuditLogEntry) -> Result<(), SqliteStoreError> {
        let entry_json = canonical_json_bytes(entry)
            .map_err(|err| SqliteStoreError::Invalid(err.to_string()))?;
        if entry_json.len() > MAX_STATE_BYTES {
            return Err(SqliteStoreError::TooLarge {
                max_bytes: MAX_STATE_BYTES,
                actual_bytes: entry_json.len(),
            });
        }
        let recorded_at = unix_millis();
        let mut guard = self
            .connection
            .lock()
            .map_err(|_| SqliteStoreError::Db("mutex poisoned".to_string()))?;
        let tx = guard.transaction().map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        let prev_hash: String = tx
            .query_row("SELECT entry_hash FROM audit_log ORDER BY seq DESC LIMIT 1", params![], |row| {
                row.get(0)
            })
            .optional()
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?
            .unwrap_or_else(|| GENESIS_HASH.to_string());
        let entry_hash = chain_hash(DEFAULT_HASH_ALGORITHM, &prev_hash, &entry_json);
        tx.execute(
            "INSERT INTO audit_log (entry_json, entry_hash, prev_hash, hash_algorithm, \
             recorded_at) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                entry_json,
                entry_hash,
                prev_hash,
                DEFAULT_HASH_ALGORITHM.label(),
                recorded_at
            ],
        )
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        tx.commit().map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        drop(guard);
        Ok(())
    }

    /// Lists the most recent audit records in append order.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when rows cannot be read or decoded.
    pub fn list_audit_entries(&self, limit: usize) -> Result<Vec<AuditRecord>, SqliteStoreError> {
        if limit == 0 {
            return Err(SqliteStoreError::Invalid(
                "audit list limit must be greater than zero".to_string(),
            ));
        }
        let limit = i64::try_from(limit)
            .map_err(|_| SqliteStoreError::Invalid("audit list limit too large".to_string()))?;
        let mut rows = self.read_audit_rows(
            "SELECT seq, entry_json, entry_hash, prev_hash, hash_algorithm, recorded_at FROM \
             audit_log ORDER BY seq DESC LIMIT ?1",
            Some(limit),
        )?;
        rows.reverse();
        rows.into_iter()
            .map(|row| {
                let entry: AuditLogEntry = serde_json::from_slice(&row.entry_json)
                    .map_err(|err| SqliteStoreError::Invalid(err.to_string()))?;
                Ok(AuditRecord {
                    sequence: row.sequence,
                    entry,
                    entry_hash: row.entry_hash,
                    prev_hash: row.prev_hash,
                    recorded_at_ms: row.recorded_at,
                })
            })
            .collect()
    }

    /// Recomputes the audit hash chain from the first row.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when rows cannot be read.
    pub fn verify_audit_chain(&self) -> Result<AuditChainReport, SqliteStoreError> {
        let rows = self.read_audit_rows(
            "SELECT seq, entry_json, entry_hash, prev_hash, hash_algorithm, recorded_at FROM \
             audit_log ORDER BY seq ASC",
            None,
        )?;
        let mut expected_prev = GENESIS_HASH.to_string();
        let mut checked = 0u64;
        let mut head_hash = None;
        for row in rows {
            let intact = row.prev_hash == expected_prev
                && HashAlgorithm::from_label(&row.hash_algorithm).is_some_and(|algorithm| {
                    chain_hash(algorithm, &row.prev_hash, &row.entry_json) == row.entry_hash
                });
            if !intact {
                return Ok(AuditChainReport {
                    checked,
                    head_hash,
                    broken_at: Some(row.sequence),
                });
            }
            checked = checked.saturating_add(1);
            expected_prev.clone_from(&row.entry_hash);
            head_hash = Some(row.entry_hash);
        }
        Ok(AuditChainReport {
            checked,
            head_hash,
            broken_at: None,
        })
    }

    /// Returns the number of stored hard-stop transitions.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the count cannot be read.
    pub fn hard_stop_transition_count(&self) -> Result<u64, SqliteStoreError> {
        let guard = self
            .connection
            .lock()
            .map_err(|_| SqliteStoreError::Db("mutex poisoned".to_string()))?;
        let count: i64 = guard
            .query_row("SELECT COUNT(*) FROM hard_stop_transitions", params![], |row| row.get(0))
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        drop(guard);
        u64::try_from(count).map_err(|_| SqliteStoreError::Corrupt("negative row count".to_string()))
    }

    /// Returns the number of retained hard-stop snapshot versions.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the count cannot be read.
    pub fn hard_stop_version_count(&self) -> Result<u64, SqliteStoreError> {
        let guard = self
            .connection
            .lock()
            .map_err(|_| SqliteStoreError::Db("mutex poisoned".to_string()))?;
        let count: i64 = guard
            .query_row("SELECT COUNT(*) FROM hard_stop_versions", params![], |row| row.get(0))
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        drop(guard);
        u64::try_from(count).map_err(|_| SqliteStoreError::Corrupt("negative row count".to_string()))
    }

    /// Reads raw audit rows with an optional limit parameter.
    fn read_audit_rows(
        &self,
        sql: &str,
        limit: Option<i64>,
    ) -> Result<Vec<RawAuditRow>, SqliteStoreError> {
        let guard = self
            .connection
            .lock()
            .map_err(|_| SqliteStoreError::Db("mutex poisoned".to_string()))?;
        let mut statement =
            guard.prepare(sql).map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        let map_row = |row: &rusqlite::Row<'_>| -> rusqlite::Result<RawAuditRow> {
            Ok(RawAuditRow {
                sequence: row.get(0)?,
                entry_json: row.get(1)?,
                entry_hash: row.get(2)?,
                prev_hash: row.get(3)?,
                hash_algorithm: row.get(4)?,
                recorded_at: row.get(5)?,
            })
        };
        let rows = match limit {
            Some(limit) => statement
                .query_map(params![limit], map_row)
                .and_then(|rows| rows.collect::<Result<Vec<_>, _>>()),
            None => statement
                .query_map(params![], map_row)
                .and_then(|rows| rows.collect::<Result<Vec<_>, _>>()),
        }
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        drop(statement);
        drop(guard);
        Ok(rows)
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Returns the state without its history; transitions are stored as rows.
fn latch_fields(state: &HardStopState) -> HardStopState {
    HardStopState {
        active: state.active,
        triggered_at: state.triggered_at,
        cause: state.cause.clone(),
        triggered_by_gate: state.triggered_by_gate,
        trigger_trace_id: state.trigger_trace_id.clone(),
        affected_count: state.affected_count,
        history: Vec::new(),
    }
}

/// Raw transition row: sequence, canonical JSON, hash, and algorithm label.
type RawTransitionRow = (i64, Vec<u8>, String, String);

/// Reads every transition row in sequence order.
fn read_transition_rows(
    tx: &rusqlite::Transaction<'_>,
) -> Result<Vec<RawTransitionRow>, SqliteStoreError> {
    let mut statement = tx
        .prepare(
            "SELECT sequence, transition_json, transition_hash, hash_algorithm FROM \
             hard_stop_transitions ORDER BY sequence ASC",
        )
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    let rows: Vec<RawTransitionRow> = statement
        .query_map(params![], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)))
        .and_then(|rows| rows.collect::<Result<Vec<_>, _>>())
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    drop(statement);
    Ok(rows)
}

/// Verifies and decodes transition rows into a gap-free history.
fn decode_transitions(
    rows: Vec<RawTransitionRow>,
) -> Result<Vec<StateTransition>, SqliteStoreError> {
    let mut history = Vec::with_capacity(rows.len());
    for (expected, (sequence, bytes, hash_value, hash_algorithm)) in (1_i64..).zip(rows) {
        if sequence != expected {
            return Err(SqliteStoreError::Corrupt(format!(
                "hard-stop transition gap: expected sequence {expected}, found {sequence}"
            )));
        }
        let algorithm = parse_hash_algorithm(&hash_algorithm)?;
        if !algorithm.verify(&bytes, &hash_value) {
            return Err(SqliteStoreError::Corrupt(format!(
                "hash mismatch for hard-stop transition {sequence}"
            )));
        }
        let transition: StateTransition = serde_json::from_slice(&bytes)
            .map_err(|err| SqliteStoreError::Invalid(err.to_string()))?;
        if i64::try_from(transition.sequence).ok() != Some(sequence) {
            return Err(SqliteStoreError::Corrupt(format!(
                "hard-stop transition row {sequence} holds sequence {}",
                transition.sequence
            )));
        }
        history.push(transition);
    }
    Ok(history)
}

/// Inserts transitions newer than the highest stored sequence.
fn append_new_transitions(
    tx: &rusqlite::Transaction<'_>,
    history: &[StateTransition],
    saved_at: i64,
) -> Result<(), SqliteStoreError> {
    let stored: Option<i64> = tx
        .query_row("SELECT MAX(sequence) FROM hard_stop_transitions", params![], |row| row.get(0))
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    let stored = u64::try_from(stored.unwrap_or(0)).map_err(|_| {
        SqliteStoreError::Corrupt("negative hard-stop transition sequence".to_string())
    })?;
    for transition in history.iter().filter(|transition| transition.sequence > stored) {
        let bytes = canonical_json_bytes(transition)
            .map_err(|err| SqliteStoreError::Invalid(err.to_string()))?;
        if bytes.len() > MAX_STATE_BYTES {
            return Err(SqliteStoreError::TooLarge {
                max_bytes: MAX_STATE_BYTES,
                actual_bytes: bytes.len(),
            });
        }
        let sequence = i64::try_from(transition.sequence).map_err(|_| {
            SqliteStoreError::Invalid("hard-stop transition sequence too large".to_string())
        })?;
        let digest = DEFAULT_HASH_ALGORITHM.digest(&bytes);
        tx.execute(
            "INSERT INTO hard_stop_transitions (sequence, transition_json, transition_hash, \
             hash_algorithm, saved_at) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![sequence, bytes, digest.value, digest.algorithm.label(), saved_at],
        )
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    }
    Ok(())
}

/// Computes the chain hash linking an entry to its predecessor.
fn chain_hash(algorithm: HashAlgorithm, prev_hash: &str, entry_json: &[u8]) -> String {
    let mut material = Vec::with_capacity(prev_hash.len() + 1 + entry_json.len());
    material.extend_from_slice(prev_hash.as_bytes());
    material.push(b'\n');
    material.extend_from_slice(entry_json);
    algorithm.digest(&material).value
}

/// Ensures the parent directory for the store exists.
fn ensure_parent_dir(path: &Path) -> Result<(), SqliteStoreError> {
    let Some(parent) = path.parent() else {
        return Err(SqliteStoreError::Io("store path missing parent directory".to_string()));
    };
    if parent.as_os_str().is_empty() {
        return Ok(());
    }
    std::fs::create_dir_all(parent).map_err(|err| SqliteStoreError::Io(err.to_string()))
}

/// Validates store paths for safety limits.
fn validate_store_path(path: &Path) -> Result<(), SqliteStoreError> {
    let path_string = path.display().to_string();
    if path_string.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(SqliteStoreError::Invalid("store path exceeds length limit".to_string()));
    }
    for component in path.components() {
        let name = component.as_os_str().to_string_lossy();
        if name.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(SqliteStoreError::Invalid(
                "store path contains an overlong component".to_string(),
            ));
        }
    }
    if path.exists() && path.is_dir() {
        return Err(SqliteStoreError::Invalid(
            "store path must be a file, not a directory".to_string(),
        ));
    }
    Ok(())
}

/// Opens an `SQLite` connection with secure defaults.
fn open_connection(config: &SqliteStoreConfig) -> Result<Connection, SqliteStoreError> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_FULL_MUTEX;
    let connection = Connection::open_with_flags(&config.path, flags)
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    apply_pragmas(&connection, config)?;
    Ok(connection)
}

/// Applies `SQLite` pragmas required for durability.
fn apply_pragmas(
    connection: &Connection,
    config: &SqliteStoreConfig,
) -> Result<(), SqliteStoreError> {
    connection
        .execute_batch(&format!("PRAGMA journal_mode = {};", config.journal_mode.pragma_value()))
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    connection
        .execute_batch(&format!("PRAGMA synchronous = {};", config.sync_mode.pragma_value()))
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    connection
        .busy_timeout(std::time::Duration::from_millis(config.busy_timeout_ms))
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    Ok(())
}

/// Initializes the `SQLite` schema or validates the existing version.
fn initialize_schema(connection: &mut Connection) -> Result<(), SqliteStoreError> {
    let tx = connection.transaction().map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    tx.execute_batch("CREATE TABLE IF NOT EXISTS store_meta (version INTEGER NOT NULL);")
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    let version: Option<i64> = tx
        .query_row("SELECT version FROM store_meta LIMIT 1", params![], |row| row.get(0))
        .optional()
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    match version {
        None => {
            tx.execute("INSERT INTO store_meta (version) VALUES (?1)", params![SCHEMA_VERSION])
                .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
            tx.execute_batch(
                "CREATE TABLE IF NOT EXISTS hard_stop_versions (
                    version INTEGER PRIMARY KEY,
                    state_json BLOB NOT NULL,
                    state_hash TEXT NOT NULL,
                    hash_algorithm TEXT NOT NULL,
                    saved_at INTEGER NOT NULL
                );
                CREATE TABLE IF NOT EXISTS hard_stop_transitions (
                    sequence INTEGER PRIMARY KEY,
                    transition_json BLOB NOT NULL,
                    transition_hash TEXT NOT NULL,
                    hash_algorithm TEXT NOT NULL,
                    saved_at INTEGER NOT NULL
                );
                CREATE TABLE IF NOT EXISTS audit_log (
                    seq INTEGER PRIMARY KEY AUTOINCREMENT,
                    entry_json BLOB NOT NULL,
                    entry_hash TEXT NOT NULL,
                    prev_hash TEXT NOT NULL,
                    hash_algorithm TEXT NOT NULL,
                    recorded_at INTEGER NOT NULL
                );",
            )
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        }
        Some(value) if value == SCHEMA_VERSION => {}
        Some(value) => {
            return Err(SqliteStoreError::VersionMismatch(format!(
                "unsupported schema version: {value}"
            )));
        }
    }
    tx.commit().map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    Ok(())
}

/// Enforces snapshot retention if configured.
fn enforce_retention(
    tx: &rusqlite::Transaction<'_>,
    latest_version: i64,
    max_versions: Option<u64>,
) -> Result<(), SqliteStoreError> {
    let Some(max_versions) = max_versions else {
        return Ok(());
    };
    if max_versions == 0 {
        return Err(SqliteStoreError::Invalid(
            "max_versions must be greater than zero".to_string(),
        ));
    }
    let max_versions = i64::try_from(max_versions)
        .map_err(|_| SqliteStoreError::Invalid("max_versions too large".to_string()))?;
    if latest_version > max_versions {
        let min_version = latest_version - max_versions + 1;
        tx.execute("DELETE FROM hard_stop_versions WHERE version < ?1", params![min_version])
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    }
    Ok(())
}

/// Returns the current unix epoch in milliseconds.
fn unix_millis() -> i64 {
    let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default();
    i64::try_from(now.as_millis()).unwrap_or(i64::MAX)
}

/// Parses a stored hash algorithm label.
fn parse_hash_algorithm(label: &str) -> Result<HashAlgorithm, SqliteStoreError> {
    HashAlgorithm::from_label(label)
        .ok_or_else(|| SqliteStoreError::Invalid(format!("unsupported hash algorithm: {label}")))
}
