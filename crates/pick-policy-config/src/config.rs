// crates/pick-policy-config/src/config.rs
// ============================================================================
// Module: Pick Policy Configuration
// Description: Configuration loading and validation for the pick policy service.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: pick-policy-core, pick-policy-store-sqlite, serde, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! Every section is optional; omitted sections take the defaults documented on
//! each type. Missing or invalid configuration fails closed: the service never
//! starts with a partially understood policy.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fs;
use std::path::Path;
use std::path::PathBuf;

use pick_policy_core::PolicyConfig;
use pick_policy_store_sqlite::SqliteStoreConfig;
use pick_policy_store_sqlite::SqliteStoreMode;
use pick_policy_store_sqlite::SqliteSyncMode;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
pub const DEFAULT_CONFIG_NAME: &str = "pick-policy.toml";
/// Environment variable used to override the config path.
pub const CONFIG_ENV_VAR: &str = "PICK_POLICY_CONFIG";
/// Maximum configuration file size in bytes.
pub const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Upper bound for audit write attempts.
pub const MAX_AUDIT_ATTEMPTS: u32 = 10;
/// Upper bound for the audit retry backoff in milliseconds.
pub const MAX_AUDIT_RETRY_BACKOFF_MS: u64 = 5_000;
/// Upper bound for parallel evaluations in a batch.
pub const MAX_PARALLEL_EVALUATIONS: usize = 256;

// ============================================================================
// SECTION: Config Model
// ============================================================================

/// Top-level pick policy configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PickPolicyConfig {
    /// Gate configuration and policy version.
    #[serde(default)]
    pub policy: PolicyConfig,
    /// Hard-stop and audit store configuration.
    #[serde(default)]
    pub store: StoreConfig,
    /// Audit write retry configuration.
    #[serde(default)]
    pub audit: AuditConfig,
    /// Operational event sink configuration.
    #[serde(default)]
    pub events: EventsConfig,
    /// Service execution limits.
    #[serde(default)]
    pub service: ServiceConfig,
}

impl PickPolicyConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// Resolution order: explicit `path`, then `PICK_POLICY_CONFIG`, then
    /// `pick-policy.toml` in the working directory.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path)?;
        validate_path(&resolved)?;
        let bytes = fs::read(&resolved).map_err(|err| {
            ConfigError::Io(format!("{}: {err}", resolved.display()))
        })?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        Self::from_toml_str(content)
    }

    /// Parses and validates configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed TOML and
    /// [`ConfigError::Invalid`] when validation fails.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.policy.validate().map_err(|err| ConfigError::Invalid(format!("policy: {err}")))?;
        self.store.validate()?;
        self.audit.validate()?;
        self.events.validate()?;
        self.service.validate()?;
        Ok(())
    }
}

/// Hard-stop and audit store configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Store backend type.
    #[serde(rename = "type", default)]
    pub store_type: StoreType,
    /// `SQLite` database path when using the sqlite backend.
    #[serde(default)]
    pub path: Option<PathBuf>,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_store_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: SqliteStoreMode,
    /// `SQLite` synchronous mode.
    #[serde(default)]
    pub sync_mode: SqliteSyncMode,
    /// Optional max hard-stop snapshots to retain.
    #[serde(default)]
    pub max_versions: Option<u64>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            store_type: StoreType::default(),
            path: None,
            busy_timeout_ms: default_store_busy_timeout_ms(),
            journal_mode: SqliteStoreMode::default(),
            sync_mode: SqliteSyncMode::default(),
            max_versions: None,
        }
    }
}

impl StoreConfig {
    /// Validates store configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        match self.store_type {
            StoreType::Memory => {
                if self.path.is_some() {
                    return Err(ConfigError::Invalid("memory store must not set path".to_string()));
                }
                Ok(())
            }
            StoreType::Sqlite => {
                let path = self
                    .path
                    .as_ref()
                    .ok_or_else(|| ConfigError::Invalid("sqlite store requires path".to_string()))?;
                validate_path_field("store.path", path)?;
                if self.max_versions == Some(0) {
                    return Err(ConfigError::Invalid(
                        "store max_versions must be greater than zero".to_string(),
                    ));
                }
                Ok(())
            }
        }
    }

    /// Returns the `SQLite` settings when the sqlite backend is selected.
    #[must_use]
    pub fn sqlite_config(&self) -> Option<SqliteStoreConfig> {
        match (self.store_type, &self.path) {
            (StoreType::Sqlite, Some(path)) => Some(SqliteStoreConfig {
                path: path.clone(),
                busy_timeout_ms: self.busy_timeout_ms,
                journal_mode: self.journal_mode,
                sync_mode: self.sync_mode,
                max_versions: self.max_versions,
            }),
            _ => None,
        }
    }
}

/// Store backend type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StoreType {
    /// Use the in-memory stores; state is lost on restart.
    #[default]
    Memory,
    /// Use the `SQLite`-backed durable store.
    Sqlite,
}

/// Audit write retry configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditConfig {
    /// Total attempts per audit write, including the first.
    #[serde(default = "default_audit_max_attempts")]
    pub max_attempts: u32,
    /// Base backoff between attempts in milliseconds; doubles per retry.
    #[serde(default = "default_audit_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_audit_max_attempts(),
            retry_backoff_ms: default_audit_retry_backoff_ms(),
        }
    }
}

impl AuditConfig {
    /// Validates audit retry bounds.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_attempts == 0 || self.max_attempts > MAX_AUDIT_ATTEMPTS {
            return Err(ConfigError::Invalid(format!(
                "audit.max_attempts must be between 1 and {MAX_AUDIT_ATTEMPTS}"
            )));
        }
        if self.retry_backoff_ms > MAX_AUDIT_RETRY_BACKOFF_MS {
            return Err(ConfigError::Invalid(format!(
                "audit.retry_backoff_ms must be at most {MAX_AUDIT_RETRY_BACKOFF_MS}"
            )));
        }
        Ok(())
    }
}

/// Operational event sink configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventsConfig {
    /// Sink type.
    #[serde(default)]
    pub sink: EventSinkType,
    /// Output path for the file sink.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl EventsConfig {
    /// Validates sink configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        match (self.sink, &self.path) {
            (EventSinkType::File, None) => {
                Err(ConfigError::Invalid("file event sink requires path".to_string()))
            }
            (EventSinkType::File, Some(path)) => validate_path_field("events.path", path),
            (EventSinkType::Stderr | EventSinkType::None, Some(_)) => Err(ConfigError::Invalid(
                "events.path is only valid for the file sink".to_string(),
            )),
            (EventSinkType::Stderr | EventSinkType::None, None) => Ok(()),
        }
    }
}

/// Event sink type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum EventSinkType {
    /// JSON lines on stderr.
    #[default]
    Stderr,
    /// JSON lines appended to a file.
    File,
    /// Discard events.
    None,
}

/// Service execution limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Maximum evaluations running at once inside a batch.
    #[serde(default = "default_max_parallel_evaluations")]
    pub max_parallel_evaluations: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            max_parallel_evaluations: default_max_parallel_evaluations(),
        }
    }
}

impl ServiceConfig {
    /// Validates execution limits.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_parallel_evaluations == 0
            || self.max_parallel_evaluations > MAX_PARALLEL_EVALUATIONS
        {
            return Err(ConfigError::Invalid(format!(
                "service.max_parallel_evaluations must be between 1 and \
                 {MAX_PARALLEL_EVALUATIONS}"
            )));
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration loading or validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

impl ConfigError {
    /// Returns the stable machine-readable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Io(_) => "CONFIG_IO",
            Self::Parse(_) => "CONFIG_PARSE",
            Self::Invalid(_) => "INVALID_CONFIG",
        }
    }
}

// ============================================================================
// SECTION: Defaults
// ============================================================================

/// Default busy timeout for the `SQLite` store (ms).
const fn default_store_busy_timeout_ms() -> u64 {
    5_000
}

/// Default audit write attempts.
const fn default_audit_max_attempts() -> u32 {
    3
}

/// Default audit retry backoff (ms).
const fn default_audit_retry_backoff_ms() -> u64 {
    50
}

/// Default batch parallelism.
const fn default_max_parallel_evaluations() -> usize {
    8
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from CLI or environment defaults.
fn resolve_path(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(PathBuf::from(env_path));
    }
    Ok(PathBuf::from(DEFAULT_CONFIG_NAME))
}

/// Validates the resolved path against security limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a configured path field against length constraints.
fn validate_path_field(field: &str, path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.trim().is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid(format!("{field} path component too long")));
        }
    }
    Ok(())
}
