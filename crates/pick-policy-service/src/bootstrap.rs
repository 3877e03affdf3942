// crates/pick-policy-service/src/bootstrap.rs
// ============================================================================
// Module: Service Bootstrap
// Description: Build a PolicyService from validated configuration.
// Purpose: Select store backends and event sinks from pick-policy.toml.
// Dependencies: pick-policy-config, pick-policy-core, pick-policy-store-sqlite
// ============================================================================

//! ## Overview
//! The memory backend keeps hard-stop state and audit entries in process; the
//! sqlite backend uses one database for both so a restart restores the latch
//! and keeps the audit chain.

use std::sync::Arc;

use pick_policy_config::ConfigError;
use pick_policy_config::EventSinkType;
use pick_policy_config::EventsConfig;
use pick_policy_config::PickPolicyConfig;
use pick_policy_config::StoreType;
use pick_policy_core::AuditStore;
use pick_policy_core::HardStopStore;
use pick_policy_core::InMemoryAuditStore;
use pick_policy_core::InMemoryHardStopStore;
use pick_policy_store_sqlite::SqlitePolicyStore;

use crate::clock::SystemClock;
use crate::error::ServiceError;
use crate::events::FileEventSink;
use crate::events::NoopEventSink;
use crate::events::PolicyEventSink;
use crate::events::StderrEventSink;
use crate::service::PolicyService;
use crate::service::PolicyServiceParams;

/// Builds a service wired to the configured store and event sink.
///
/// # Errors
///
/// Returns [`ServiceError`] when validation fails, the store cannot be opened,
/// the persisted latch state is unreadable, or the event sink cannot be opened.
pub fn build_service(config: &PickPolicyConfig) -> Result<PolicyService, ServiceError> {
    config.validate()?;
    let (hard_stop_store, audit_store) = open_stores(config)?;
    PolicyService::new(PolicyServiceParams {
        policy: config.policy.clone(),
        hard_stop_store,
        audit_store,
        events: event_sink_from_config(&config.events)?,
        clock: Arc::new(SystemClock),
        audit: config.audit,
        max_parallel_evaluations: config.service.max_parallel_evaluations,
    })
}

/// Builds the configured event sink.
///
/// # Errors
///
/// Returns [`ServiceError::EventSink`] when the file sink cannot be opened.
pub fn event_sink_from_config(
    config: &EventsConfig,
) -> Result<Arc<dyn PolicyEventSink>, ServiceError> {
    match (config.sink, &config.path) {
        (EventSinkType::Stderr, _) => Ok(Arc::new(StderrEventSink) as Arc<dyn PolicyEventSink>),
        (EventSinkType::None, _) => Ok(Arc::new(NoopEventSink) as Arc<dyn PolicyEventSink>),
        (EventSinkType::File, Some(path)) => FileEventSink::new(path)
            .map(|sink| Arc::new(sink) as Arc<dyn PolicyEventSink>)
            .map_err(|err| ServiceError::EventSink(format!("{}: {err}", path.display()))),
        (EventSinkType::File, None) => {
            Err(ServiceError::EventSink("file event sink requires path".to_string()))
        }
    }
}

/// Opens the hard-stop and audit stores for the configured backend.
fn open_stores(
    config: &PickPolicyConfig,
) -> Result<(Arc<dyn HardStopStore>, Arc<dyn AuditStore>), ServiceError> {
    match config.store.store_type {
        StoreType::Memory => {
            let hard_stop: Arc<dyn HardStopStore> = Arc::new(InMemoryHardStopStore::new());
            let audit: Arc<dyn AuditStore> = Arc::new(InMemoryAuditStore::new());
            Ok((hard_stop, audit))
        }
        StoreType::Sqlite => {
            let sqlite_config = config.store.sqlite_config().ok_or_else(|| {
                ServiceError::Config(ConfigError::Invalid(
                    "sqlite store requires path".to_string(),
                ))
            })?;
            let store = SqlitePolicyStore::new(sqlite_config)?;
            let hard_stop: Arc<dyn HardStopStore> = Arc::new(store.clone());
            let audit: Arc<dyn AuditStore> = Arc::new(store);
            Ok((hard_stop, audit))
        }
    }
}
