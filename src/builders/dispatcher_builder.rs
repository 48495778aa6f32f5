//! Builders to construct the dispatcher and its collaborators from configuration.

use std::time::Duration;

use crate::config::{DispatcherConfig, StoreBackendConfig};
use crate::core::{
    AuditLog, DispatchError, Dispatcher, LoadSampler, QueueStore, TaskRegistry,
    TaskTypeDescriptor,
};
use crate::infra::{FixedLoad, InMemoryQueueStore, JsonlQueueStore, ProcStatSampler};

/// Build the task registry from the configured task types.
pub fn build_registry(cfg: &DispatcherConfig) -> Result<TaskRegistry, DispatchError> {
    let mut registry = TaskRegistry::new();
    for (name, task) in &cfg.tasks {
        registry.register(
            TaskTypeDescriptor::new(name.clone(), task.command.clone())
                .with_max_concurrent(task.max_concurrent),
        )?;
    }
    Ok(registry)
}

/// Open the configured queue store backend.
pub fn open_store(cfg: &DispatcherConfig) -> Result<Box<dyn QueueStore>, DispatchError> {
    match &cfg.store {
        StoreBackendConfig::InMemory => {
            tracing::warn!("using in-memory queue store; tasks will not survive a restart");
            Ok(Box::new(InMemoryQueueStore::new()))
        }
        StoreBackendConfig::Jsonl { path } => Ok(Box::new(JsonlQueueStore::open(path)?)),
        StoreBackendConfig::Postgres { url } => open_postgres(url.as_deref()),
    }
}

#[cfg(feature = "postgres")]
fn open_postgres(url: Option<&str>) -> Result<Box<dyn QueueStore>, DispatchError> {
    let url = match url {
        Some(url) => url.to_string(),
        None => std::env::var("DATABASE_URL").map_err(|_| {
            DispatchError::Config("postgres store needs a url or DATABASE_URL".into())
        })?,
    };
    let store = crate::infra::PostgresQueueStore::connect_lazy(&url)?;
    if let Err(e) = store.migrate() {
        tracing::warn!(error = %e, "could not apply queue migrations; continuing");
    }
    Ok(Box::new(store))
}

#[cfg(not(feature = "postgres"))]
fn open_postgres(_url: Option<&str>) -> Result<Box<dyn QueueStore>, DispatchError> {
    Err(DispatchError::Config(
        "postgres store requires building with the `postgres` feature".into(),
    ))
}

/// Pick the host load sampler: none when the threshold can never be exceeded.
pub fn build_load_sampler(cfg: &DispatcherConfig) -> Box<dyn LoadSampler> {
    if cfg.load_check_disabled() {
        Box::new(FixedLoad(0.0))
    } else {
        Box::new(ProcStatSampler::new(Duration::from_millis(cfg.cpu_sample_window_ms)))
    }
}

/// Build a dispatcher from configuration using provided factories.
pub fn build_dispatcher<S, L, FS, FL>(
    cfg: &DispatcherConfig,
    store_factory: FS,
    load_factory: FL,
    audit: AuditLog,
) -> Result<Dispatcher<S, L>, DispatchError>
where
    S: QueueStore,
    L: LoadSampler,
    FS: FnOnce(&DispatcherConfig) -> Result<S, DispatchError>,
    FL: FnOnce(&DispatcherConfig) -> L,
{
    cfg.validate().map_err(DispatchError::Config)?;

    let registry = build_registry(cfg)?;
    if registry.is_empty() {
        tracing::warn!("no task types registered; every pending task will be failed");
    }
    let store = store_factory(cfg)?;
    let load = load_factory(cfg);
    Ok(Dispatcher::new(store, load, registry, cfg.settings(), audit))
}
