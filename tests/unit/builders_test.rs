//! Tests for builder modules

use task_dispatcher::builders::{build_dispatcher, build_load_sampler, build_registry, open_store};
use task_dispatcher::config::{DispatcherConfig, StoreBackendConfig, TaskTypeConfig};
use task_dispatcher::core::{
    AuditLog, InMemoryAuditSink, LoadSampler, NewTask, QueueStore, TaskStatus,
};
use task_dispatcher::infra::{FixedLoad, InMemoryQueueStore};

fn config_with_echo() -> DispatcherConfig {
    let mut cfg = DispatcherConfig::default();
    cfg.tasks.insert(
        "echo".to_string(),
        TaskTypeConfig {
            command: "echo {msg}".to_string(),
            max_concurrent: 2,
        },
    );
    cfg
}

fn memory_audit() -> AuditLog {
    AuditLog::new(
        Box::new(InMemoryAuditSink::new(100)),
        Box::new(InMemoryAuditSink::new(100)),
    )
}

#[test]
fn test_build_registry() {
    let registry = build_registry(&config_with_echo()).unwrap();
    assert_eq!(registry.names(), vec!["echo"]);
    assert_eq!(registry.get("echo").unwrap().max_concurrent, 2);
}

#[test]
fn test_open_jsonl_store() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = DispatcherConfig {
        store: StoreBackendConfig::Jsonl {
            path: dir.path().join("queue/tasks.jsonl"),
        },
        ..DispatcherConfig::default()
    };
    let store = open_store(&cfg).unwrap();
    let task = store.enqueue(NewTask::new("echo")).unwrap();
    assert_eq!(store.get(task.id).unwrap().unwrap().status, TaskStatus::Pending);
}

#[cfg(not(feature = "postgres"))]
#[test]
fn test_postgres_store_needs_feature() {
    let cfg = DispatcherConfig {
        store: StoreBackendConfig::Postgres {
            url: Some("postgres://localhost/dispatch".to_string()),
        },
        ..DispatcherConfig::default()
    };
    assert!(open_store(&cfg).is_err());
}

#[test]
fn test_load_sampler_disabled_at_full_threshold() {
    let cfg = DispatcherConfig {
        cpu_threshold_percent: 100.0,
        ..DispatcherConfig::default()
    };
    let mut sampler = build_load_sampler(&cfg);
    assert!(sampler.cpu_percent().unwrap().abs() < f32::EPSILON);
}

#[test]
fn test_build_dispatcher() {
    let dispatcher = build_dispatcher(
        &config_with_echo(),
        |_| Ok(InMemoryQueueStore::new()),
        |_| FixedLoad(0.0),
        memory_audit(),
    )
    .unwrap();
    assert_eq!(dispatcher.registry().len(), 1);
    assert!(dispatcher.running().is_empty());
}

#[test]
fn test_build_dispatcher_rejects_invalid_config() {
    let cfg = DispatcherConfig {
        max_global_concurrent: 0,
        ..config_with_echo()
    };
    let result = build_dispatcher(
        &cfg,
        |_| Ok(InMemoryQueueStore::new()),
        |_| FixedLoad(0.0),
        memory_audit(),
    );
    assert!(result.is_err());
}
