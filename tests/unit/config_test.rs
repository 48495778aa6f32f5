//! Tests for configuration parsing and validation

use std::time::Duration;

use task_dispatcher::config::{DispatcherConfig, StoreBackendConfig, TaskTypeConfig};
use task_dispatcher::core::OrphanPolicy;

#[test]
fn test_defaults() {
    let cfg = DispatcherConfig::default();
    assert_eq!(cfg.max_global_concurrent, 3);
    assert!((cfg.cpu_threshold_percent - 90.0).abs() < f32::EPSILON);
    assert_eq!(cfg.poll_interval_secs, 5);
    assert_eq!(cfg.shell, "/bin/sh");
    assert!(cfg.tasks.is_empty());
    assert_eq!(cfg.store, StoreBackendConfig::InMemory);
    assert_eq!(cfg.orphan_policy, OrphanPolicy::Report);
    assert!(cfg.validate().is_ok());
}

#[test]
fn test_empty_json_uses_defaults() {
    let cfg = DispatcherConfig::from_json_str("{}").unwrap();
    assert_eq!(cfg, DispatcherConfig::default());
}

#[test]
fn test_full_json() {
    let cfg = DispatcherConfig::from_json_str(
        r#"{
            "max_global_concurrent": 8,
            "cpu_threshold_percent": 75.5,
            "poll_interval_secs": 2,
            "tasks": {
                "echo": { "command": "echo {msg}", "max_concurrent": 2 },
                "backup": { "command": "tar czf {dest} {src}" }
            },
            "store": { "backend": "jsonl", "path": "/var/lib/dispatcher/tasks.jsonl" },
            "logs": { "operator_path": "/var/log/op.log" },
            "orphan_policy": "fail"
        }"#,
    )
    .unwrap();

    assert_eq!(cfg.max_global_concurrent, 8);
    assert_eq!(cfg.tasks.len(), 2);
    assert_eq!(cfg.tasks["echo"].max_concurrent, 2);
    assert_eq!(cfg.tasks["backup"].max_concurrent, 1);
    assert_eq!(
        cfg.store,
        StoreBackendConfig::Jsonl {
            path: "/var/lib/dispatcher/tasks.jsonl".into()
        }
    );
    assert_eq!(cfg.logs.operator_path.to_str(), Some("/var/log/op.log"));
    assert_eq!(cfg.logs.client_path.to_str(), Some("dispatcher_client.log"));
    assert_eq!(cfg.orphan_policy, OrphanPolicy::Fail);

    let settings = cfg.settings();
    assert_eq!(settings.poll_interval, Duration::from_secs(2));
    assert_eq!(settings.max_global_concurrent, 8);
}

#[test]
fn test_postgres_backend_without_url() {
    let cfg = DispatcherConfig::from_json_str(r#"{ "store": { "backend": "postgres" } }"#).unwrap();
    assert_eq!(cfg.store, StoreBackendConfig::Postgres { url: None });
}

#[test]
fn test_invalid_limits() {
    let invalid = DispatcherConfig {
        max_global_concurrent: 0,
        ..DispatcherConfig::default()
    };
    assert!(invalid.validate().is_err());

    let invalid = DispatcherConfig {
        cpu_threshold_percent: 0.0,
        ..DispatcherConfig::default()
    };
    assert!(invalid.validate().is_err());

    let invalid = DispatcherConfig {
        cpu_threshold_percent: 120.0,
        ..DispatcherConfig::default()
    };
    assert!(invalid.validate().is_err());

    let invalid = DispatcherConfig {
        cpu_sample_window_ms: 0,
        ..DispatcherConfig::default()
    };
    let err = invalid.validate().unwrap_err();
    assert!(err.contains("cpu_sample_window_ms"), "{err}");

    let invalid = DispatcherConfig {
        poll_interval_secs: 0,
        ..DispatcherConfig::default()
    };
    assert!(invalid.validate().is_err());
}

#[test]
fn test_invalid_task_type() {
    let zero = TaskTypeConfig {
        command: "true".to_string(),
        max_concurrent: 0,
    };
    assert!(zero.validate().is_err());

    let mut cfg = DispatcherConfig::default();
    cfg.tasks.insert(
        "blank".to_string(),
        TaskTypeConfig {
            command: "   ".to_string(),
            max_concurrent: 1,
        },
    );
    let err = cfg.validate().unwrap_err();
    assert!(err.contains("blank"), "{err}");
}

#[test]
fn test_parse_errors() {
    assert!(DispatcherConfig::from_json_str("not json").is_err());
    assert!(DispatcherConfig::from_json_str(r#"{ "store": { "backend": "redis" } }"#).is_err());
}

#[test]
fn test_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dispatcher.json");
    std::fs::write(&path, r#"{ "tasks": { "echo": { "command": "echo hi" } } }"#).unwrap();

    let cfg = DispatcherConfig::from_file(&path).unwrap();
    assert_eq!(cfg.tasks["echo"].command, "echo hi");

    assert!(DispatcherConfig::from_file(dir.path().join("missing.json")).is_err());
}

#[test]
fn test_load_check_disabled_at_full_threshold() {
    let cfg = DispatcherConfig {
        cpu_threshold_percent: 100.0,
        ..DispatcherConfig::default()
    };
    assert!(cfg.load_check_disabled());
    assert!(!DispatcherConfig::default().load_check_disabled());
}
