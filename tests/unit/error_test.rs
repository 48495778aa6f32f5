//! Tests for error types

use task_dispatcher::core::{DispatchError, StoreError, TaskStatus};

#[test]
fn test_not_found_error() {
    let err = StoreError::NotFound(42);
    assert_eq!(format!("{}", err), "task 42 not found");
}

#[test]
fn test_invalid_transition_error() {
    let err = StoreError::InvalidTransition {
        id: 3,
        from: TaskStatus::Success,
        to: TaskStatus::Pending,
    };
    assert_eq!(format!("{}", err), "invalid transition for task 3: success -> pending");
}

#[test]
fn test_unavailable_error() {
    let err = StoreError::Unavailable("connection refused".to_string());
    assert_eq!(format!("{}", err), "store unavailable: connection refused");
}

#[test]
fn test_store_error_is_transparent_in_dispatch_error() {
    let err: DispatchError = StoreError::NotFound(9).into();
    assert_eq!(format!("{}", err), "task 9 not found");
}

#[test]
fn test_launch_error_keeps_source() {
    use std::error::Error;

    let err = DispatchError::Launch {
        task_id: 5,
        source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
    };
    assert_eq!(format!("{}", err), "failed to launch task 5: no such file");
    assert!(err.source().is_some());
}

#[test]
fn test_config_error() {
    let err = DispatchError::Config("max_global_concurrent must be greater than 0".to_string());
    assert_eq!(
        format!("{}", err),
        "invalid configuration: max_global_concurrent must be greater than 0"
    );
}
