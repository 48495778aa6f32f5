//! Tests for queue store backends

use task_dispatcher::core::{NewTask, QueueStore, StoreError, TaskStatus};
use task_dispatcher::infra::{InMemoryQueueStore, JsonlQueueStore};

fn exercise_lifecycle(store: &dyn QueueStore) {
    let a = store.enqueue(NewTask::new("echo").with_param("msg", "a")).unwrap();
    let b = store.enqueue(NewTask::new("echo").with_param("msg", "b")).unwrap();
    assert!(b.id > a.id);
    assert_eq!(a.status, TaskStatus::Pending);
    assert_eq!(a.parameters["msg"], "a");

    store.update_status(a.id, TaskStatus::Running, "pid 100").unwrap();
    let pending: Vec<u64> = store.fetch_pending().unwrap().iter().map(|t| t.id).collect();
    assert_eq!(pending, vec![b.id]);
    let running = store.fetch_running().unwrap();
    assert_eq!(running.len(), 1);
    assert_eq!(running[0].log, "pid 100");

    store.update_status(a.id, TaskStatus::Success, "exit code 0").unwrap();
    let done = store.get(a.id).unwrap().unwrap();
    assert_eq!(done.status, TaskStatus::Success);
    assert!(done.updated_at.is_some());

    let err = store.update_status(a.id, TaskStatus::Running, "").unwrap_err();
    assert!(matches!(err, StoreError::InvalidTransition { .. }));

    store.update_status(b.id, TaskStatus::Failed, "process type `x` is not registered").unwrap();
    assert!(store.fetch_pending().unwrap().is_empty());

    assert!(matches!(
        store.update_status(9999, TaskStatus::Running, ""),
        Err(StoreError::NotFound(9999))
    ));
    assert!(store.get(9999).unwrap().is_none());
}

#[test]
fn test_in_memory_lifecycle() {
    let store = InMemoryQueueStore::new();
    exercise_lifecycle(&store);
}

#[test]
fn test_jsonl_lifecycle() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonlQueueStore::open(dir.path().join("tasks.jsonl")).unwrap();
    exercise_lifecycle(&store);
}

#[test]
fn test_in_memory_offline() {
    let store = InMemoryQueueStore::new();
    let task = store.enqueue(NewTask::new("echo")).unwrap();
    store.set_offline(true);
    assert!(matches!(store.fetch_pending(), Err(StoreError::Unavailable(_))));
    assert!(store.update_status(task.id, TaskStatus::Running, "").is_err());
    store.set_offline(false);
    assert_eq!(store.fetch_pending().unwrap().len(), 1);
}

#[test]
fn test_in_memory_history() {
    let store = InMemoryQueueStore::new();
    let task = store.enqueue(NewTask::new("echo")).unwrap();
    store.update_status(task.id, TaskStatus::Running, "pid 1").unwrap();
    store.update_status(task.id, TaskStatus::Failed, "exit code 2").unwrap();
    assert_eq!(
        store.history(task.id),
        vec![TaskStatus::Pending, TaskStatus::Running, TaskStatus::Failed]
    );
}
