//! Tests for audit sinks and the dual audit log

use task_dispatcher::core::audit::format_event;
use task_dispatcher::core::{
    build_audit_event, Admission, AuditAction, AuditFormat, AuditLog, AuditSink, InMemoryAuditSink,
    NewTask, RejectReason, Task, TaskStatus,
};

fn memory_log() -> (AuditLog, InMemoryAuditSink, InMemoryAuditSink) {
    let operator = InMemoryAuditSink::new(100);
    let client = InMemoryAuditSink::new(100);
    let log = AuditLog::new(Box::new(operator.clone()), Box::new(client.clone()));
    (log, operator, client)
}

fn task(id: u64, process_type: &str) -> Task {
    Task::pending(id, NewTask::new(process_type), chrono::Utc::now())
}

#[test]
fn test_in_memory_audit_sink() {
    let mut sink = InMemoryAuditSink::new(10);

    let event = build_audit_event(
        AuditAction::Launched,
        Some(1),
        Some("echo"),
        Some("pid=10".to_string()),
    );

    sink.record(&event);
    let events = sink.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event_id, event.event_id);
    assert_eq!(events[0].task_id, Some(1));
    assert_eq!(events[0].process_type.as_deref(), Some("echo"));
    assert_eq!(events[0].action, AuditAction::Launched);
}

#[test]
fn test_audit_sink_overflow() {
    let mut sink = InMemoryAuditSink::new(2);

    sink.record(&build_audit_event(AuditAction::Admitted, Some(1), None, None));
    sink.record(&build_audit_event(AuditAction::Admitted, Some(2), None, None));
    sink.record(&build_audit_event(AuditAction::Admitted, Some(3), None, None));

    let events = sink.events();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].task_id, Some(2)); // First one popped
    assert_eq!(events[1].task_id, Some(3));
}

#[test]
fn test_build_audit_event_ids_are_unique() {
    let a = build_audit_event(AuditAction::DispatcherStarted, None, None, None);
    let b = build_audit_event(AuditAction::DispatcherStarted, None, None, None);
    assert_ne!(a.event_id, b.event_id);
    assert!(a.status.is_none());
}

#[test]
fn test_detailed_format() {
    let event = build_audit_event(
        AuditAction::Rejected,
        Some(7),
        Some("nope"),
        Some("process type `nope` is not registered".to_string()),
    );
    let line = format_event(&event, AuditFormat::Detailed);
    assert!(
        line.ends_with(" [WARN] rejected task=7 type=nope process type `nope` is not registered"),
        "{line}"
    );
}

#[test]
fn test_summary_format_for_launch() {
    let event = build_audit_event(AuditAction::Launched, Some(2), Some("echo"), None);
    let line = format_event(&event, AuditFormat::Summary);
    assert!(line.ends_with(" - Task 2 started (echo)"), "{line}");
}

#[test]
fn test_client_stream_only_sees_launch_and_finish() {
    let (mut log, operator, client) = memory_log();
    let t = task(1, "echo");

    log.dispatcher_started("types=[echo]".to_string());
    log.admission(&t, &Admission::Admit);
    log.launched(&t, 1234, "echo hi");
    log.finished(t.id, &t.process_type, TaskStatus::Success, "exit code 0");
    log.store_error(Some(t.id), "mark running", &"timeout");

    let client_actions: Vec<AuditAction> = client.events().iter().map(|e| e.action).collect();
    assert_eq!(client_actions, vec![AuditAction::Launched, AuditAction::Finished]);
    assert_eq!(operator.events().len(), 5);
    assert_eq!(
        client.events_with(AuditAction::Finished)[0].status,
        Some(TaskStatus::Success)
    );
}

#[test]
fn test_admission_actions() {
    let (mut log, operator, _client) = memory_log();
    let t = task(4, "echo");

    log.admission(&t, &Admission::Reject(RejectReason::GlobalSaturated { running: 3, max: 3 }));
    log.admission(&t, &Admission::Reject(RejectReason::UnknownType));

    assert_eq!(operator.events_with(AuditAction::Deferred).len(), 1);
    assert_eq!(operator.events_with(AuditAction::Rejected).len(), 1);
    assert!(operator.events_with(AuditAction::Deferred)[0].detail.is_some());
}

#[test]
fn test_file_sinks_append_lines() {
    let dir = tempfile::tempdir().unwrap();
    let operator_path = dir.path().join("logs/operator.log");
    let client_path = dir.path().join("logs/client.log");

    let t = task(11, "sleep");
    {
        let mut log = AuditLog::to_files(&operator_path, &client_path).unwrap();
        log.admission(&t, &Admission::Admit);
        log.launched(&t, 99, "sleep 1");
    }
    {
        let mut log = AuditLog::to_files(&operator_path, &client_path).unwrap();
        log.finished(t.id, &t.process_type, TaskStatus::Failed, "exit code 1");
    }

    let client = std::fs::read_to_string(&client_path).unwrap();
    let lines: Vec<&str> = client.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].ends_with(" - Task 11 started (sleep)"));
    assert!(lines[1].ends_with(" - Task 11 finished (sleep): failed"));

    let operator = std::fs::read_to_string(&operator_path).unwrap();
    assert_eq!(operator.lines().count(), 3);
    assert!(operator.contains("launched task=11 type=sleep pid=99"));
}
