//! Audit sinks and the dual operator/client audit log.
//!
//! The operator stream records every admission decision, launch, completion
//! and store problem, and is mirrored to `tracing`. The client stream only
//! carries launch and completion lines.

use std::collections::VecDeque;
use std::fmt;
use std::fs::{create_dir_all, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use parking_lot::Mutex;
use tracing::Level;

use crate::core::admission::Admission;
use crate::core::task::{Task, TaskId, TaskStatus};

/// What an audit event records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditAction {
    /// Dispatcher process came up.
    DispatcherStarted,
    /// Task passed admission.
    Admitted,
    /// Task was not admitted this cycle and stays pending.
    Deferred,
    /// Task was rejected for good (unknown type).
    Rejected,
    /// Process started.
    Launched,
    /// Process could not be started.
    LaunchFailed,
    /// Process terminated and its status was reconciled.
    Finished,
    /// A store read or write failed.
    StoreError,
    /// A `running` row has no live process behind it.
    Orphaned,
}

impl AuditAction {
    /// Stable name used in log lines.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::DispatcherStarted => "dispatcher_started",
            Self::Admitted => "admitted",
            Self::Deferred => "deferred",
            Self::Rejected => "rejected",
            Self::Launched => "launched",
            Self::LaunchFailed => "launch_failed",
            Self::Finished => "finished",
            Self::StoreError => "store_error",
            Self::Orphaned => "orphaned",
        }
    }

    /// Severity used when the event is mirrored to `tracing`.
    pub const fn level(self) -> Level {
        match self {
            Self::Admitted | Self::Deferred => Level::DEBUG,
            Self::DispatcherStarted | Self::Launched | Self::Finished => Level::INFO,
            Self::Rejected | Self::Orphaned => Level::WARN,
            Self::LaunchFailed | Self::StoreError => Level::ERROR,
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Audit event structure.
#[derive(Debug, Clone)]
pub struct AuditEvent {
    /// Event identifier.
    pub event_id: String,
    /// Related task, if any.
    pub task_id: Option<TaskId>,
    /// Related task type, if any.
    pub process_type: Option<String>,
    /// Action taken.
    pub action: AuditAction,
    /// Final status for `Finished` events.
    pub status: Option<TaskStatus>,
    /// Event time.
    pub created_at: DateTime<Utc>,
    /// Additional context.
    pub detail: Option<String>,
}

/// Helper to build an audit event stamped with a fresh id and the current time.
pub fn build_audit_event(
    action: AuditAction,
    task_id: Option<TaskId>,
    process_type: Option<&str>,
    detail: Option<String>,
) -> AuditEvent {
    AuditEvent {
        event_id: uuid::Uuid::new_v4().to_string(),
        task_id,
        process_type: process_type.map(str::to_string),
        action,
        status: None,
        created_at: Utc::now(),
        detail,
    }
}

/// Audit sink abstraction.
pub trait AuditSink: Send {
    /// Record an audit event.
    fn record(&mut self, event: &AuditEvent);
}

/// In-memory audit sink for testing and dev.
///
/// Clones share the same buffer, so a test can keep a handle while the
/// dispatcher owns another.
#[derive(Clone)]
pub struct InMemoryAuditSink {
    events: Arc<Mutex<VecDeque<AuditEvent>>>,
    max_events: usize,
}

impl InMemoryAuditSink {
    /// Create a new in-memory sink with a bounded buffer.
    pub fn new(max_events: usize) -> Self {
        Self {
            events: Arc::new(Mutex::new(VecDeque::with_capacity(max_events))),
            max_events,
        }
    }

    /// Retrieve a snapshot of stored events.
    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().iter().cloned().collect()
    }

    /// Events with the given action.
    pub fn events_with(&self, action: AuditAction) -> Vec<AuditEvent> {
        self.events
            .lock()
            .iter()
            .filter(|e| e.action == action)
            .cloned()
            .collect()
    }
}

impl AuditSink for InMemoryAuditSink {
    fn record(&mut self, event: &AuditEvent) {
        let mut events = self.events.lock();
        if events.len() >= self.max_events {
            events.pop_front();
        }
        events.push_back(event.clone());
    }
}

/// Line layout for file sinks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditFormat {
    /// `<ts> [LEVEL] <action> task=<id> type=<type> status=<s> <detail>`.
    Detailed,
    /// `<ts> - Task <id> started (<type>)` / `... finished (<type>): <status>`.
    Summary,
}

/// Append-only file sink.
pub struct FileAuditSink {
    path: PathBuf,
    file: File,
    format: AuditFormat,
}

impl FileAuditSink {
    /// Open (or create) `path` for appending.
    pub fn open(path: impl AsRef<Path>, format: AuditFormat) -> std::io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self { path, file, format })
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Render an event as one log line (without trailing newline).
pub fn format_event(event: &AuditEvent, format: AuditFormat) -> String {
    let ts = event.created_at.to_rfc3339_opts(SecondsFormat::Millis, true);
    match format {
        AuditFormat::Detailed => {
            let mut line = format!("{ts} [{}] {}", event.action.level(), event.action);
            if let Some(id) = event.task_id {
                line.push_str(&format!(" task={id}"));
            }
            if let Some(ty) = &event.process_type {
                line.push_str(&format!(" type={ty}"));
            }
            if let Some(status) = event.status {
                line.push_str(&format!(" status={status}"));
            }
            if let Some(detail) = &event.detail {
                line.push(' ');
                line.push_str(detail);
            }
            line
        }
        AuditFormat::Summary => {
            let id = event.task_id.map_or_else(|| "-".to_string(), |id| id.to_string());
            let ty = event.process_type.as_deref().unwrap_or("-");
            match (event.action, event.status) {
                (AuditAction::Launched, _) => format!("{ts} - Task {id} started ({ty})"),
                (AuditAction::Finished, Some(status)) => {
                    format!("{ts} - Task {id} finished ({ty}): {status}")
                }
                (action, _) => format!("{ts} - Task {id} {action} ({ty})"),
            }
        }
    }
}

impl AuditSink for FileAuditSink {
    fn record(&mut self, event: &AuditEvent) {
        let mut line = format_event(event, self.format);
        line.push('\n');
        if let Err(e) = self.file.write_all(line.as_bytes()) {
            tracing::warn!(path = %self.path.display(), error = %e, "failed to append audit line");
        }
    }
}

/// Operator and client audit streams fed by the dispatcher.
pub struct AuditLog {
    operator: Box<dyn AuditSink>,
    client: Box<dyn AuditSink>,
}

impl AuditLog {
    /// Combine two independent sinks.
    pub fn new(operator: Box<dyn AuditSink>, client: Box<dyn AuditSink>) -> Self {
        Self { operator, client }
    }

    /// Append-only files with the detailed and summary layouts.
    pub fn to_files(
        operator_path: impl AsRef<Path>,
        client_path: impl AsRef<Path>,
    ) -> std::io::Result<Self> {
        Ok(Self::new(
            Box::new(FileAuditSink::open(operator_path, AuditFormat::Detailed)?),
            Box::new(FileAuditSink::open(client_path, AuditFormat::Summary)?),
        ))
    }

    fn operator(&mut self, event: &AuditEvent) {
        let line = format_event(event, AuditFormat::Detailed);
        let level = event.action.level();
        if level == Level::ERROR {
            tracing::error!(target: "dispatcher::operator", "{line}");
        } else if level == Level::WARN {
            tracing::warn!(target: "dispatcher::operator", "{line}");
        } else if level == Level::INFO {
            tracing::info!(target: "dispatcher::operator", "{line}");
        } else {
            tracing::debug!(target: "dispatcher::operator", "{line}");
        }
        self.operator.record(event);
    }

    /// Dispatcher startup banner.
    pub fn dispatcher_started(&mut self, detail: String) {
        let event = build_audit_event(AuditAction::DispatcherStarted, None, None, Some(detail));
        self.operator(&event);
    }

    /// Outcome of one admission evaluation.
    pub fn admission(&mut self, task: &Task, admission: &Admission) {
        let action = match admission {
            Admission::Admit => AuditAction::Admitted,
            Admission::Reject(reason) if reason.is_terminal() => AuditAction::Rejected,
            Admission::Reject(_) => AuditAction::Deferred,
        };
        let detail = match admission {
            Admission::Admit => None,
            Admission::Reject(reason) => Some(reason.to_string()),
        };
        let event = build_audit_event(action, Some(task.id), Some(&task.process_type), detail);
        self.operator(&event);
    }

    /// A process was started for `task`.
    pub fn launched(&mut self, task: &Task, pid: u32, command: &str) {
        let event = build_audit_event(
            AuditAction::Launched,
            Some(task.id),
            Some(&task.process_type),
            Some(format!("pid={pid} command={command:?}")),
        );
        self.operator(&event);
        self.client.record(&event);
    }

    /// Launch was refused by the registry or the OS.
    pub fn launch_failed(&mut self, task: &Task, reason: &str) {
        let event = build_audit_event(
            AuditAction::LaunchFailed,
            Some(task.id),
            Some(&task.process_type),
            Some(reason.to_string()),
        );
        self.operator(&event);
    }

    /// A process terminated and its task reached a terminal status.
    pub fn finished(
        &mut self,
        task_id: TaskId,
        process_type: &str,
        status: TaskStatus,
        detail: &str,
    ) {
        let mut event = build_audit_event(
            AuditAction::Finished,
            Some(task_id),
            Some(process_type),
            Some(detail.to_string()),
        );
        event.status = Some(status);
        self.operator(&event);
        self.client.record(&event);
    }

    /// A store operation failed.
    pub fn store_error(
        &mut self,
        task_id: Option<TaskId>,
        operation: &str,
        error: &dyn fmt::Display,
    ) {
        let event = build_audit_event(
            AuditAction::StoreError,
            task_id,
            None,
            Some(format!("{operation}: {error}")),
        );
        self.operator(&event);
    }

    /// A `running` row has no tracked process.
    pub fn orphaned(&mut self, task: &Task, detail: &str) {
        let event = build_audit_event(
            AuditAction::Orphaned,
            Some(task.id),
            Some(&task.process_type),
            Some(detail.to_string()),
        );
        self.operator(&event);
    }
}
