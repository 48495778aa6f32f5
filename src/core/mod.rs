//! Core dispatch abstractions: tasks, admission, launching, reaping.

pub mod admission;
pub mod audit;
pub mod dispatcher;
pub mod error;
pub mod launcher;
pub mod reaper;
pub mod registry;
pub mod running;
pub mod store;
pub mod task;
pub mod template;

pub use admission::{Admission, AdmissionController, LoadSampler, RejectReason, RunningCounts};
pub use audit::{
    build_audit_event, AuditAction, AuditEvent, AuditFormat, AuditLog, AuditSink, FileAuditSink,
    InMemoryAuditSink,
};
pub use dispatcher::{CycleReport, Dispatcher, DispatcherSettings, OrphanPolicy};
pub use error::{AppResult, DispatchError, StoreError};
pub use launcher::{mark_running, LaunchOutcome, Launcher, DEFAULT_SHELL};
pub use reaper::{classify_exit, reap, ReapedTask};
pub use registry::{TaskRegistry, TaskTypeDescriptor};
pub use running::{RunningProcessEntry, RunningTable};
pub use store::QueueStore;
pub use task::{NewTask, Parameters, Task, TaskId, TaskStatus};
pub use template::render_command;
