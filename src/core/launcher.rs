//! Process launcher: renders a task's command and starts it detached.

use std::process::{Command, Stdio};
use std::time::Instant;

use crate::core::audit::AuditLog;
use crate::core::registry::TaskRegistry;
use crate::core::running::{RunningProcessEntry, RunningTable};
use crate::core::store::QueueStore;
use crate::core::task::{Task, TaskId, TaskStatus};
use crate::core::template::render_command;
use crate::core::{DispatchError, StoreError};

/// Default shell used to interpret rendered commands.
pub const DEFAULT_SHELL: &str = "/bin/sh";

/// Result of a launch attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaunchOutcome {
    /// Process started and is tracked.
    Started {
        /// OS process id.
        pid: u32,
    },
    /// Task was marked failed; nothing is tracked.
    Failed {
        /// Diagnostic persisted in the task log.
        reason: String,
    },
}

/// Starts task commands through a shell.
#[derive(Debug, Clone)]
pub struct Launcher {
    shell: String,
}

impl Default for Launcher {
    fn default() -> Self {
        Self::new(DEFAULT_SHELL)
    }
}

impl Launcher {
    /// Launcher using `shell -c <command>`.
    pub fn new(shell: impl Into<String>) -> Self {
        Self { shell: shell.into() }
    }

    /// Build the OS command for a rendered command line.
    ///
    /// The child inherits the environment and stdout/stderr, reads nothing
    /// from stdin, and on Unix gets its own process group so signals aimed
    /// at the dispatcher do not reach it.
    pub fn command_for(&self, rendered: &str) -> Command {
        let mut cmd = Command::new(&self.shell);
        cmd.arg("-c").arg(rendered).stdin(Stdio::null());
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            cmd.process_group(0);
        }
        cmd
    }

    /// Start `task`, record it as running, and persist the new status.
    ///
    /// Unknown types and spawn errors are terminal: the task is persisted as
    /// failed and no running entry is left behind.
    pub fn start<S>(
        &self,
        task: &Task,
        registry: &TaskRegistry,
        running: &mut RunningTable,
        store: &S,
        audit: &mut AuditLog,
    ) -> LaunchOutcome
    where
        S: QueueStore + ?Sized,
    {
        let Some(descriptor) = registry.get(&task.process_type) else {
            let reason = format!("process type `{}` is not registered", task.process_type);
            return Self::fail(task, reason, store, audit);
        };

        let rendered = render_command(&descriptor.command_template, &task.parameters);

        match self.command_for(&rendered).spawn() {
            Ok(child) => {
                let pid = child.id();
                let marked_running = mark_running(store, task.id, pid, audit);
                running.insert(RunningProcessEntry {
                    child,
                    task_id: task.id,
                    process_type: task.process_type.clone(),
                    started_at: Instant::now(),
                    marked_running,
                });
                audit.launched(task, pid, &rendered);
                LaunchOutcome::Started { pid }
            }
            Err(source) => {
                let err = DispatchError::Launch {
                    task_id: task.id,
                    source,
                };
                Self::fail(task, err.to_string(), store, audit)
            }
        }
    }

    fn fail<S>(task: &Task, reason: String, store: &S, audit: &mut AuditLog) -> LaunchOutcome
    where
        S: QueueStore + ?Sized,
    {
        if let Err(e) = store.update_status(task.id, TaskStatus::Failed, &reason) {
            audit.store_error(Some(task.id), "mark failed", &e);
        }
        audit.launch_failed(task, &reason);
        LaunchOutcome::Failed { reason }
    }
}

/// Persist `running` for a launched task, returning whether the task has
/// left `pending` in the store.
///
/// A rejected transition means the row is already past `pending` (an
/// earlier write landed even though it was reported as failed), so it can
/// no longer be fetched for launch.
pub fn mark_running<S>(store: &S, task_id: TaskId, pid: u32, audit: &mut AuditLog) -> bool
where
    S: QueueStore + ?Sized,
{
    match store.update_status(task_id, TaskStatus::Running, &format!("pid {pid}")) {
        Ok(()) | Err(StoreError::InvalidTransition { .. }) => true,
        Err(e) => {
            audit.store_error(Some(task_id), "mark running", &e);
            false
        }
    }
}
