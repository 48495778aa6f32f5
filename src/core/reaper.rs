//! Reaper: detects terminated processes and reconciles their tasks.

use std::process::ExitStatus;

use crate::core::audit::AuditLog;
use crate::core::launcher::mark_running;
use crate::core::running::RunningTable;
use crate::core::store::QueueStore;
use crate::core::task::{TaskId, TaskStatus};

/// A task whose process was observed to terminate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReapedTask {
    /// Task identifier.
    pub task_id: TaskId,
    /// Task type.
    pub process_type: String,
    /// OS process id the task ran as.
    pub pid: u32,
    /// Terminal status persisted for the task.
    pub status: TaskStatus,
    /// Diagnostic persisted in the task log.
    pub detail: String,
}

/// Map a process exit status to a terminal task status and log text.
///
/// Only exit code 0 is a success; everything else is a failure.
pub fn classify_exit(status: ExitStatus) -> (TaskStatus, String) {
    if status.success() {
        return (TaskStatus::Success, "exit code 0".to_string());
    }
    if let Some(code) = status.code() {
        return (TaskStatus::Failed, format!("exit code {code}"));
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return (TaskStatus::Failed, format!("terminated by signal {signal}"));
        }
    }
    (TaskStatus::Failed, format!("abnormal termination ({status})"))
}

/// Poll every running entry once without blocking and finalize the ones
/// that have terminated.
///
/// An entry whose `running` status never reached the store is retried here
/// first; it is only finalized once that write succeeds, so the task cannot
/// reappear as pending after its process is gone. A failed terminal status
/// write is reported to the operator log; the entry is still removed so the
/// slot is freed.
pub fn reap<S>(running: &mut RunningTable, store: &S, audit: &mut AuditLog) -> Vec<ReapedTask>
where
    S: QueueStore + ?Sized,
{
    let mut finished = Vec::new();
    for (pid, entry) in running.iter_mut() {
        if !entry.marked_running {
            entry.marked_running = mark_running(store, entry.task_id, *pid, audit);
        }
        let outcome = match entry.child.try_wait() {
            Ok(Some(exit)) => classify_exit(exit),
            Ok(None) => continue,
            Err(e) => (TaskStatus::Failed, format!("wait failed: {e}")),
        };
        if entry.marked_running {
            finished.push((*pid, outcome));
        } else {
            tracing::warn!(
                task_id = entry.task_id,
                pid = *pid,
                "process exited before its running status was stored; retrying next cycle"
            );
        }
    }

    let mut reaped = Vec::with_capacity(finished.len());
    for (pid, (status, detail)) in finished {
        let Some(entry) = running.remove(pid) else {
            continue;
        };
        tracing::debug!(
            task_id = entry.task_id,
            pid,
            elapsed_ms = entry.started_at.elapsed().as_millis(),
            "process terminated"
        );
        if let Err(e) = store.update_status(entry.task_id, status, &detail) {
            audit.store_error(Some(entry.task_id), "record completion", &e);
        }
        audit.finished(entry.task_id, &entry.process_type, status, &detail);
        reaped.push(ReapedTask {
            task_id: entry.task_id,
            process_type: entry.process_type,
            pid,
            status,
            detail,
        });
    }
    reaped
}
