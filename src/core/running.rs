//! In-memory table of launched processes.
//!
//! Owned exclusively by the scheduler loop; never persisted.

use std::collections::HashMap;
use std::process::Child;
use std::time::Instant;

use crate::core::task::TaskId;

/// Live handle for one launched task.
#[derive(Debug)]
pub struct RunningProcessEntry {
    /// OS process handle, polled by the reaper.
    pub child: Child,
    /// Task the process belongs to.
    pub task_id: TaskId,
    /// Task type, used for per-type concurrency counts.
    pub process_type: String,
    /// When the process was started.
    pub started_at: Instant,
    /// Whether the store has accepted the `running` status for the task.
    /// Until it has, the task still reads as pending and must not be
    /// finalized.
    pub marked_running: bool,
}

impl RunningProcessEntry {
    /// OS process id of the entry.
    pub fn pid(&self) -> u32 {
        self.child.id()
    }
}

/// Running entries keyed by OS process id.
#[derive(Debug, Default)]
pub struct RunningTable {
    entries: HashMap<u32, RunningProcessEntry>,
}

impl RunningTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a newly launched process.
    pub fn insert(&mut self, entry: RunningProcessEntry) {
        self.entries.insert(entry.pid(), entry);
    }

    /// Stop tracking a process, returning its entry.
    pub fn remove(&mut self, pid: u32) -> Option<RunningProcessEntry> {
        self.entries.remove(&pid)
    }

    /// Total running entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is running.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Running entries of one task type.
    pub fn count_of_type(&self, process_type: &str) -> usize {
        self.entries
            .values()
            .filter(|e| e.process_type == process_type)
            .count()
    }

    /// Whether a task is already backed by a live process.
    pub fn tracks_task(&self, task_id: TaskId) -> bool {
        self.entries.values().any(|e| e.task_id == task_id)
    }

    /// Mutable iteration for polling.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&u32, &mut RunningProcessEntry)> {
        self.entries.iter_mut()
    }
}
