//! In-memory queue store for development and testing.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use crate::core::store::sort_fifo;
use crate::core::{NewTask, QueueStore, StoreError, Task, TaskId, TaskStatus};

#[derive(Default)]
struct Inner {
    tasks: BTreeMap<TaskId, Task>,
    history: HashMap<TaskId, Vec<TaskStatus>>,
    next_id: TaskId,
    offline: bool,
}

impl Inner {
    fn check_online(&self) -> Result<(), StoreError> {
        if self.offline {
            return Err(StoreError::Unavailable("in-memory store set offline".into()));
        }
        Ok(())
    }

    fn with_status(&self, status: TaskStatus) -> Vec<Task> {
        let mut tasks: Vec<Task> = self
            .tasks
            .values()
            .filter(|t| t.status == status)
            .cloned()
            .collect();
        sort_fifo(&mut tasks);
        tasks
    }
}

/// Queue store held in process memory.
///
/// Keeps the full status history of every task and refuses non-monotonic
/// transitions. Can be switched offline to simulate connectivity loss.
#[derive(Default)]
pub struct InMemoryQueueStore {
    inner: Mutex<Inner>,
}

impl InMemoryQueueStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a pending task with an explicit creation time.
    pub fn enqueue_at(&self, task: NewTask, created_at: DateTime<Utc>) -> Result<Task, StoreError> {
        let mut inner = self.inner.lock();
        inner.check_online()?;
        inner.next_id += 1;
        let record = Task::pending(inner.next_id, task, created_at);
        inner.history.insert(record.id, vec![TaskStatus::Pending]);
        inner.tasks.insert(record.id, record.clone());
        Ok(record)
    }

    /// Every status a task has been in, oldest first.
    pub fn history(&self, id: TaskId) -> Vec<TaskStatus> {
        self.inner.lock().history.get(&id).cloned().unwrap_or_default()
    }

    /// Snapshot of all tasks ordered by id.
    pub fn all(&self) -> Vec<Task> {
        self.inner.lock().tasks.values().cloned().collect()
    }

    /// Simulate the store becoming unreachable (or reachable again).
    pub fn set_offline(&self, offline: bool) {
        self.inner.lock().offline = offline;
    }
}

impl QueueStore for InMemoryQueueStore {
    fn fetch_pending(&self) -> Result<Vec<Task>, StoreError> {
        let inner = self.inner.lock();
        inner.check_online()?;
        Ok(inner.with_status(TaskStatus::Pending))
    }

    fn fetch_running(&self) -> Result<Vec<Task>, StoreError> {
        let inner = self.inner.lock();
        inner.check_online()?;
        Ok(inner.with_status(TaskStatus::Running))
    }

    fn update_status(&self, id: TaskId, status: TaskStatus, log: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        inner.check_online()?;
        let task = inner.tasks.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        task.transition(status, log, Utc::now())?;
        inner.history.entry(id).or_default().push(status);
        Ok(())
    }

    fn enqueue(&self, task: NewTask) -> Result<Task, StoreError> {
        self.enqueue_at(task, Utc::now())
    }

    fn get(&self, id: TaskId) -> Result<Option<Task>, StoreError> {
        let inner = self.inner.lock();
        inner.check_online()?;
        Ok(inner.tasks.get(&id).cloned())
    }
}
