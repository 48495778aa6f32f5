//! Queue store contract.

use std::sync::Arc;

use crate::core::task::{NewTask, Task, TaskId, TaskStatus};
use crate::core::StoreError;

/// Durable table of task records.
///
/// The dispatcher only reads `pending`/`running` rows and writes status, log
/// and update time for rows it owns by id.
pub trait QueueStore {
    /// Pending tasks, oldest `created_at` first (ties broken by id).
    fn fetch_pending(&self) -> Result<Vec<Task>, StoreError>;

    /// Tasks currently marked `running`.
    fn fetch_running(&self) -> Result<Vec<Task>, StoreError>;

    /// Set status and log for a task, stamping `updated_at`.
    fn update_status(&self, id: TaskId, status: TaskStatus, log: &str) -> Result<(), StoreError>;

    /// Insert a new pending task.
    fn enqueue(&self, task: NewTask) -> Result<Task, StoreError>;

    /// Look up a single task.
    fn get(&self, id: TaskId) -> Result<Option<Task>, StoreError>;
}

impl<T: QueueStore + ?Sized> QueueStore for Arc<T> {
    fn fetch_pending(&self) -> Result<Vec<Task>, StoreError> {
        (**self).fetch_pending()
    }

    fn fetch_running(&self) -> Result<Vec<Task>, StoreError> {
        (**self).fetch_running()
    }

    fn update_status(&self, id: TaskId, status: TaskStatus, log: &str) -> Result<(), StoreError> {
        (**self).update_status(id, status, log)
    }

    fn enqueue(&self, task: NewTask) -> Result<Task, StoreError> {
        (**self).enqueue(task)
    }

    fn get(&self, id: TaskId) -> Result<Option<Task>, StoreError> {
        (**self).get(id)
    }
}

impl<T: QueueStore + ?Sized> QueueStore for Box<T> {
    fn fetch_pending(&self) -> Result<Vec<Task>, StoreError> {
        (**self).fetch_pending()
    }

    fn fetch_running(&self) -> Result<Vec<Task>, StoreError> {
        (**self).fetch_running()
    }

    fn update_status(&self, id: TaskId, status: TaskStatus, log: &str) -> Result<(), StoreError> {
        (**self).update_status(id, status, log)
    }

    fn enqueue(&self, task: NewTask) -> Result<Task, StoreError> {
        (**self).enqueue(task)
    }

    fn get(&self, id: TaskId) -> Result<Option<Task>, StoreError> {
        (**self).get(id)
    }
}

/// Sort tasks into fetch order.
pub fn sort_fifo(tasks: &mut [Task]) {
    tasks.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
}
