//! Error types for dispatcher operations.

use thiserror::Error;

use crate::core::task::{TaskId, TaskStatus};

/// Errors produced by queue store backends.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Store could not be reached (connect/fetch/update failure).
    #[error("store unavailable: {0}")]
    Unavailable(String),
    /// No task with this id exists.
    #[error("task {0} not found")]
    NotFound(TaskId),
    /// Requested status change would move a task backwards.
    #[error("invalid transition for task {id}: {from} -> {to}")]
    InvalidTransition {
        /// Task identifier.
        id: TaskId,
        /// Persisted status.
        from: TaskStatus,
        /// Requested status.
        to: TaskStatus,
    },
    /// A persisted row could not be decoded.
    #[error("corrupt record: {0}")]
    Corrupt(String),
    /// Filesystem failure in a file-backed store.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// Record (de)serialization failure.
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    /// Database driver failure.
    #[cfg(feature = "postgres")]
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Errors produced by dispatcher components.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Configuration is missing or invalid.
    #[error("invalid configuration: {0}")]
    Config(String),
    /// The OS refused to start a task's command.
    #[error("failed to launch task {task_id}: {source}")]
    Launch {
        /// Task identifier.
        task_id: TaskId,
        /// Underlying spawn error.
        #[source]
        source: std::io::Error,
    },
    /// Host load could not be sampled.
    #[error("load sample failed: {0}")]
    Load(String),
    /// Queue store failure.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Application-facing result using anyhow for higher-level contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;
