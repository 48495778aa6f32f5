//! Persisted task records and their lifecycle.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::StoreError;

/// Unique, immutable task identifier assigned by the store.
pub type TaskId = u64;

/// Named string parameters substituted into a command template.
pub type Parameters = BTreeMap<String, String>;

/// Lifecycle status of a persisted task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Waiting for admission.
    Pending,
    /// Launched and tracked by the dispatcher.
    Running,
    /// Process exited with code 0.
    Success,
    /// Rejected, failed to launch, or terminated abnormally.
    Failed,
}

impl TaskStatus {
    /// Column value used by every store backend.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Success => "success",
            Self::Failed => "failed",
        }
    }

    /// Whether no further transition is possible.
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Success | Self::Failed)
    }

    /// Whether `self -> next` respects pending -> running -> {success, failed}.
    ///
    /// `pending -> failed` is allowed for tasks rejected before launch
    /// (unknown type, spawn failure).
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Running | Self::Failed)
                | (Self::Running, Self::Success | Self::Failed)
        )
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "running" => Ok(Self::Running),
            "success" => Ok(Self::Success),
            "failed" => Ok(Self::Failed),
            other => Err(StoreError::Corrupt(format!("unknown status `{other}`"))),
        }
    }
}

/// One persisted unit of work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Store-assigned identifier, never reused.
    pub id: TaskId,
    /// Key into the task registry.
    pub process_type: String,
    /// Values for the command template placeholders.
    #[serde(default)]
    pub parameters: Parameters,
    /// Current lifecycle status.
    pub status: TaskStatus,
    /// Last-known diagnostic.
    #[serde(default)]
    pub log: String,
    /// Creation time; fetch order follows it.
    pub created_at: DateTime<Utc>,
    /// Time of the last status change.
    pub updated_at: Option<DateTime<Utc>>,
}

/// Request to create a pending task.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewTask {
    /// Task type name.
    pub process_type: String,
    /// Template parameters.
    #[serde(default)]
    pub parameters: Parameters,
}

impl NewTask {
    /// Create a request for the given task type with no parameters.
    pub fn new(process_type: impl Into<String>) -> Self {
        Self {
            process_type: process_type.into(),
            parameters: Parameters::new(),
        }
    }

    /// Add a template parameter.
    #[must_use]
    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(name.into(), value.into());
        self
    }
}

impl Task {
    /// Build a pending record from a creation request.
    pub fn pending(id: TaskId, new: NewTask, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            process_type: new.process_type,
            parameters: new.parameters,
            status: TaskStatus::Pending,
            log: String::new(),
            created_at,
            updated_at: None,
        }
    }

    /// Apply a status change, enforcing lifecycle monotonicity.
    pub fn transition(
        &mut self,
        status: TaskStatus,
        log: &str,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        if !self.status.can_transition_to(status) {
            return Err(StoreError::InvalidTransition {
                id: self.id,
                from: self.status,
                to: status,
            });
        }
        self.status = status;
        self.log = log.to_string();
        self.updated_at = Some(at);
        Ok(())
    }
}
