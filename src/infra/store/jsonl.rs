//! File-backed queue store using JSON lines for durability.
//!
//! One task record per line. The file is re-read on every call so rows
//! appended by other programs are picked up, and rewritten through a
//! temporary file plus rename on every mutation.

use std::fs::{create_dir_all, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;
use parking_lot::Mutex;

use crate::core::store::sort_fifo;
use crate::core::{NewTask, QueueStore, StoreError, Task, TaskId, TaskStatus};

/// Queue store persisted to a `.jsonl` file.
pub struct JsonlQueueStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonlQueueStore {
    /// Open a store at `path`, creating parent directories as needed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            create_dir_all(parent)?;
        }
        Ok(Self {
            path,
            lock: Mutex::new(()),
        })
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<Vec<Task>, StoreError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let file = File::open(&self.path)
            .map_err(|e| StoreError::Unavailable(format!("{}: {e}", self.path.display())))?;
        let mut tasks = Vec::new();
        for (lineno, line) in BufReader::new(file).lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let task: Task = serde_json::from_str(&line).map_err(|e| {
                StoreError::Corrupt(format!("{}:{}: {e}", self.path.display(), lineno + 1))
            })?;
            tasks.push(task);
        }
        Ok(tasks)
    }

    fn save(&self, tasks: &[Task]) -> Result<(), StoreError> {
        let tmp = self.path.with_extension("jsonl.tmp");
        {
            let mut file = OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(&tmp)?;
            for task in tasks {
                let line = serde_json::to_string(task)?;
                writeln!(file, "{line}")?;
            }
            file.sync_all()?;
        }
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn with_status(&self, status: TaskStatus) -> Result<Vec<Task>, StoreError> {
        let _guard = self.lock.lock();
        let mut tasks: Vec<Task> = self
            .load()?
            .into_iter()
            .filter(|t| t.status == status)
            .collect();
        sort_fifo(&mut tasks);
        Ok(tasks)
    }
}

impl QueueStore for JsonlQueueStore {
    fn fetch_pending(&self) -> Result<Vec<Task>, StoreError> {
        self.with_status(TaskStatus::Pending)
    }

    fn fetch_running(&self) -> Result<Vec<Task>, StoreError> {
        self.with_status(TaskStatus::Running)
    }

    fn update_status(&self, id: TaskId, status: TaskStatus, log: &str) -> Result<(), StoreError> {
        let _guard = self.lock.lock();
        let mut tasks = self.load()?;
        let task = tasks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or(StoreError::NotFound(id))?;
        task.transition(status, log, Utc::now())?;
        self.save(&tasks)
    }

    fn enqueue(&self, task: NewTask) -> Result<Task, StoreError> {
        let _guard = self.lock.lock();
        let mut tasks = self.load()?;
        let id = tasks.iter().map(|t| t.id).max().unwrap_or(0) + 1;
        let record = Task::pending(id, task, Utc::now());
        tasks.push(record.clone());
        self.save(&tasks)?;
        Ok(record)
    }

    fn get(&self, id: TaskId) -> Result<Option<Task>, StoreError> {
        let _guard = self.lock.lock();
        Ok(self.load()?.into_iter().find(|t| t.id == id))
    }
}
