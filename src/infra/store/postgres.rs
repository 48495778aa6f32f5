//! Postgres-backed queue store.
//!
//! Owns a small current-thread tokio runtime so the dispatcher loop can stay
//! synchronous. Pool acquisition is bounded, so an unreachable database
//! surfaces as [`StoreError::Unavailable`] instead of stalling the loop.

use std::time::Duration;

use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::types::Json;
use sqlx::Row;
use tokio::runtime::Runtime;

use crate::core::{NewTask, Parameters, QueueStore, StoreError, Task, TaskId, TaskStatus};

const COLUMNS: &str = "id, process_type, parameters, status, log, created_at, updated_at";

/// Queue store over a `dispatch_tasks` table.
pub struct PostgresQueueStore {
    pool: PgPool,
    runtime: Runtime,
}

fn db_err(e: sqlx::Error) -> StoreError {
    match e {
        sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
            StoreError::Unavailable(e.to_string())
        }
        other => StoreError::Database(other),
    }
}

fn decode(row: &PgRow) -> Result<Task, StoreError> {
    let id: i64 = row.try_get("id").map_err(db_err)?;
    let status: String = row.try_get("status").map_err(db_err)?;
    let Json(parameters): Json<Parameters> = row.try_get("parameters").map_err(db_err)?;
    let log: Option<String> = row.try_get("log").map_err(db_err)?;
    Ok(Task {
        id: TaskId::try_from(id).map_err(|_| StoreError::Corrupt(format!("negative id {id}")))?,
        process_type: row.try_get("process_type").map_err(db_err)?,
        parameters,
        status: status.parse()?,
        log: log.unwrap_or_default(),
        created_at: row.try_get("created_at").map_err(db_err)?,
        updated_at: row.try_get("updated_at").map_err(db_err)?,
    })
}

fn to_db_id(id: TaskId) -> Result<i64, StoreError> {
    i64::try_from(id).map_err(|_| StoreError::NotFound(id))
}

impl PostgresQueueStore {
    /// Create a store whose connections are opened on first use.
    pub fn connect_lazy(url: &str) -> Result<Self, StoreError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        let pool = {
            let _guard = runtime.enter();
            PgPoolOptions::new()
                .max_connections(2)
                .acquire_timeout(Duration::from_secs(5))
                .connect_lazy(url)
                .map_err(db_err)?
        };
        Ok(Self { pool, runtime })
    }

    /// Migration statements for the task table.
    pub fn migrations() -> &'static [&'static str] {
        &[r"
CREATE TABLE IF NOT EXISTS dispatch_tasks (
    id BIGSERIAL PRIMARY KEY,
    process_type TEXT NOT NULL,
    parameters JSONB NOT NULL DEFAULT '{}'::jsonb,
    status TEXT NOT NULL DEFAULT 'pending'
        CHECK (status IN ('pending', 'running', 'success', 'failed')),
    log TEXT,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ
);
CREATE INDEX IF NOT EXISTS idx_dispatch_tasks_status_created ON dispatch_tasks (status, created_at);
"]
    }

    /// Apply [`PostgresQueueStore::migrations`].
    pub fn migrate(&self) -> Result<(), StoreError> {
        self.runtime.block_on(async {
            for statement in Self::migrations() {
                sqlx::raw_sql(statement)
                    .execute(&self.pool)
                    .await
                    .map_err(db_err)?;
            }
            Ok(())
        })
    }

    fn with_status(&self, status: TaskStatus) -> Result<Vec<Task>, StoreError> {
        let sql = format!(
            "SELECT {COLUMNS} FROM dispatch_tasks WHERE status = $1 ORDER BY created_at ASC, id ASC"
        );
        let rows = self.runtime.block_on(
            sqlx::query(&sql)
                .bind(status.as_str())
                .fetch_all(&self.pool),
        );
        rows.map_err(db_err)?.iter().map(decode).collect()
    }
}

impl QueueStore for PostgresQueueStore {
    fn fetch_pending(&self) -> Result<Vec<Task>, StoreError> {
        self.with_status(TaskStatus::Pending)
    }

    fn fetch_running(&self) -> Result<Vec<Task>, StoreError> {
        self.with_status(TaskStatus::Running)
    }

    fn update_status(&self, id: TaskId, status: TaskStatus, log: &str) -> Result<(), StoreError> {
        let db_id = to_db_id(id)?;
        let allowed_from: Vec<String> = [
            TaskStatus::Pending,
            TaskStatus::Running,
            TaskStatus::Success,
            TaskStatus::Failed,
        ]
        .into_iter()
        .filter(|from| from.can_transition_to(status))
        .map(|from| from.as_str().to_string())
        .collect();

        let updated = self.runtime.block_on(
            sqlx::query(
                "UPDATE dispatch_tasks SET status = $1, log = $2, updated_at = NOW() \
                 WHERE id = $3 AND status = ANY($4)",
            )
            .bind(status.as_str())
            .bind(log)
            .bind(db_id)
            .bind(&allowed_from)
            .execute(&self.pool),
        );
        if updated.map_err(db_err)?.rows_affected() == 1 {
            return Ok(());
        }

        match self.get(id)? {
            None => Err(StoreError::NotFound(id)),
            Some(current) => Err(StoreError::InvalidTransition {
                id,
                from: current.status,
                to: status,
            }),
        }
    }

    fn enqueue(&self, task: NewTask) -> Result<Task, StoreError> {
        let sql = format!(
            "INSERT INTO dispatch_tasks (process_type, parameters) VALUES ($1, $2) \
             RETURNING {COLUMNS}"
        );
        let row = self.runtime.block_on(
            sqlx::query(&sql)
                .bind(&task.process_type)
                .bind(Json(&task.parameters))
                .fetch_one(&self.pool),
        );
        decode(&row.map_err(db_err)?)
    }

    fn get(&self, id: TaskId) -> Result<Option<Task>, StoreError> {
        let sql = format!("SELECT {COLUMNS} FROM dispatch_tasks WHERE id = $1");
        let row = self.runtime.block_on(
            sqlx::query(&sql)
                .bind(to_db_id(id)?)
                .fetch_optional(&self.pool),
        );
        row.map_err(db_err)?.as_ref().map(decode).transpose()
    }
}
