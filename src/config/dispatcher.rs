//! Dispatcher configuration structures.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::{DispatcherSettings, OrphanPolicy, DEFAULT_SHELL};

/// Queue store backend selection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "snake_case")]
pub enum StoreBackendConfig {
    /// In-memory store for development/testing.
    #[default]
    InMemory,
    /// JSON-lines file.
    Jsonl {
        /// Path of the task file.
        path: PathBuf,
    },
    /// Postgres table (requires the `postgres` feature).
    Postgres {
        /// Connection URL; falls back to `DATABASE_URL` when absent.
        #[serde(default)]
        url: Option<String>,
    },
}

/// One registered task type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskTypeConfig {
    /// Command template with `{placeholder}`s.
    pub command: String,
    /// Per-type concurrency limit.
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,
}

/// Audit log file locations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditLogConfig {
    /// Operator-detail stream.
    #[serde(default = "default_operator_log")]
    pub operator_path: PathBuf,
    /// Client-summary stream.
    #[serde(default = "default_client_log")]
    pub client_path: PathBuf,
}

impl Default for AuditLogConfig {
    fn default() -> Self {
        Self {
            operator_path: default_operator_log(),
            client_path: default_client_log(),
        }
    }
}

/// Root dispatcher configuration. Read once at startup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatcherConfig {
    /// Maximum processes running at once across all types.
    #[serde(default = "default_max_global")]
    pub max_global_concurrent: usize,
    /// Host CPU utilization (percent) above which nothing new starts.
    #[serde(default = "default_cpu_threshold")]
    pub cpu_threshold_percent: f32,
    /// Blocking window of one CPU sample, in milliseconds.
    #[serde(default = "default_sample_window_ms")]
    pub cpu_sample_window_ms: u64,
    /// Seconds between scheduler cycles.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    /// Shell used to run rendered commands.
    #[serde(default = "default_shell")]
    pub shell: String,
    /// Task type registry; empty by default.
    #[serde(default)]
    pub tasks: BTreeMap<String, TaskTypeConfig>,
    /// Queue store backend.
    #[serde(default)]
    pub store: StoreBackendConfig,
    /// Audit log files.
    #[serde(default)]
    pub logs: AuditLogConfig,
    /// Startup handling of orphaned `running` rows.
    #[serde(default)]
    pub orphan_policy: OrphanPolicy,
}

const fn default_max_concurrent() -> usize {
    1
}

const fn default_max_global() -> usize {
    3
}

const fn default_cpu_threshold() -> f32 {
    90.0
}

const fn default_sample_window_ms() -> u64 {
    1000
}

const fn default_poll_interval() -> u64 {
    5
}

fn default_shell() -> String {
    DEFAULT_SHELL.to_string()
}

fn default_operator_log() -> PathBuf {
    PathBuf::from("dispatcher_operator.log")
}

fn default_client_log() -> PathBuf {
    PathBuf::from("dispatcher_client.log")
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            max_global_concurrent: default_max_global(),
            cpu_threshold_percent: default_cpu_threshold(),
            cpu_sample_window_ms: default_sample_window_ms(),
            poll_interval_secs: default_poll_interval(),
            shell: default_shell(),
            tasks: BTreeMap::new(),
            store: StoreBackendConfig::default(),
            logs: AuditLogConfig::default(),
            orphan_policy: OrphanPolicy::default(),
        }
    }
}

impl TaskTypeConfig {
    /// Validate task type values.
    pub fn validate(&self) -> Result<(), String> {
        if self.command.trim().is_empty() {
            return Err("command must not be empty".into());
        }
        if self.max_concurrent == 0 {
            return Err("max_concurrent must be greater than 0".into());
        }
        Ok(())
    }
}

impl DispatcherConfig {
    /// Validate limits and every task type.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_global_concurrent == 0 {
            return Err("max_global_concurrent must be greater than 0".into());
        }
        if !(self.cpu_threshold_percent > 0.0 && self.cpu_threshold_percent <= 100.0) {
            return Err("cpu_threshold_percent must be in (0, 100]".into());
        }
        if self.cpu_sample_window_ms == 0 {
            return Err("cpu_sample_window_ms must be greater than 0".into());
        }
        if self.poll_interval_secs == 0 {
            return Err("poll_interval_secs must be greater than 0".into());
        }
        if self.shell.trim().is_empty() {
            return Err("shell must not be empty".into());
        }
        for (name, task) in &self.tasks {
            task.validate()
                .map_err(|e| format!("task type `{name}` invalid: {e}"))?;
        }
        Ok(())
    }

    /// Parse dispatcher configuration from a JSON string and validate.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Read and validate a JSON configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, String> {
        let path = path.as_ref();
        let input = std::fs::read_to_string(path)
            .map_err(|e| format!("cannot read {}: {e}", path.display()))?;
        Self::from_json_str(&input)
    }

    /// Whether the CPU check can never reject and need not be sampled.
    pub fn load_check_disabled(&self) -> bool {
        self.cpu_threshold_percent >= 100.0
    }

    /// Loop settings derived from this configuration.
    pub fn settings(&self) -> DispatcherSettings {
        DispatcherSettings {
            max_global_concurrent: self.max_global_concurrent,
            cpu_threshold_percent: self.cpu_threshold_percent,
            poll_interval: Duration::from_secs(self.poll_interval_secs),
            shell: self.shell.clone(),
            orphan_policy: self.orphan_policy,
        }
    }
}
