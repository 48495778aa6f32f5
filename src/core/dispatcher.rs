//! Scheduler loop: reap, fetch, admit, launch, sleep.
//!
//! Everything runs on the calling thread. The running table is owned here
//! and touched by nothing else, so no locking is involved.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::admission::{Admission, AdmissionController, LoadSampler};
use crate::core::audit::AuditLog;
use crate::core::launcher::{LaunchOutcome, Launcher, DEFAULT_SHELL};
use crate::core::reaper::{reap, ReapedTask};
use crate::core::registry::TaskRegistry;
use crate::core::running::RunningTable;
use crate::core::store::QueueStore;
use crate::core::task::{TaskId, TaskStatus};

/// What to do at startup with `running` rows no live process backs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrphanPolicy {
    /// Warn in the operator log and leave the rows for manual reconciliation.
    #[default]
    Report,
    /// Mark the rows failed.
    Fail,
}

/// Limits and timing fixed at startup.
#[derive(Debug, Clone)]
pub struct DispatcherSettings {
    /// Global concurrency ceiling.
    pub max_global_concurrent: usize,
    /// CPU utilization above which nothing new is admitted.
    pub cpu_threshold_percent: f32,
    /// Sleep between cycles.
    pub poll_interval: Duration,
    /// Shell used as `<shell> -c <command>`.
    pub shell: String,
    /// Startup handling of orphaned `running` rows.
    pub orphan_policy: OrphanPolicy,
}

impl Default for DispatcherSettings {
    fn default() -> Self {
        Self {
            max_global_concurrent: 3,
            cpu_threshold_percent: 90.0,
            poll_interval: Duration::from_secs(5),
            shell: DEFAULT_SHELL.to_string(),
            orphan_policy: OrphanPolicy::Report,
        }
    }
}

/// What one cycle did.
#[derive(Debug, Clone, Default)]
pub struct CycleReport {
    /// Processes finalized by the reaper.
    pub reaped: Vec<ReapedTask>,
    /// Tasks started this cycle.
    pub launched: Vec<TaskId>,
    /// Tasks failed this cycle without running (unknown type, spawn error).
    pub failed: Vec<TaskId>,
    /// Tasks left pending for a later cycle.
    pub deferred: Vec<TaskId>,
    /// Whether fetching pending tasks failed.
    pub fetch_failed: bool,
}

/// Single-threaded task dispatcher.
pub struct Dispatcher<S, L> {
    store: S,
    load: L,
    registry: TaskRegistry,
    admission: AdmissionController,
    launcher: Launcher,
    running: RunningTable,
    audit: AuditLog,
    poll_interval: Duration,
    orphan_policy: OrphanPolicy,
}

impl<S, L> Dispatcher<S, L>
where
    S: QueueStore,
    L: LoadSampler,
{
    /// Assemble a dispatcher from its collaborators.
    pub fn new(
        store: S,
        load: L,
        registry: TaskRegistry,
        settings: DispatcherSettings,
        audit: AuditLog,
    ) -> Self {
        Self {
            store,
            load,
            registry,
            admission: AdmissionController::new(
                settings.max_global_concurrent,
                settings.cpu_threshold_percent,
            ),
            launcher: Launcher::new(settings.shell),
            running: RunningTable::new(),
            audit,
            poll_interval: settings.poll_interval,
            orphan_policy: settings.orphan_policy,
        }
    }

    /// Processes currently tracked.
    pub const fn running(&self) -> &RunningTable {
        &self.running
    }

    /// Registered task types.
    pub const fn registry(&self) -> &TaskRegistry {
        &self.registry
    }

    /// Backing store.
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Run one reap → fetch → admit → launch pass.
    pub fn run_cycle(&mut self) -> CycleReport {
        let mut report = CycleReport {
            reaped: reap(&mut self.running, &self.store, &mut self.audit),
            ..CycleReport::default()
        };

        let pending = match self.store.fetch_pending() {
            Ok(tasks) => tasks,
            Err(e) => {
                self.audit.store_error(None, "fetch pending", &e);
                report.fetch_failed = true;
                Vec::new()
            }
        };

        for task in pending {
            // Still pending in the store until its `running` write succeeds.
            if self.running.tracks_task(task.id) {
                continue;
            }

            let decision = self
                .admission
                .evaluate(&task, &self.registry, &self.running, &mut self.load);
            self.audit.admission(&task, &decision);

            let launch = match &decision {
                Admission::Admit => true,
                Admission::Reject(reason) => reason.is_terminal(),
            };
            if !launch {
                report.deferred.push(task.id);
                continue;
            }

            match self.launcher.start(
                &task,
                &self.registry,
                &mut self.running,
                &self.store,
                &mut self.audit,
            ) {
                LaunchOutcome::Started { .. } => report.launched.push(task.id),
                LaunchOutcome::Failed { .. } => report.failed.push(task.id),
            }
        }

        tracing::debug!(
            reaped = report.reaped.len(),
            launched = report.launched.len(),
            failed = report.failed.len(),
            deferred = report.deferred.len(),
            running = self.running.len(),
            "cycle complete"
        );
        report
    }

    /// Find `running` rows with no tracked process and apply the orphan policy.
    ///
    /// Returns the ids of the orphaned rows.
    pub fn reconcile_orphans(&mut self) -> Vec<TaskId> {
        let rows = match self.store.fetch_running() {
            Ok(rows) => rows,
            Err(e) => {
                self.audit.store_error(None, "fetch running", &e);
                return Vec::new();
            }
        };

        let mut orphans = Vec::new();
        for task in rows {
            if self.running.tracks_task(task.id) {
                continue;
            }
            let last = if task.log.is_empty() { "no pid recorded" } else { task.log.as_str() };
            match self.orphan_policy {
                OrphanPolicy::Report => {
                    let detail = format!(
                        "left running by a previous dispatcher ({last}); \
                         needs manual reconciliation"
                    );
                    self.audit.orphaned(&task, &detail);
                }
                OrphanPolicy::Fail => {
                    let log = format!("orphaned by dispatcher restart ({last})");
                    if let Err(e) = self.store.update_status(task.id, TaskStatus::Failed, &log) {
                        self.audit.store_error(Some(task.id), "fail orphan", &e);
                    }
                    self.audit.orphaned(&task, &log);
                }
            }
            orphans.push(task.id);
        }
        orphans
    }

    /// Announce startup and reconcile orphans left by a previous instance.
    pub fn start(&mut self) {
        let detail = format!(
            "types=[{}] max_global={} poll_interval={:?} orphan_policy={:?}",
            self.registry.names().join(","),
            self.admission.max_global(),
            self.poll_interval,
            self.orphan_policy
        );
        self.audit.dispatcher_started(detail);
        let orphans = self.reconcile_orphans();
        if !orphans.is_empty() {
            tracing::warn!(count = orphans.len(), "found orphaned running tasks");
        }
    }

    /// Run forever. The only way out is terminating the process.
    pub fn run(&mut self) -> ! {
        self.start();
        loop {
            self.run_cycle();
            std::thread::sleep(self.poll_interval);
        }
    }
}
