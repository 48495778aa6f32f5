//! Admission control: may a pending task start right now?
//!
//! Checks run cheapest first. The host CPU sample is taken last, at most once
//! per evaluation, and only when every in-memory check has passed.

use std::fmt;

use crate::core::registry::TaskRegistry;
use crate::core::running::RunningTable;
use crate::core::task::Task;
use crate::core::DispatchError;

/// Source of instantaneous host CPU utilization.
pub trait LoadSampler {
    /// Current CPU utilization in percent (0-100).
    ///
    /// Implementations may block for a short, fixed window.
    fn cpu_percent(&mut self) -> Result<f32, DispatchError>;
}

impl<T: LoadSampler + ?Sized> LoadSampler for Box<T> {
    fn cpu_percent(&mut self) -> Result<f32, DispatchError> {
        (**self).cpu_percent()
    }
}

/// Read-only view of what is currently running.
pub trait RunningCounts {
    /// Total running processes.
    fn total(&self) -> usize;
    /// Running processes of one type.
    fn of_type(&self, process_type: &str) -> usize;
}

impl RunningCounts for RunningTable {
    fn total(&self) -> usize {
        self.len()
    }

    fn of_type(&self, process_type: &str) -> usize {
        self.count_of_type(process_type)
    }
}

/// Why a task was not admitted.
#[derive(Debug, Clone, PartialEq)]
pub enum RejectReason {
    /// No descriptor for the task type. Terminal.
    UnknownType,
    /// Per-type concurrency limit reached.
    TypeSaturated {
        /// Running tasks of this type.
        running: usize,
        /// Descriptor limit.
        max: usize,
    },
    /// Global concurrency ceiling reached.
    GlobalSaturated {
        /// Running tasks overall.
        running: usize,
        /// Configured ceiling.
        max: usize,
    },
    /// Host CPU above threshold.
    HostOverloaded {
        /// Sampled utilization.
        cpu_percent: f32,
        /// Configured threshold.
        threshold: f32,
    },
}

impl RejectReason {
    /// Whether the task must be failed rather than retried next cycle.
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::UnknownType)
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownType => write!(f, "unknown task type"),
            Self::TypeSaturated { running, max } => {
                write!(f, "type concurrency limit reached ({running}/{max})")
            }
            Self::GlobalSaturated { running, max } => {
                write!(f, "global concurrency limit reached ({running}/{max})")
            }
            Self::HostOverloaded { cpu_percent, threshold } => {
                write!(f, "host cpu {cpu_percent:.1}% above threshold {threshold:.1}%")
            }
        }
    }
}

/// Result of one admission evaluation.
#[derive(Debug, Clone, PartialEq)]
pub enum Admission {
    /// Start the task now.
    Admit,
    /// Do not start the task now.
    Reject(RejectReason),
}

impl Admission {
    /// Boolean view of the decision.
    pub const fn is_admitted(&self) -> bool {
        matches!(self, Self::Admit)
    }
}

/// Global admission limits, fixed at startup.
#[derive(Debug, Clone, Copy)]
pub struct AdmissionController {
    max_global: usize,
    cpu_threshold_percent: f32,
}

impl AdmissionController {
    /// Create a controller with a global ceiling and a CPU threshold.
    pub const fn new(max_global: usize, cpu_threshold_percent: f32) -> Self {
        Self {
            max_global,
            cpu_threshold_percent,
        }
    }

    /// Configured global ceiling.
    pub const fn max_global(&self) -> usize {
        self.max_global
    }

    /// Decide whether `task` may start.
    pub fn evaluate<R, L>(
        &self,
        task: &Task,
        registry: &TaskRegistry,
        running: &R,
        load: &mut L,
    ) -> Admission
    where
        R: RunningCounts + ?Sized,
        L: LoadSampler + ?Sized,
    {
        let Some(descriptor) = registry.get(&task.process_type) else {
            return Admission::Reject(RejectReason::UnknownType);
        };

        let of_type = running.of_type(&task.process_type);
        if of_type >= descriptor.max_concurrent {
            return Admission::Reject(RejectReason::TypeSaturated {
                running: of_type,
                max: descriptor.max_concurrent,
            });
        }

        let total = running.total();
        if total >= self.max_global {
            return Admission::Reject(RejectReason::GlobalSaturated {
                running: total,
                max: self.max_global,
            });
        }

        match load.cpu_percent() {
            Ok(cpu) if cpu > self.cpu_threshold_percent => {
                Admission::Reject(RejectReason::HostOverloaded {
                    cpu_percent: cpu,
                    threshold: self.cpu_threshold_percent,
                })
            }
            Ok(_) => Admission::Admit,
            Err(e) => {
                tracing::warn!(
                    task_id = task.id,
                    error = %e,
                    "cpu sample unavailable, skipping load check"
                );
                Admission::Admit
            }
        }
    }

    /// Boolean shorthand for [`AdmissionController::evaluate`].
    pub fn can_run<R, L>(
        &self,
        task: &Task,
        registry: &TaskRegistry,
        running: &R,
        load: &mut L,
    ) -> bool
    where
        R: RunningCounts + ?Sized,
        L: LoadSampler + ?Sized,
    {
        self.evaluate(task, registry, running, load).is_admitted()
    }
}
