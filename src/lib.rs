//! # Task Dispatcher
//!
//! A single-host scheduler that turns rows of a persistent task queue into
//! operating-system processes.
//!
//! Each cycle the dispatcher reaps finished processes, fetches pending tasks
//! oldest first, decides for each whether it may start now, launches the
//! admitted ones through a shell, and sleeps. Task status only moves forward:
//! `pending → running → success | failed` (a task that cannot be launched goes
//! straight from `pending` to `failed`).
//!
//! ## Admission
//!
//! A task starts only when all of these hold:
//!
//! - **Known type**: its `process_type` is in the [`core::TaskRegistry`]
//!   (otherwise it is failed immediately and never retried)
//! - **Per-type limit**: fewer than `max_concurrent` of its type are running
//! - **Global limit**: fewer than `max_global_concurrent` processes are running
//! - **Host load**: CPU utilization, freshly sampled, is at or below the threshold
//!
//! Tasks that fail a capacity check stay `pending` and are reconsidered next cycle.
//!
//! ## Audit streams
//!
//! Two append-only streams are written: a detailed operator log (every
//! admission decision, launch, completion and store problem, also mirrored to
//! `tracing`) and a client log with one line per start and per finish.
//!
//! ```rust,ignore
//! use task_dispatcher::core::{
//!     AuditLog, Dispatcher, DispatcherSettings, TaskRegistry, TaskTypeDescriptor,
//! };
//! use task_dispatcher::infra::{InMemoryQueueStore, ProcStatSampler};
//!
//! let registry = TaskRegistry::new()
//!     .with(TaskTypeDescriptor::new("echo", "echo {msg}").with_max_concurrent(2))?;
//! let audit = AuditLog::to_files("dispatcher_operator.log", "dispatcher_client.log")?;
//! let mut dispatcher = Dispatcher::new(
//!     InMemoryQueueStore::new(),
//!     ProcStatSampler::default(),
//!     registry,
//!     DispatcherSettings::default(),
//!     audit,
//! );
//! dispatcher.run();
//! ```
//!
//! For complete scenarios, see `tests/dispatch_cycle_test.rs`.

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Core dispatch abstractions: tasks, registry, admission, launching, reaping.
pub mod core;
/// Configuration models for limits, task types, stores and audit logs.
pub mod config;
/// Builders to construct dispatcher components from configuration.
pub mod builders;
/// Infrastructure adapters for queue stores and host load sampling.
pub mod infra;
/// Shared utilities.
pub mod util;
