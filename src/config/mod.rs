//! Configuration models for the registry, limits, store and audit logs.

pub mod dispatcher;

pub use dispatcher::{AuditLogConfig, DispatcherConfig, StoreBackendConfig, TaskTypeConfig};
