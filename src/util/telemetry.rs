//! Telemetry helpers for structured logging and tracing.

use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset: operator lines at info, the rest of
/// the crate at info, dependencies at warn.
pub const DEFAULT_FILTER: &str = "warn,task_dispatcher=info,dispatcher::operator=info";

/// Install a stderr `fmt` subscriber driven by `RUST_LOG`, unless the caller
/// already installed one.
pub fn init_tracing() {
    if tracing::dispatcher::has_been_set() {
        return;
    }
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .try_init();
}
