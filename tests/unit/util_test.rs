//! Tests for utility functions

use task_dispatcher::core::{render_command, Parameters};
use task_dispatcher::util::telemetry::{init_tracing, DEFAULT_FILTER};

#[test]
fn test_default_filter_names_operator_target() {
    assert!(DEFAULT_FILTER.contains("dispatcher::operator=info"));
    assert!(DEFAULT_FILTER.starts_with("warn"));
}

#[test]
fn test_init_tracing_twice_is_harmless() {
    init_tracing();
    init_tracing();
    tracing::info!("tracing initialized");
}

#[test]
fn test_render_command_with_parameters() {
    let mut params = Parameters::new();
    params.insert("src".to_string(), "/data".to_string());
    params.insert("dest".to_string(), "/backup/data.tgz".to_string());

    assert_eq!(
        render_command("tar czf {dest} {src}", &params),
        "tar czf /backup/data.tgz /data"
    );
}
