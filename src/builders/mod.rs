//! Builders to construct dispatcher components from configuration.

pub mod dispatcher_builder;

pub use dispatcher_builder::{build_dispatcher, build_load_sampler, build_registry, open_store};
