//! Static registry of launchable task types.

use std::collections::HashMap;

use crate::core::DispatchError;

/// Configuration for one task type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskTypeDescriptor {
    /// Type name, matched against `Task::process_type`.
    pub name: String,
    /// Command with `{placeholder}`s filled from task parameters.
    pub command_template: String,
    /// Maximum simultaneously running tasks of this type.
    pub max_concurrent: usize,
}

impl TaskTypeDescriptor {
    /// Descriptor with the default concurrency limit of 1.
    pub fn new(name: impl Into<String>, command_template: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            command_template: command_template.into(),
            max_concurrent: 1,
        }
    }

    /// Override the per-type concurrency limit.
    #[must_use]
    pub const fn with_max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent;
        self
    }
}

/// Mapping from type name to descriptor. Empty unless populated at startup.
#[derive(Debug, Clone, Default)]
pub struct TaskRegistry {
    types: HashMap<String, TaskTypeDescriptor>,
}

impl TaskRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a descriptor, rejecting duplicates and zero limits.
    pub fn register(&mut self, descriptor: TaskTypeDescriptor) -> Result<(), DispatchError> {
        if descriptor.max_concurrent == 0 {
            return Err(DispatchError::Config(format!(
                "task type `{}`: max_concurrent must be greater than 0",
                descriptor.name
            )));
        }
        if self.types.contains_key(&descriptor.name) {
            return Err(DispatchError::Config(format!(
                "task type `{}` registered twice",
                descriptor.name
            )));
        }
        self.types.insert(descriptor.name.clone(), descriptor);
        Ok(())
    }

    /// Builder-style registration.
    pub fn with(mut self, descriptor: TaskTypeDescriptor) -> Result<Self, DispatchError> {
        self.register(descriptor)?;
        Ok(self)
    }

    /// Look up a descriptor by type name.
    pub fn get(&self, name: &str) -> Option<&TaskTypeDescriptor> {
        self.types.get(name)
    }

    /// Registered type names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.types.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Number of registered types.
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Whether no types are registered.
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}
