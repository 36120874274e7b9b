//! Plugin registry for callable schemas.
//!
//! Callable schemas are plain Rust functions registered by name at startup.
//! A `<name>-schema.plugin` file in the schema directory opts a registered
//! function into the run; nothing is ever loaded or executed from disk.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

/// A function that can be referenced from a schema through `from`.
///
/// `args` holds the positional arguments taken from the reference's `args`
/// field: every element of an array, a single non-array value, or nothing.
#[cfg_attr(test, mockall::automock)]
pub trait SchemaFunction: Send + Sync {
    fn invoke(&self, args: &[Value]) -> anyhow::Result<Value>;
}

impl<F> SchemaFunction for F
where
    F: Fn(&[Value]) -> anyhow::Result<Value> + Send + Sync,
{
    fn invoke(&self, args: &[Value]) -> anyhow::Result<Value> {
        self(args)
    }
}

/// A registry of named schema functions.
#[derive(Default, Clone)]
pub struct PluginRegistry {
    functions: HashMap<String, Arc<dyn SchemaFunction>>,
}

impl PluginRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            functions: HashMap::new(),
        }
    }

    /// Register a function under a name.
    ///
    /// If a function with the same name already exists, it will be replaced.
    pub fn register(&mut self, name: impl Into<String>, function: Arc<dyn SchemaFunction>) {
        let name = name.into();
        debug!("Registering plugin: {}", name);
        self.functions.insert(name, function);
    }

    /// Register a closure under a name.
    pub fn register_fn<F>(&mut self, name: impl Into<String>, function: F)
    where
        F: Fn(&[Value]) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        self.register(name, Arc::new(function));
    }

    /// Builder form of [`register_fn`](Self::register_fn).
    pub fn with_fn<F>(mut self, name: impl Into<String>, function: F) -> Self
    where
        F: Fn(&[Value]) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        self.register_fn(name, function);
        self
    }

    /// Get a function by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn SchemaFunction>> {
        self.functions.get(name).cloned()
    }

    /// Check if a function is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    /// Get all registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.functions.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

impl std::fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginRegistry")
            .field("functions", &self.names())
            .finish()
    }
}
