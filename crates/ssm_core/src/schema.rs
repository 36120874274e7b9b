//! Schema entries, references and the per-run registry.

use std::path::Path;
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::error::{SchemaError, SchemaResult};
use crate::plugin::SchemaFunction;

/// Filename suffix (before the extension) that marks a schema source file.
pub const SCHEMA_SUFFIX: &str = "-schema";

/// Field of a data schema naming the template it is written into.
pub const TARGET_FIELD: &str = "for";

/// Field holding an ordered sequence of settings.
pub const SETTINGS_FIELD: &str = "settings";

/// Field holding an ordered sequence of blocks.
pub const BLOCKS_FIELD: &str = "blocks";

/// Field naming the schema a setting or block is taken from.
pub const FROM_FIELD: &str = "from";

/// Field carrying the arguments passed to a callable schema.
pub const ARGS_FIELD: &str = "args";

/// Derive a schema name from its source filename.
///
/// The extension is dropped, then a trailing `-schema`:
/// `colors-schema.json` becomes `colors`.
pub fn schema_name(filename: &str) -> String {
    let stem = Path::new(filename)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(filename);
    stem.strip_suffix(SCHEMA_SUFFIX).unwrap_or(stem).to_string()
}

/// The two kinds of schema entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaKind {
    Callable,
    Data,
}

impl std::fmt::Display for SchemaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SchemaKind::Callable => write!(f, "callable"),
            SchemaKind::Data => write!(f, "data"),
        }
    }
}

/// Arguments supplied with a reference.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Args {
    /// No `args` field.
    #[default]
    None,
    /// An array, spread into positional arguments.
    Positional(Vec<Value>),
    /// Any other value, passed as the only argument.
    Single(Value),
}

impl Args {
    pub fn from_value(args: Option<&Value>) -> Self {
        match args {
            None => Args::None,
            Some(Value::Array(items)) => Args::Positional(items.clone()),
            Some(other) => Args::Single(other.clone()),
        }
    }

    /// The arguments as they are handed to a [`SchemaFunction`].
    pub fn as_slice(&self) -> &[Value] {
        match self {
            Args::None => &[],
            Args::Positional(items) => items,
            Args::Single(value) => std::slice::from_ref(value),
        }
    }
}

/// A `from` reference found in a setting or block.
#[derive(Debug, Clone, PartialEq)]
pub struct Reference {
    pub name: String,
    pub args: Args,
}

impl Reference {
    /// Parse a reference out of a settings or blocks entry.
    ///
    /// Only a non-empty string `from` counts; anything else leaves the
    /// entry untouched.
    pub fn parse(entry: &Value) -> Option<Self> {
        let name = entry.get(FROM_FIELD)?.as_str()?;
        if name.is_empty() {
            return None;
        }
        Some(Self {
            name: name.to_string(),
            args: Args::from_value(entry.get(ARGS_FIELD)),
        })
    }
}

/// A schema backed by a registered function.
#[derive(Clone)]
pub struct CallableSchema {
    pub name: String,
    function: Arc<dyn SchemaFunction>,
}

impl CallableSchema {
    pub fn new(name: impl Into<String>, function: Arc<dyn SchemaFunction>) -> Self {
        Self {
            name: name.into(),
            function,
        }
    }

    /// Call the function with the reference's arguments.
    pub fn invoke(&self, args: &Args) -> SchemaResult<Value> {
        debug!(
            "Invoking callable schema '{}' with {} argument(s)",
            self.name,
            args.as_slice().len()
        );
        self.function
            .invoke(args.as_slice())
            .map_err(|e| SchemaError::CallableFailed {
                name: self.name.clone(),
                message: format!("{:#}", e),
            })
    }
}

impl std::fmt::Debug for CallableSchema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallableSchema")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// A schema holding a structured value.
#[derive(Debug, Clone, PartialEq)]
pub struct DataSchema {
    pub name: String,
    /// Template the value is written into, without extension.
    pub target: Option<String>,
    pub value: Value,
}

impl DataSchema {
    pub fn new(name: impl Into<String>, value: Value) -> Self {
        Self {
            name: name.into(),
            target: None,
            value,
        }
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    /// Build a data schema from a parsed source document.
    ///
    /// A top-level `for` field is removed from the value. When it is a
    /// non-empty string it becomes the target.
    pub fn from_source(name: impl Into<String>, mut value: Value) -> Self {
        let name = name.into();
        let target = match value.as_object_mut().and_then(|o| o.shift_remove(TARGET_FIELD)) {
            Some(Value::String(target)) if !target.is_empty() => Some(target),
            Some(Value::String(_)) | None => None,
            Some(other) => {
                tracing::warn!(
                    "Ignoring non-string '{}' field in schema '{}': {}",
                    TARGET_FIELD,
                    name,
                    other
                );
                None
            }
        };
        Self {
            name,
            target,
            value,
        }
    }

    /// The target name, if present and non-empty.
    pub fn target(&self) -> Option<&str> {
        self.target.as_deref().filter(|t| !t.is_empty())
    }
}

/// One named unit loaded from one source file.
#[derive(Debug, Clone)]
pub enum SchemaEntry {
    Callable(CallableSchema),
    Data(DataSchema),
}

impl SchemaEntry {
    pub fn name(&self) -> &str {
        match self {
            SchemaEntry::Callable(c) => &c.name,
            SchemaEntry::Data(d) => &d.name,
        }
    }

    pub fn kind(&self) -> SchemaKind {
        match self {
            SchemaEntry::Callable(_) => SchemaKind::Callable,
            SchemaEntry::Data(_) => SchemaKind::Data,
        }
    }
}

/// Result of looking a name up across both namespaces.
#[derive(Debug, Clone, Copy)]
pub enum Lookup<'a> {
    Callable(&'a CallableSchema),
    Data(&'a DataSchema),
}

/// All schemas loaded for one run.
///
/// Callables and data keep their load order. The registry is built by the
/// loader, mutated in place by the resolver and consumed by the writer.
#[derive(Debug, Default)]
pub struct Registry {
    callables: Vec<CallableSchema>,
    data: Vec<DataSchema>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry to the collection of its kind.
    ///
    /// Names must be unique within a kind.
    pub fn insert(&mut self, entry: SchemaEntry) -> SchemaResult<()> {
        let kind = entry.kind();
        if self.contains(kind, entry.name()) {
            return Err(SchemaError::Configuration(format!(
                "Duplicate {} schema '{}'",
                kind,
                entry.name()
            )));
        }
        debug!("Registered {} schema '{}'", kind, entry.name());
        match entry {
            SchemaEntry::Callable(c) => self.callables.push(c),
            SchemaEntry::Data(d) => self.data.push(d),
        }
        Ok(())
    }

    fn contains(&self, kind: SchemaKind, name: &str) -> bool {
        match kind {
            SchemaKind::Callable => self.callables.iter().any(|c| c.name == name),
            SchemaKind::Data => self.data.iter().any(|d| d.name == name),
        }
    }

    pub fn callables(&self) -> &[CallableSchema] {
        &self.callables
    }

    pub fn data(&self) -> &[DataSchema] {
        &self.data
    }

    pub(crate) fn data_mut(&mut self) -> &mut [DataSchema] {
        &mut self.data
    }

    pub fn into_data(self) -> Vec<DataSchema> {
        self.data
    }

    pub fn len(&self) -> usize {
        self.callables.len() + self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.callables.is_empty() && self.data.is_empty()
    }

    /// Find a schema by name. Callables are checked before data.
    pub fn find(&self, name: &str) -> Option<Lookup<'_>> {
        if let Some(callable) = self.callables.iter().find(|c| c.name == name) {
            return Some(Lookup::Callable(callable));
        }
        self.data.iter().find(|d| d.name == name).map(Lookup::Data)
    }

    /// Resolve a reference to a value.
    ///
    /// A callable is invoked with `args`; a data schema yields a copy of
    /// its current value.
    pub fn lookup(&self, name: &str, args: &Args) -> SchemaResult<Value> {
        match self.find(name) {
            Some(Lookup::Callable(callable)) => callable.invoke(args),
            Some(Lookup::Data(data)) => Ok(data.value.clone()),
            None => Err(SchemaError::ReferenceNotFound(name.to_string())),
        }
    }
}
