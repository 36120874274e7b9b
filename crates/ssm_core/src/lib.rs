//! # ssm_core
//!
//! Schema registry and reference resolution for section templates.
//!
//! A run reads `<name>-schema.*` files from a schema directory, substitutes
//! `from` references between them, and writes every schema that names a
//! target (`"for": "header"`) into the `{% schema %} ... {% endschema %}`
//! region of the matching template (`header.liquid`).
//!
//! - **Converters** turn source files into schema entries by extension
//! - **Plugins** are Rust functions exposed as callable schemas
//! - **Loader** builds the per-run [`Registry`]
//! - **Resolver** performs the one-hop `from` substitution
//! - **Writer** splices resolved schemas into template files
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! use serde_json::{json, Value};
//! use ssm_core::{PluginRegistry, SchemaEngine, StdFileAccess};
//!
//! # async fn run() -> ssm_core::SchemaResult<()> {
//! let plugins = PluginRegistry::new().with_fn("double", |args: &[Value]| {
//!     Ok(json!(args.first().and_then(Value::as_i64).unwrap_or_default() * 2))
//! });
//!
//! let outcome = SchemaEngine::new(Arc::new(StdFileAccess::new()))
//!     .with_plugins(plugins)
//!     .run(Path::new("schema"), Path::new("sections"))
//!     .await?;
//!
//! println!("wrote files: {}", outcome.wrote_any());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod converter;
pub mod engine;
pub mod error;
pub mod fileio;
pub mod loader;
pub mod memory;
pub mod plugin;
pub mod resolver;
pub mod schema;
pub mod writer;

pub use config::{SsmConfig, WriteMode, WriterConfig};
pub use converter::{ConverterRegistry, JsonConverter, PluginConverter, SchemaConverter, YamlConverter};
pub use engine::{RunOutcome, SchemaEngine};
pub use error::{SchemaError, SchemaResult};
pub use fileio::{splice_region, DryRunFileAccess, FileAccess, FileFilter, RegionWrite, StdFileAccess};
pub use loader::SchemaLoader;
pub use memory::MemoryFileAccess;
pub use plugin::{PluginRegistry, SchemaFunction};
pub use resolver::SchemaResolver;
pub use schema::{
    schema_name, Args, CallableSchema, DataSchema, Lookup, Reference, Registry, SchemaEntry,
    SchemaKind,
};
pub use writer::{ApplyReport, TargetWriter};
