//! Converters from schema source files to schema entries.
//!
//! Converters are kept in a static table keyed by file extension. The
//! loader asks the table for the converter matching each file it finds;
//! new source formats are added by registering another converter.

use std::io;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::error::{SchemaError, SchemaResult};
use crate::fileio::FileAccess;
use crate::plugin::PluginRegistry;
use crate::schema::{CallableSchema, DataSchema, SchemaEntry};

/// Turns the content of one source file into a schema entry.
#[async_trait]
pub trait SchemaConverter: Send + Sync {
    /// File extensions handled, each with a leading dot.
    fn extensions(&self) -> &[&str];

    /// Convert a file. The returned entry must be named `name`.
    async fn convert(&self, path: &Path, name: &str, files: &dyn FileAccess) -> SchemaResult<SchemaEntry>;
}

/// Read a source file, reporting content that is not UTF-8 as malformed.
async fn read_source(files: &dyn FileAccess, path: &Path) -> SchemaResult<String> {
    match files.read_file(path).await {
        Err(SchemaError::Io(e)) if e.kind() == io::ErrorKind::InvalidData => {
            Err(SchemaError::malformed(path, e))
        }
        other => other,
    }
}

/// Converts JSON documents into data schemas.
#[derive(Debug, Default)]
pub struct JsonConverter;

#[async_trait]
impl SchemaConverter for JsonConverter {
    fn extensions(&self) -> &[&str] {
        &[".json"]
    }

    async fn convert(&self, path: &Path, name: &str, files: &dyn FileAccess) -> SchemaResult<SchemaEntry> {
        let text = read_source(files, path).await?;
        let value: Value =
            serde_json::from_str(&text).map_err(|e| SchemaError::malformed(path, e))?;
        Ok(SchemaEntry::Data(DataSchema::from_source(name, value)))
    }
}

/// Converts YAML documents into data schemas.
#[derive(Debug, Default)]
pub struct YamlConverter;

#[async_trait]
impl SchemaConverter for YamlConverter {
    fn extensions(&self) -> &[&str] {
        &[".yaml", ".yml"]
    }

    async fn convert(&self, path: &Path, name: &str, files: &dyn FileAccess) -> SchemaResult<SchemaEntry> {
        let text = read_source(files, path).await?;
        let value: Value =
            serde_yaml::from_str(&text).map_err(|e| SchemaError::malformed(path, e))?;
        Ok(SchemaEntry::Data(DataSchema::from_source(name, value)))
    }
}

/// Binds a `.plugin` file to a function from the [`PluginRegistry`].
///
/// The file holds the name of the registered function. An empty file
/// selects the function registered under the schema's own name.
#[derive(Debug)]
pub struct PluginConverter {
    plugins: Arc<PluginRegistry>,
}

impl PluginConverter {
    pub fn new(plugins: Arc<PluginRegistry>) -> Self {
        Self { plugins }
    }
}

#[async_trait]
impl SchemaConverter for PluginConverter {
    fn extensions(&self) -> &[&str] {
        &[".plugin"]
    }

    async fn convert(&self, path: &Path, name: &str, files: &dyn FileAccess) -> SchemaResult<SchemaEntry> {
        let text = read_source(files, path).await?;
        let function_name = match text.trim() {
            "" => name,
            declared => declared,
        };

        let function = self.plugins.get(function_name).ok_or_else(|| {
            SchemaError::Configuration(format!(
                "No plugin registered as '{}' (required by {})",
                function_name,
                path.display()
            ))
        })?;

        debug!("Bound schema '{}' to plugin '{}'", name, function_name);
        Ok(SchemaEntry::Callable(CallableSchema::new(name, function)))
    }
}

/// Table of converters, searched in registration order.
#[derive(Default)]
pub struct ConverterRegistry {
    converters: Vec<Arc<dyn SchemaConverter>>,
}

impl ConverterRegistry {
    /// Extensions handled by [`ConverterRegistry::standard`].
    pub const STANDARD_EXTENSIONS: [&'static str; 4] = [".json", ".yaml", ".yml", ".plugin"];

    /// Create a table with no converters.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The built-in converters: plugins, JSON and YAML.
    pub fn standard(plugins: Arc<PluginRegistry>) -> Self {
        Self::empty()
            .with(Arc::new(PluginConverter::new(plugins)))
            .with(Arc::new(JsonConverter))
            .with(Arc::new(YamlConverter))
    }

    pub fn register(&mut self, converter: Arc<dyn SchemaConverter>) {
        debug!("Registering converter for {:?}", converter.extensions());
        self.converters.push(converter);
    }

    pub fn with(mut self, converter: Arc<dyn SchemaConverter>) -> Self {
        self.register(converter);
        self
    }

    /// Find the first converter handling `extension` (with leading dot).
    pub fn find(&self, extension: &str) -> Option<Arc<dyn SchemaConverter>> {
        self.converters
            .iter()
            .find(|c| c.extensions().contains(&extension))
            .cloned()
    }

    /// All extensions handled by the table.
    pub fn extensions(&self) -> Vec<String> {
        let mut extensions: Vec<String> = Vec::new();
        for converter in &self.converters {
            for extension in converter.extensions() {
                if !extensions.iter().any(|e| e == extension) {
                    extensions.push(extension.to_string());
                }
            }
        }
        extensions
    }

    pub fn len(&self) -> usize {
        self.converters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.converters.is_empty()
    }
}

impl std::fmt::Debug for ConverterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConverterRegistry")
            .field("extensions", &self.extensions())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryFileAccess;
    use serde_json::json;

    fn plugins() -> Arc<PluginRegistry> {
        Arc::new(PluginRegistry::new().with_fn("double", |args: &[Value]| {
            Ok(json!(args[0].as_i64().unwrap_or_default() * 2))
        }))
    }

    #[tokio::test]
    async fn test_json_converter_strips_target() {
        let files = MemoryFileAccess::new().with_file(
            "schema/header-schema.json",
            r#"{"for": "header", "name": "Header", "settings": []}"#,
        );

        let entry = JsonConverter
            .convert(Path::new("schema/header-schema.json"), "header", &files)
            .await
            .unwrap();

        match entry {
            SchemaEntry::Data(data) => {
                assert_eq!(data.name, "header");
                assert_eq!(data.target(), Some("header"));
                assert_eq!(data.value, json!({"name": "Header", "settings": []}));
            }
            other => panic!("expected data schema, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_json_converter_malformed() {
        let files = MemoryFileAccess::new().with_file("schema/bad-schema.json", "{ not json");

        let result = JsonConverter
            .convert(Path::new("schema/bad-schema.json"), "bad", &files)
            .await;

        match result {
            Err(SchemaError::MalformedSource { path, .. }) => {
                assert_eq!(path, Path::new("schema/bad-schema.json"));
            }
            other => panic!("expected malformed source, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_non_utf8_source_is_malformed() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("latin-schema.json");
        std::fs::write(&path, b"{\"name\": \"caf\xe9\"}").unwrap();

        let result = JsonConverter
            .convert(&path, "latin", &crate::fileio::StdFileAccess::new())
            .await;

        match result {
            Err(SchemaError::MalformedSource { path: reported, .. }) => assert_eq!(reported, path),
            other => panic!("expected malformed source, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_yaml_converter_keeps_key_order() {
        let files = MemoryFileAccess::new().with_file(
            "schema/footer-schema.yaml",
            "for: footer\nname: Footer\nsettings:\n  - from: colors\n",
        );

        let entry = YamlConverter
            .convert(Path::new("schema/footer-schema.yaml"), "footer", &files)
            .await
            .unwrap();

        let SchemaEntry::Data(data) = entry else {
            panic!("expected data schema");
        };
        assert_eq!(data.target(), Some("footer"));
        let keys: Vec<&String> = data.value.as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["name", "settings"]);
    }

    #[tokio::test]
    async fn test_plugin_converter_binds_function() {
        let files = MemoryFileAccess::new()
            .with_file("schema/double-schema.plugin", "")
            .with_file("schema/twice-schema.plugin", "double\n");
        let converter = PluginConverter::new(plugins());

        for (file, name) in [("double-schema.plugin", "double"), ("twice-schema.plugin", "twice")] {
            let path = Path::new("schema").join(file);
            let entry = converter.convert(&path, name, &files).await.unwrap();
            let SchemaEntry::Callable(callable) = entry else {
                panic!("expected callable schema");
            };
            assert_eq!(callable.name, name);
            assert_eq!(
                callable.invoke(&crate::schema::Args::Single(json!(4))).unwrap(),
                json!(8)
            );
        }
    }

    #[tokio::test]
    async fn test_plugin_converter_unknown_function() {
        let files = MemoryFileAccess::new().with_file("schema/triple-schema.plugin", "");

        let result = PluginConverter::new(plugins())
            .convert(Path::new("schema/triple-schema.plugin"), "triple", &files)
            .await;

        assert!(matches!(result, Err(SchemaError::Configuration(_))));
    }

    #[test]
    fn test_registry_lookup_by_extension() {
        let registry = ConverterRegistry::standard(plugins());

        assert_eq!(registry.len(), 3);
        assert!(registry.find(".json").is_some());
        assert!(registry.find(".yml").is_some());
        assert!(registry.find(".plugin").is_some());
        assert!(registry.find(".js").is_none());
        assert_eq!(
            registry.extensions(),
            vec![".plugin", ".json", ".yaml", ".yml"]
        );
    }

    #[test]
    fn test_empty_registry() {
        let registry = ConverterRegistry::empty();
        assert!(registry.is_empty());
        assert!(registry.find(".json").is_none());
    }
}
