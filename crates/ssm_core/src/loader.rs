//! Schema loading functionality.

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info};

use crate::converter::ConverterRegistry;
use crate::error::{SchemaError, SchemaResult};
use crate::fileio::{FileAccess, FileFilter};
use crate::schema::{schema_name, Registry, SchemaEntry, SCHEMA_SUFFIX};

/// Loads a directory of schema source files into a [`Registry`].
pub struct SchemaLoader {
    files: Arc<dyn FileAccess>,
    converters: Arc<ConverterRegistry>,
}

impl SchemaLoader {
    /// Create a new schema loader.
    pub fn new(files: Arc<dyn FileAccess>, converters: Arc<ConverterRegistry>) -> Self {
        Self { files, converters }
    }

    /// Filename suffixes identifying schema source files.
    ///
    /// The standard suffixes are always accepted, so that a file whose
    /// format has no converter in the table is reported rather than ignored.
    pub fn schema_suffixes(&self) -> Vec<String> {
        let mut suffixes: Vec<String> = ConverterRegistry::STANDARD_EXTENSIONS
            .iter()
            .map(|ext| format!("{}{}", SCHEMA_SUFFIX, ext))
            .collect();
        for ext in self.converters.extensions() {
            let suffix = format!("{}{}", SCHEMA_SUFFIX, ext);
            if !suffixes.contains(&suffix) {
                suffixes.push(suffix);
            }
        }
        suffixes
    }

    /// List schema source files in a directory (non-recursive).
    pub async fn list_schema_files(&self, dir: &Path) -> SchemaResult<Vec<String>> {
        let suffixes = self.schema_suffixes();
        let filter: &FileFilter =
            &move |name: &str| suffixes.iter().any(|suffix| name.ends_with(suffix.as_str()));
        self.files.read_dir(dir, Some(filter)).await
    }

    /// Load all schemas from a directory.
    ///
    /// Returns `None` when the directory holds no schema files. Any file
    /// that fails to convert aborts the whole load.
    pub async fn load(&self, dir: &Path) -> SchemaResult<Option<Registry>> {
        let filenames = self.list_schema_files(dir).await?;

        if filenames.is_empty() {
            info!("No schema files found in {:?}", dir);
            return Ok(None);
        }

        info!("Found {} schema files in {:?}", filenames.len(), dir);

        let mut registry = Registry::new();
        for filename in &filenames {
            let entry = self.load_file(dir, filename).await?;
            registry.insert(entry)?;
        }

        if registry.is_empty() {
            return Ok(None);
        }

        info!(
            "Loaded {} callable and {} data schemas",
            registry.callables().len(),
            registry.data().len()
        );
        Ok(Some(registry))
    }

    /// Convert a single schema file.
    pub async fn load_file(&self, dir: &Path, filename: &str) -> SchemaResult<SchemaEntry> {
        let path = dir.join(filename);
        let extension = file_extension(filename);

        let converter = self.converters.find(&extension).ok_or_else(|| {
            SchemaError::Configuration(format!(
                "No converter was found for file type '{}' ({})",
                extension,
                path.display()
            ))
        })?;

        let name = schema_name(filename);
        debug!("Loading schema '{}' from {:?}", name, path);
        converter.convert(&path, &name, self.files.as_ref()).await
    }
}

/// Extension of a filename with its leading dot, or an empty string.
fn file_extension(filename: &str) -> String {
    Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryFileAccess;
    use crate::plugin::PluginRegistry;
    use serde_json::{json, Value};

    fn loader(files: MemoryFileAccess) -> SchemaLoader {
        let plugins = PluginRegistry::new().with_fn("double", |args: &[Value]| {
            Ok(json!(args.first().and_then(Value::as_i64).unwrap_or_default() * 2))
        });
        SchemaLoader::new(
            Arc::new(files),
            Arc::new(ConverterRegistry::standard(Arc::new(plugins))),
        )
    }

    #[test]
    fn test_file_extension() {
        assert_eq!(file_extension("colors-schema.json"), ".json");
        assert_eq!(file_extension("README"), "");
    }

    #[tokio::test]
    async fn test_loader_empty_dir() {
        let loader = loader(MemoryFileAccess::new().with_file("schema/readme.md", "# hi"));
        let registry = loader.load(Path::new("schema")).await.unwrap();
        assert!(registry.is_none());
    }

    #[tokio::test]
    async fn test_loader_partitions_by_kind_in_order() {
        let files = MemoryFileAccess::new()
            .with_file("schema/header-schema.json", r#"{"for": "header"}"#)
            .with_file("schema/double-schema.plugin", "")
            .with_file("schema/colors-schema.json", r#"{"value": "red"}"#)
            .with_file("schema/footer.json", "{}");

        let registry = loader(files)
            .load(Path::new("schema"))
            .await
            .unwrap()
            .unwrap();

        let data: Vec<&str> = registry.data().iter().map(|d| d.name.as_str()).collect();
        assert_eq!(data, vec!["colors", "header"]);
        assert_eq!(registry.callables().len(), 1);
        assert_eq!(registry.callables()[0].name, "double");
    }

    #[tokio::test]
    async fn test_loader_unsupported_extension_aborts() {
        let files = MemoryFileAccess::new()
            .with_file("schema/colors-schema.json", "{}")
            .with_file("schema/double-schema.plugin", "");
        let loader = SchemaLoader::new(
            Arc::new(files),
            Arc::new(ConverterRegistry::empty().with(Arc::new(crate::converter::JsonConverter))),
        );

        match loader.load(Path::new("schema")).await {
            Err(SchemaError::Configuration(message)) => assert!(message.contains(".plugin")),
            other => panic!("expected configuration error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_loader_malformed_file_aborts() {
        let files = MemoryFileAccess::new()
            .with_file("schema/colors-schema.json", "{}")
            .with_file("schema/header-schema.json", "{");

        let result = loader(files).load(Path::new("schema")).await;
        assert!(matches!(result, Err(SchemaError::MalformedSource { .. })));
    }
}
