//! End-to-end run: load, resolve, write.

use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use crate::config::{SsmConfig, WriterConfig};
use crate::converter::ConverterRegistry;
use crate::error::SchemaResult;
use crate::fileio::{DryRunFileAccess, FileAccess};
use crate::loader::SchemaLoader;
use crate::plugin::PluginRegistry;
use crate::resolver::SchemaResolver;
use crate::schema::{DataSchema, Registry};
use crate::writer::{ApplyReport, TargetWriter};

/// How a run ended.
///
/// Serializes as `{"outcome": "<variant>", "report": {...}}`; the report is
/// absent when no schema file was found.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", content = "report", rename_all = "snake_case")]
pub enum RunOutcome {
    /// The schema directory holds no schema files.
    NoSchemaFiles,
    /// The target directory holds no template files.
    NoTargetFiles(ApplyReport),
    /// No schema names a target.
    NoTargetedSchemas(ApplyReport),
    /// Schemas were written (or, in a dry run, would have been).
    Applied(ApplyReport),
}

impl RunOutcome {
    pub fn wrote_any(&self) -> bool {
        matches!(self, RunOutcome::Applied(report) if report.wrote_any())
    }

    /// Whether the schema directory held any schema file.
    pub fn found_schema_files(&self) -> bool {
        !matches!(self, RunOutcome::NoSchemaFiles)
    }

    pub fn report(&self) -> Option<&ApplyReport> {
        match self {
            RunOutcome::NoSchemaFiles => None,
            RunOutcome::NoTargetFiles(report)
            | RunOutcome::NoTargetedSchemas(report)
            | RunOutcome::Applied(report) => Some(report),
        }
    }
}

/// The schema pipeline.
///
/// File access is always supplied by the caller; plugins and converters
/// default to an empty plugin registry and the standard converter table.
pub struct SchemaEngine {
    files: Arc<dyn FileAccess>,
    plugins: Arc<PluginRegistry>,
    converters: Option<Arc<ConverterRegistry>>,
    config: WriterConfig,
    dry_run: bool,
}

impl SchemaEngine {
    pub fn new(files: Arc<dyn FileAccess>) -> Self {
        Self {
            files,
            plugins: Arc::new(PluginRegistry::new()),
            converters: None,
            config: WriterConfig::default(),
            dry_run: false,
        }
    }

    /// Functions available to `.plugin` schema files.
    pub fn with_plugins(mut self, plugins: PluginRegistry) -> Self {
        self.plugins = Arc::new(plugins);
        self
    }

    /// Replace the standard converter table.
    pub fn with_converters(mut self, converters: ConverterRegistry) -> Self {
        self.converters = Some(Arc::new(converters));
        self
    }

    pub fn with_config(mut self, config: WriterConfig) -> Self {
        self.config = config;
        self
    }

    /// Apply the writer settings and dry-run flag of a loaded configuration.
    pub fn with_settings(self, settings: &SsmConfig) -> Self {
        self.with_config(settings.writer.clone()).dry_run(settings.dry_run)
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    fn converters(&self) -> Arc<ConverterRegistry> {
        self.converters
            .clone()
            .unwrap_or_else(|| Arc::new(ConverterRegistry::standard(self.plugins.clone())))
    }

    /// Load the schema directory.
    pub async fn load(&self, schema_dir: &Path) -> SchemaResult<Option<Registry>> {
        SchemaLoader::new(self.files.clone(), self.converters())
            .load(schema_dir)
            .await
    }

    /// Resolve references across a loaded registry.
    pub fn resolve(&self, registry: Registry) -> SchemaResult<Vec<DataSchema>> {
        SchemaResolver::resolve(registry)
    }

    /// Write resolved schemas into the target directory.
    ///
    /// In a dry run the report lists the files that would have been written
    /// in `planned_writes` and nothing is written.
    pub async fn apply(&self, schemas: &[DataSchema], target_dir: &Path) -> SchemaResult<ApplyReport> {
        if !self.dry_run {
            return TargetWriter::new(self.files.clone(), self.config.clone())?
                .apply(schemas, target_dir)
                .await;
        }

        let dry_run = Arc::new(DryRunFileAccess::new(self.files.clone()));
        let mut report = TargetWriter::new(dry_run.clone(), self.config.clone())?
            .apply(schemas, target_dir)
            .await?;
        report.dry_run = true;
        report.planned_writes = dry_run.planned_writes();
        Ok(report)
    }

    /// Run the whole pipeline.
    ///
    /// Any error aborts the run before a single file is written.
    pub async fn run(&self, schema_dir: &Path, target_dir: &Path) -> SchemaResult<RunOutcome> {
        info!("Running schema manager on {:?} -> {:?}", schema_dir, target_dir);

        let Some(registry) = self.load(schema_dir).await? else {
            return Ok(RunOutcome::NoSchemaFiles);
        };

        let schemas = self.resolve(registry)?;

        info!("Applying schemas to template files");
        let report = self.apply(&schemas, target_dir).await?;

        if report.target_files_found == 0 {
            return Ok(RunOutcome::NoTargetFiles(report));
        }
        if report.targeted_schemas == 0 {
            return Ok(RunOutcome::NoTargetedSchemas(report));
        }
        Ok(RunOutcome::Applied(report))
    }
}

impl std::fmt::Debug for SchemaEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemaEngine")
            .field("plugins", &self.plugins)
            .field("config", &self.config)
            .field("dry_run", &self.dry_run)
            .finish_non_exhaustive()
    }
}
