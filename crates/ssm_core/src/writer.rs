//! Writing resolved schemas into template files.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::WriterConfig;
use crate::error::SchemaResult;
use crate::fileio::{FileAccess, FileFilter, RegionWrite};
use crate::schema::DataSchema;

/// Summary of one pass of the target writer.
#[derive(Debug, Clone, Serialize)]
pub struct ApplyReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Number of template files found in the target directory.
    pub target_files_found: usize,
    /// Number of schemas carrying a target.
    pub targeted_schemas: usize,
    /// Files whose schema region was replaced.
    pub written: Vec<PathBuf>,
    /// Files that had no region and got one appended.
    pub appended: Vec<PathBuf>,
    /// Files whose region already matched.
    pub unchanged: Vec<PathBuf>,
    /// Files without a schema region.
    pub missing_region: Vec<PathBuf>,
    /// Targets with no template file.
    pub missing_targets: Vec<String>,
    /// Whether the pass ran without writing.
    pub dry_run: bool,
    /// Files a dry run would have written.
    pub planned_writes: Vec<PathBuf>,
}

impl ApplyReport {
    fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            started_at,
            finished_at: started_at,
            target_files_found: 0,
            targeted_schemas: 0,
            written: Vec::new(),
            appended: Vec::new(),
            unchanged: Vec::new(),
            missing_region: Vec::new(),
            missing_targets: Vec::new(),
            dry_run: false,
            planned_writes: Vec::new(),
        }
    }

    /// Whether any file was written.
    pub fn wrote_any(&self) -> bool {
        !self.written.is_empty() || !self.appended.is_empty()
    }

    pub fn duration_ms(&self) -> i64 {
        (self.finished_at - self.started_at).num_milliseconds()
    }
}

/// Writes data schemas into the schema region of their target templates.
pub struct TargetWriter {
    files: Arc<dyn FileAccess>,
    config: WriterConfig,
    pattern: Regex,
}

impl TargetWriter {
    /// Create a new target writer.
    pub fn new(files: Arc<dyn FileAccess>, config: WriterConfig) -> SchemaResult<Self> {
        let pattern = config.region_pattern()?;
        Ok(Self {
            files,
            config,
            pattern,
        })
    }

    pub fn config(&self) -> &WriterConfig {
        &self.config
    }

    /// Serialize a schema value into a complete region.
    pub fn render_block(&self, schema: &DataSchema) -> SchemaResult<String> {
        let body = serde_json::to_string_pretty(&schema.value)?;
        Ok(self.config.wrap(&body))
    }

    /// List template files in a directory.
    pub async fn list_targets(&self, dir: &Path) -> SchemaResult<Vec<String>> {
        let extension = self.config.normalized_extension();
        let filter: &FileFilter = &move |name: &str| name.ends_with(extension.as_str());
        self.files.read_dir(dir, Some(filter)).await
    }

    /// Write every targeted schema into its template file.
    ///
    /// Schemas without a target and targets without a template file are
    /// skipped. Files are only written when their content changes.
    pub async fn apply(&self, schemas: &[DataSchema], target_dir: &Path) -> SchemaResult<ApplyReport> {
        let mut report = ApplyReport::new(Utc::now());

        let target_files = self.list_targets(target_dir).await?;
        report.target_files_found = target_files.len();

        let targeted: Vec<(&DataSchema, &str)> = schemas
            .iter()
            .filter_map(|schema| schema.target().map(|target| (schema, target)))
            .collect();
        report.targeted_schemas = targeted.len();

        if target_files.is_empty() || targeted.is_empty() {
            info!(
                "Nothing to write: {} template files, {} targeted schemas",
                target_files.len(),
                targeted.len()
            );
            report.finished_at = Utc::now();
            return Ok(report);
        }

        let extension = self.config.normalized_extension();
        for (schema, target) in targeted {
            let filename = format!("{}{}", target, extension);
            if !target_files.contains(&filename) {
                debug!("No template {} for schema '{}'", filename, schema.name);
                report.missing_targets.push(target.to_string());
                continue;
            }

            let path = target_dir.join(&filename);
            let block = self.render_block(schema)?;
            let outcome = self
                .files
                .replace_region(&self.pattern, &block, &path, self.config.mode)
                .await?;

            match outcome {
                RegionWrite::Replaced => {
                    info!("Wrote schema '{}' to {:?}", schema.name, path);
                    report.written.push(path);
                }
                RegionWrite::Appended => {
                    info!("Appended schema '{}' to {:?}", schema.name, path);
                    report.appended.push(path);
                }
                RegionWrite::Unchanged => {
                    debug!("{:?} already up to date", path);
                    report.unchanged.push(path);
                }
                RegionWrite::NotFound => {
                    warn!("No schema region in {:?}, skipping '{}'", path, schema.name);
                    report.missing_region.push(path);
                }
            }
        }

        report.finished_at = Utc::now();
        Ok(report)
    }
}
