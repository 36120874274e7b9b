//! File access collaborator.
//!
//! The engine never touches storage directly; it goes through a
//! [`FileAccess`] implementation injected by the caller. [`StdFileAccess`]
//! works on the local file system, [`MemoryFileAccess`](crate::memory::MemoryFileAccess)
//! keeps everything in memory, and [`DryRunFileAccess`] wraps another
//! implementation and drops its writes.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use regex::Regex;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::config::WriteMode;
use crate::error::{SchemaError, SchemaResult};

/// Predicate applied to each filename returned by [`FileAccess::read_dir`].
pub type FileFilter = dyn Fn(&str) -> bool + Send + Sync;

/// Outcome of writing a schema region into a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionWrite {
    /// The region was replaced and the file written.
    Replaced,
    /// No region existed; a new one was appended and the file written.
    Appended,
    /// The region already held the replacement; nothing was written.
    Unchanged,
    /// No region was found; nothing was written.
    NotFound,
}

impl RegionWrite {
    pub fn wrote(&self) -> bool {
        matches!(self, RegionWrite::Replaced | RegionWrite::Appended)
    }
}

/// Storage used by the loader and the writer.
#[async_trait]
pub trait FileAccess: Send + Sync {
    /// List the names of regular files in a directory (non-recursive),
    /// sorted, keeping only names accepted by `filter`.
    async fn read_dir(&self, path: &Path, filter: Option<&FileFilter>) -> SchemaResult<Vec<String>>;

    /// Read a file as UTF-8 text.
    async fn read_file(&self, path: &Path) -> SchemaResult<String>;

    /// Replace the contents of a file.
    async fn write_file(&self, path: &Path, contents: &str) -> SchemaResult<()>;

    /// Replace the first region matching `pattern` with `replacement`.
    ///
    /// The file is written only when its content changes.
    async fn replace_region(
        &self,
        pattern: &Regex,
        replacement: &str,
        path: &Path,
        mode: WriteMode,
    ) -> SchemaResult<RegionWrite> {
        let contents = self.read_file(path).await?;
        let (outcome, updated) = splice_region(&contents, pattern, replacement, mode);
        if let Some(updated) = updated {
            self.write_file(path, &updated).await?;
        }
        Ok(outcome)
    }
}

/// Splice `replacement` into `contents` in place of the first match of `pattern`.
///
/// Returns the outcome and, when the content changed, the new content.
pub fn splice_region(
    contents: &str,
    pattern: &Regex,
    replacement: &str,
    mode: WriteMode,
) -> (RegionWrite, Option<String>) {
    match pattern.find(contents) {
        Some(found) if found.as_str() == replacement => (RegionWrite::Unchanged, None),
        Some(found) => {
            let mut updated = String::with_capacity(contents.len() + replacement.len());
            updated.push_str(&contents[..found.start()]);
            updated.push_str(replacement);
            updated.push_str(&contents[found.end()..]);
            (RegionWrite::Replaced, Some(updated))
        }
        None => match mode {
            WriteMode::Overwrite => (RegionWrite::NotFound, None),
            WriteMode::Append => {
                let mut updated = contents.to_string();
                if !updated.is_empty() && !updated.ends_with('\n') {
                    updated.push('\n');
                }
                updated.push_str(replacement);
                updated.push('\n');
                (RegionWrite::Appended, Some(updated))
            }
        },
    }
}

/// File access on the local file system.
#[derive(Debug, Clone, Default)]
pub struct StdFileAccess;

impl StdFileAccess {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl FileAccess for StdFileAccess {
    async fn read_dir(&self, path: &Path, filter: Option<&FileFilter>) -> SchemaResult<Vec<String>> {
        let metadata = tokio::fs::metadata(path).await?;
        if !metadata.is_dir() {
            return Err(SchemaError::Configuration(format!(
                "Not a directory: {}",
                path.display()
            )));
        }

        let mut names = Vec::new();
        for entry in WalkDir::new(path)
            .min_depth(1)
            .max_depth(1)
            .follow_links(true)
            .sort_by_file_name()
        {
            let entry = entry.map_err(io::Error::from)?;
            if !entry.file_type().is_file() {
                continue;
            }
            let Some(name) = entry.file_name().to_str() else {
                debug!("Skipping non UTF-8 filename {:?}", entry.path());
                continue;
            };
            if filter.map_or(true, |accept| accept(name)) {
                names.push(name.to_string());
            }
        }

        Ok(names)
    }

    async fn read_file(&self, path: &Path) -> SchemaResult<String> {
        debug!("Reading {:?}", path);
        Ok(tokio::fs::read_to_string(path).await?)
    }

    async fn write_file(&self, path: &Path, contents: &str) -> SchemaResult<()> {
        debug!("Writing {:?}", path);
        tokio::fs::write(path, contents).await?;
        Ok(())
    }
}

/// Wraps another [`FileAccess`] and records writes instead of performing them.
pub struct DryRunFileAccess {
    inner: Arc<dyn FileAccess>,
    planned: Mutex<Vec<PathBuf>>,
}

impl DryRunFileAccess {
    pub fn new(inner: Arc<dyn FileAccess>) -> Self {
        Self {
            inner,
            planned: Mutex::new(Vec::new()),
        }
    }

    /// Paths that would have been written.
    pub fn planned_writes(&self) -> Vec<PathBuf> {
        self.planned.lock().clone()
    }
}

#[async_trait]
impl FileAccess for DryRunFileAccess {
    async fn read_dir(&self, path: &Path, filter: Option<&FileFilter>) -> SchemaResult<Vec<String>> {
        self.inner.read_dir(path, filter).await
    }

    async fn read_file(&self, path: &Path) -> SchemaResult<String> {
        self.inner.read_file(path).await
    }

    async fn write_file(&self, path: &Path, contents: &str) -> SchemaResult<()> {
        info!("Dry run: would write {} bytes to {:?}", contents.len(), path);
        self.planned.lock().push(path.to_path_buf());
        Ok(())
    }
}
