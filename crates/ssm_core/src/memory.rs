//! In-memory file access.
//!
//! Keeps files in a shared map so tests (and callers embedding the engine)
//! can run the full pipeline without touching disk, then inspect what was
//! written.

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::error::SchemaResult;
use crate::fileio::{FileAccess, FileFilter};

/// In-memory [`FileAccess`] implementation.
///
/// Clones share the same storage, so a test can hand one clone to the
/// engine and keep another for verification.
#[derive(Debug, Clone, Default)]
pub struct MemoryFileAccess {
    files: Arc<RwLock<BTreeMap<PathBuf, String>>>,
    writes: Arc<RwLock<Vec<PathBuf>>>,
}

impl MemoryFileAccess {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file.
    pub fn with_file(self, path: impl Into<PathBuf>, contents: impl Into<String>) -> Self {
        self.insert(path, contents);
        self
    }

    /// Add or replace a file without recording a write.
    pub fn insert(&self, path: impl Into<PathBuf>, contents: impl Into<String>) {
        self.files.write().insert(path.into(), contents.into());
    }

    /// Current contents of a file.
    pub fn contents(&self, path: impl AsRef<Path>) -> Option<String> {
        self.files.read().get(path.as_ref()).cloned()
    }

    /// Paths written through [`FileAccess::write_file`], in order.
    pub fn written(&self) -> Vec<PathBuf> {
        self.writes.read().clone()
    }
}

#[async_trait]
impl FileAccess for MemoryFileAccess {
    async fn read_dir(&self, path: &Path, filter: Option<&FileFilter>) -> SchemaResult<Vec<String>> {
        let files = self.files.read();
        let names = files
            .keys()
            .filter(|file| file.parent() == Some(path))
            .filter_map(|file| file.file_name().and_then(|n| n.to_str()))
            .filter(|name| filter.map_or(true, |accept| accept(*name)))
            .map(String::from)
            .collect();
        Ok(names)
    }

    async fn read_file(&self, path: &Path) -> SchemaResult<String> {
        self.contents(path).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("No such file: {}", path.display()),
            )
            .into()
        })
    }

    async fn write_file(&self, path: &Path, contents: &str) -> SchemaResult<()> {
        self.files
            .write()
            .insert(path.to_path_buf(), contents.to_string());
        self.writes.write().push(path.to_path_buf());
        Ok(())
    }
}
