//! Run and writer configuration.
//!
//! Configuration can come from an `ssm.toml` file:
//!
//! ```toml
//! schema_dir = "schema"
//! target_dir = "sections"
//!
//! [writer]
//! template_extension = ".liquid"
//! open_tag = "schema"
//! close_tag = "endschema"
//! mode = "overwrite"
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::SchemaResult;

/// How a schema is written into a template that has no schema region.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum WriteMode {
    /// Replace an existing region; leave files without one untouched.
    #[default]
    Overwrite,
    /// Replace an existing region, or append a new one at the end of the file.
    Append,
}

/// Settings for the target writer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WriterConfig {
    /// Extension of template files, e.g. `.liquid`.
    pub template_extension: String,
    /// Tag opening the schema region (`{% schema %}`).
    pub open_tag: String,
    /// Tag closing the schema region (`{% endschema %}`).
    pub close_tag: String,
    pub mode: WriteMode,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            template_extension: ".liquid".to_string(),
            open_tag: "schema".to_string(),
            close_tag: "endschema".to_string(),
            mode: WriteMode::Overwrite,
        }
    }
}

impl WriterConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn extension(mut self, extension: impl Into<String>) -> Self {
        self.template_extension = extension.into();
        self
    }

    pub fn tags(mut self, open: impl Into<String>, close: impl Into<String>) -> Self {
        self.open_tag = open.into();
        self.close_tag = close.into();
        self
    }

    pub fn mode(mut self, mode: WriteMode) -> Self {
        self.mode = mode;
        self
    }

    /// The template extension with a leading dot.
    pub fn normalized_extension(&self) -> String {
        if self.template_extension.starts_with('.') {
            self.template_extension.clone()
        } else {
            format!(".{}", self.template_extension)
        }
    }

    /// Pattern matching the first, shortest schema region.
    ///
    /// Tags are matched case-insensitively with any whitespace inside the
    /// `{% %}` delimiters, and the region may span lines.
    pub fn region_pattern(&self) -> SchemaResult<Regex> {
        let pattern = format!(
            r"(?is)\{{%\s*{}\s*%\}}.*?\{{%\s*{}\s*%\}}",
            regex::escape(&self.open_tag),
            regex::escape(&self.close_tag)
        );
        Ok(Regex::new(&pattern)?)
    }

    /// Wrap serialized schema text in the region tags.
    pub fn wrap(&self, body: &str) -> String {
        format!(
            "{{% {} %}}\n{}\n{{% {} %}}",
            self.open_tag, body, self.close_tag
        )
    }
}

/// Top-level configuration, usually read from `ssm.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SsmConfig {
    pub schema_dir: Option<PathBuf>,
    pub target_dir: Option<PathBuf>,
    /// Report changes without writing any file.
    pub dry_run: bool,
    pub writer: WriterConfig,
}

impl SsmConfig {
    /// Default configuration file name.
    pub const FILE_NAME: &'static str = "ssm.toml";

    pub fn from_toml_str(content: &str) -> SchemaResult<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load configuration from a file.
    pub fn load(path: impl AsRef<Path>) -> SchemaResult<Self> {
        let path = path.as_ref();
        debug!("Loading configuration from {:?}", path);
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Load `ssm.toml` from a directory, or fall back to defaults.
    pub fn discover(dir: impl AsRef<Path>) -> SchemaResult<Self> {
        let path = dir.as_ref().join(Self::FILE_NAME);
        if path.is_file() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }
}
