//! Error types for schema operations.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for schema operations.
pub type SchemaResult<T> = Result<T, SchemaError>;

/// Errors that can occur while loading, resolving or writing schemas.
///
/// Every variant is fatal for the run that produced it. Empty results
/// (no schema files, no template files) are reported through
/// [`RunOutcome`](crate::engine::RunOutcome) instead.
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Reference not found: {0}")]
    ReferenceNotFound(String),

    #[error("Malformed schema source {}: {message}", .path.display())]
    MalformedSource { path: PathBuf, message: String },

    #[error("Callable schema '{name}' failed: {message}")]
    CallableFailed { name: String, message: String },

    #[error("Invalid region pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(#[from] toml::de::Error),
}

impl SchemaError {
    pub(crate) fn malformed(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        SchemaError::MalformedSource {
            path: path.into(),
            message: message.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_not_found_names_identifier() {
        let err = SchemaError::ReferenceNotFound("missing".to_string());
        assert_eq!(err.to_string(), "Reference not found: missing");
    }

    #[test]
    fn test_malformed_source_shows_path() {
        let err = SchemaError::malformed("schema/header-schema.json", "expected value");
        assert_eq!(
            err.to_string(),
            "Malformed schema source schema/header-schema.json: expected value"
        );
    }
}
