//! Error types for schema compilation and path resolution.
//!
//! Validation failures are data, not errors: they live in the error trees
//! produced by the accumulators. `FaramError` only covers programmer mistakes
//! (a malformed schema document, a path the schema cannot address) and JSON I/O.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FaramError {
    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Schema error at {path}: {message}")]
    SchemaError { path: String, message: String },

    #[error("Unknown rule at {path}: {rule}")]
    UnknownRule { path: String, rule: String },

    #[error("Path error at {path}: {message}")]
    PathError { path: String, message: String },
}

impl FaramError {
    pub(crate) fn schema(path: &str, message: impl Into<String>) -> Self {
        FaramError::SchemaError {
            path: path.to_string(),
            message: message.into(),
        }
    }

    pub(crate) fn path(path: impl ToString, message: impl Into<String>) -> Self {
        FaramError::PathError {
            path: path.to_string(),
            message: message.into(),
        }
    }
}
