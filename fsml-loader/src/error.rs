//! Loader error types.

use thiserror::Error;

/// Errors that can occur while loading a model document.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("syntax error in '{text}' at offset {position}: {reason}")]
    Syntax {
        text: String,
        position: usize,
        reason: String,
    },

    #[error("unresolved references: {}", names.join(", "))]
    Unresolved { names: Vec<String> },

    #[error("unsupported attribute type: '{ty}'")]
    UnsupportedAttributeType { ty: String },
}

impl LoadError {
    /// Returns an error code suitable for reporting.
    pub fn error_code(&self) -> &'static str {
        match self {
            LoadError::Io(_) => "IO_ERROR",
            LoadError::Json(_) | LoadError::Yaml(_) => "BAD_DOCUMENT",
            LoadError::Syntax { .. } => "SYNTAX_ERROR",
            LoadError::Unresolved { .. } => "UNRESOLVED_REFERENCE",
            LoadError::UnsupportedAttributeType { .. } => "UNSUPPORTED_ATTRIBUTE_TYPE",
        }
    }
}
