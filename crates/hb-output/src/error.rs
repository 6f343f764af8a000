//! Error types for hb-output.

use thiserror::Error;

/// Output container error type.
#[derive(Error, Debug)]
pub enum OutputError {
    /// I/O error while reading or writing the artifact.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Artifact could not be encoded or decoded.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Artifact is not a histbook output document.
    #[error("unsupported output format '{0}'")]
    Format(String),

    /// No record or directory at the given path.
    #[error("not found: {0}")]
    NotFound(String),

    /// Path is empty or has an empty component.
    #[error("invalid path '{0}'")]
    InvalidPath(String),
}

/// Result type alias.
pub type Result<T> = std::result::Result<T, OutputError>;
