//! Error types for hb-frame.

use thiserror::Error;

/// Frame engine error type.
#[derive(Error, Debug)]
pub enum FrameError {
    /// Expression could not be tokenized, parsed, or resolved.
    #[error("expression error: {0}")]
    Expression(String),

    /// Expression references a column that is not visible at this node.
    #[error("unknown column '{column}' in expression '{expr}'")]
    UnknownColumn {
        /// Missing column name.
        column: String,
        /// Expression that referenced it.
        expr: String,
    },

    /// A deferred result was read before the trigger produced it.
    #[error("result '{0}' is not ready: run the graph first")]
    NotReady(String),

    /// Event loop failure while executing the graph.
    #[error("execution error: {0}")]
    Execution(String),

    /// Invalid argument passed to the engine (bad edges, mismatched columns, ...).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Arrow error.
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// Parquet error.
    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),
}

/// Result type alias.
pub type Result<T> = std::result::Result<T, FrameError>;
