//! Error types for hb-book.

use hb_frame::FrameError;
use hb_output::OutputError;
use thiserror::Error;

/// Booking and region-tree error type.
#[derive(Error, Debug)]
pub enum BookError {
    /// A region or sub-region name is already taken at this tree level.
    #[error("region '{0}' already exists")]
    DuplicateRegion(String),

    /// A region or aggregation name that cannot become an output path component.
    #[error("invalid name '{0}': must be non-empty and must not contain '/'")]
    InvalidName(String),

    /// Lookup of a region that was never created.
    #[error("region '{0}' does not exist")]
    RegionNotFound(String),

    /// An aggregation of this name is already booked on the node.
    #[error("aggregation '{0}' is already booked on this node")]
    DuplicateAggregation(String),

    /// Lookup of an aggregation that was never booked on the node.
    #[error("aggregation '{0}' is not booked on this node")]
    MissingAggregation(String),

    /// The single execution trigger failed; nothing was persisted.
    #[error("engine execution failed: {0}")]
    EngineExecution(#[source] FrameError),

    /// Bin edges rejected at construction.
    #[error("invalid binning '{name}': {reason}")]
    InvalidBinning {
        /// Binning name.
        name: String,
        /// What is wrong with the edges.
        reason: String,
    },

    /// Error from the frame engine outside the trigger.
    #[error(transparent)]
    Frame(#[from] FrameError),

    /// Error from the output container.
    #[error(transparent)]
    Output(#[from] OutputError),

    /// I/O error while printing reports.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias.
pub type Result<T> = std::result::Result<T, BookError>;
