use std::path::PathBuf;

use camfilter_core::error::FilterError;

use crate::colmap::ColmapError;

/// An error type for the io module.
#[derive(thiserror::Error, Debug)]
pub enum IoError {
    /// Error when the file does not exist.
    #[error("File does not exist: {0}")]
    FileDoesNotExist(PathBuf),

    /// Error to open, read or write a file.
    #[error("Failed to manipulate the file. {0}")]
    FileError(#[from] std::io::Error),

    /// Error to parse a COLMAP model file.
    #[error("Failed to read the COLMAP model. {0}")]
    ColmapError(#[from] ColmapError),

    /// Error to decode a passage description.
    #[error("Failed to decode the description file. {0}")]
    JsonError(#[from] serde_json::Error),

    /// Error to build a pose collection from the file content.
    #[error(transparent)]
    FilterError(#[from] FilterError),

    /// The passage style names an unknown shape.
    #[error("Unknown passage style: {0}")]
    UnknownPassageStyle(String),

    /// The passage index is not part of the description.
    #[error("Passage {index} does not exist, the description holds {count} passages")]
    PassageOutOfRange {
        /// Requested passage index
        index: usize,
        /// Number of passages in the description
        count: usize,
    },

    /// A geometric passage point carries no camera position.
    #[error("Passage image {0} has no camera position")]
    MissingPosition(String),
}
