//! Error surface shared by training, classification, dataset loading,
//! and persistence.

use std::io;
use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, ForestError>;

/// Failures surfaced by the forest engine and its collaborators.
#[derive(Debug, Error)]
pub enum ForestError {
    /// A caller-supplied value was unusable: empty datasets,
    /// out-of-range training counts, mismatched dimensions, or a
    /// forest that has not been trained.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A file carried the wrong magic number for its expected format.
    #[error("unsupported file magic {found:#010x}, expected {expected:#010x}")]
    BadMagic { found: u32, expected: u32 },

    /// The MNIST image and label files disagree on how many samples
    /// they describe.
    #[error("image count {images} does not match label count {labels}")]
    SampleCountMismatch { images: u32, labels: u32 },

    /// A file parsed but its contents were inconsistent: truncated
    /// payloads, unknown node tags, unsupported format versions.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// Short read or write while touching the filesystem.
    #[error("i/o failure: {0}")]
    Io(#[from] io::Error),
}
