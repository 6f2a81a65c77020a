use std::path::PathBuf;
use thiserror::Error;

/// Errors returned by the flat vector index.
#[derive(Debug, Error)]
pub enum IndexError {
    /// A vector's dimension does not match the index dimension.
    #[error("vector dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Index dimension fixed at construction.
        expected: usize,
        /// Dimension of the offending vector or snapshot.
        actual: usize,
    },

    /// The snapshot file could not be decoded.
    #[error("corrupt index snapshot at {path}: {reason}")]
    Corrupt {
        /// Snapshot path.
        path: PathBuf,
        /// Decode failure detail.
        reason: String,
    },

    /// Reading or writing the snapshot failed.
    #[error("index I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result type for index operations.
pub type IndexResult<T> = Result<T, IndexError>;
