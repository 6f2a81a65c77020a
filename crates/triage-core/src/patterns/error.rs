use std::path::PathBuf;
use thiserror::Error;

use crate::embedding::EmbeddingError;
use crate::index::IndexError;

/// Errors returned by the pattern store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Persisted pattern list and vector index disagree.
    #[error("pattern store is inconsistent: {rows} index rows for {patterns} patterns")]
    Inconsistent {
        /// Rows in the vector index.
        rows: usize,
        /// Entries in the pattern list.
        patterns: usize,
    },

    /// Exactly one of the two persisted files exists.
    #[error("pattern store is incomplete: {missing} is missing while its companion exists")]
    MissingCompanion {
        /// Path of the absent file.
        missing: PathBuf,
    },

    /// The pattern JSON file could not be parsed.
    #[error("malformed pattern file {path}: {reason}")]
    Malformed {
        /// Pattern file path.
        path: PathBuf,
        /// Parse failure detail.
        reason: String,
    },

    /// Vector index error (dimension mismatch, corrupt snapshot).
    #[error("vector index error: {0}")]
    Index(#[from] IndexError),

    /// Embedding generation failed.
    #[error("embedding failed: {0}")]
    Embedding(#[from] EmbeddingError),

    /// Writing the pattern file or index snapshot failed.
    #[error("failed to persist pattern store: {0}")]
    Persist(#[source] std::io::Error),

    /// Reading persisted state failed.
    #[error("pattern store I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result type for pattern-store operations.
pub type StoreResult<T> = Result<T, StoreError>;
