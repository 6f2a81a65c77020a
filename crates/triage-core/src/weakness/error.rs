use std::path::PathBuf;
use thiserror::Error;

/// Errors loading the weakness table.
#[derive(Debug, Error)]
pub enum WeaknessError {
    /// The weakness table file does not exist.
    #[error("weakness table not found: {path}")]
    NotFound {
        /// Configured table path.
        path: PathBuf,
    },

    /// The weakness table file could not be parsed.
    #[error("malformed weakness table {path}: {reason}")]
    Malformed {
        /// Configured table path.
        path: PathBuf,
        /// Parse failure detail.
        reason: String,
    },

    /// Reading the table file failed.
    #[error("weakness table I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result type for weakness-table operations.
pub type WeaknessResult<T> = Result<T, WeaknessError>;
