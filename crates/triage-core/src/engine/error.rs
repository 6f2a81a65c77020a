use std::path::PathBuf;
use thiserror::Error;

use crate::weakness::WeaknessError;

/// Errors constructing or reloading the decision engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The entity-name file does not exist.
    #[error("entity-name file not found: {path}")]
    EntityFileMissing {
        /// Configured entity file path.
        path: PathBuf,
    },

    /// The entity-name file could not be parsed.
    #[error("malformed entity-name file {path}: {reason}")]
    EntityFileMalformed {
        /// Configured entity file path.
        path: PathBuf,
        /// Parse failure detail.
        reason: String,
    },

    /// The weakness table failed to load.
    #[error(transparent)]
    Weakness(#[from] WeaknessError),

    /// Reading a backing file failed.
    #[error("engine I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;
