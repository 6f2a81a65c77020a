use thiserror::Error;

/// Errors returned by embedding providers and the embedding cache.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    /// A single provider request failed (network, HTTP status, bad body).
    #[error("embedding request failed: {reason}")]
    RequestFailed {
        /// Error message.
        reason: String,
    },

    /// All retry attempts were exhausted.
    #[error("embedding provider failed after {attempts} attempts: {reason}")]
    RetriesExhausted {
        /// Number of attempts made.
        attempts: u32,
        /// Last error message.
        reason: String,
    },

    /// The provider returned a vector of the wrong dimension.
    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Configured dimension.
        expected: usize,
        /// Dimension actually returned.
        actual: usize,
    },

    /// The provider response had no embedding payload.
    #[error("embedding response contained no data")]
    EmptyResponse,

    /// Reading or writing the cache file failed.
    #[error("embedding cache I/O error: {0}")]
    CacheIo(#[from] std::io::Error),
}

/// Convenience result type for embedding operations.
pub type EmbeddingResult<T> = Result<T, EmbeddingError>;
