//! Embedding provider seam + content-hash cache.
//!
//! - [`EmbeddingProvider`] is the trait boundary to the external provider.
//! - [`RemoteEmbedder`] talks to an OpenAI-style `/embeddings` endpoint.
//! - [`EmbeddingCache`] wraps any provider with a persisted hash-keyed cache.

/// Disk-backed content-hash cache.
pub mod cache;
mod error;
#[cfg(any(test, feature = "mock"))]
/// Deterministic mock provider for tests.
pub mod mock;
/// Provider trait + remote HTTP client.
pub mod provider;

pub use cache::EmbeddingCache;
pub use error::{EmbeddingError, EmbeddingResult};
#[cfg(any(test, feature = "mock"))]
pub use mock::MockEmbedder;
pub use provider::{EmbeddingProvider, RemoteEmbedder, INITIAL_BACKOFF, MAX_ATTEMPTS};
