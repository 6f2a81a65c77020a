use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::error::{EmbeddingError, EmbeddingResult};
use super::provider::EmbeddingProvider;

/// Deterministic in-process embedding provider for tests.
///
/// Vectors are derived from a BLAKE3 XOF of the input text, so equal texts
/// always embed identically and similar-but-different texts land far apart.
/// `fail_next` lets error-path tests inject provider failures.
#[derive(Debug, Clone)]
pub struct MockEmbedder {
    dimension: usize,
    failing: Arc<AtomicBool>,
}

impl MockEmbedder {
    /// Creates a mock provider with the given output dimension.
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            failing: Arc::new(AtomicBool::new(false)),
        }
    }

    /// When set, every subsequent `embed` call fails until cleared.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Computes the deterministic vector for `text` without going through the
    /// provider trait (useful for assertions).
    pub fn vector_for(&self, text: &str) -> Vec<f32> {
        let mut reader = blake3::Hasher::new()
            .update(text.as_bytes())
            .finalize_xof();

        let mut bytes = vec![0u8; self.dimension];
        reader.fill(&mut bytes);

        bytes
            .into_iter()
            .map(|b| (b as f32) / 127.5 - 1.0)
            .collect()
    }
}

impl EmbeddingProvider for MockEmbedder {
    async fn embed(&self, text: &str) -> EmbeddingResult<Vec<f32>> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(EmbeddingError::RequestFailed {
                reason: "mock provider failure injected".to_string(),
            });
        }

        Ok(self.vector_for(text))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_embed_deterministic() {
        let embedder = MockEmbedder::new(16);

        let a = embedder.embed("糖尿病").await.unwrap();
        let b = embedder.embed("糖尿病").await.unwrap();
        let c = embedder.embed("高血压").await.unwrap();

        assert_eq!(a.len(), 16);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[tokio::test]
    async fn test_mock_failure_injection() {
        let embedder = MockEmbedder::new(8);
        embedder.set_failing(true);

        assert!(embedder.embed("anything").await.is_err());

        embedder.set_failing(false);
        assert!(embedder.embed("anything").await.is_ok());
    }
}
