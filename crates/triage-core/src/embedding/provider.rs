use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::error::{EmbeddingError, EmbeddingResult};

/// Maximum provider attempts per text (1 initial + 2 retries).
pub const MAX_ATTEMPTS: u32 = 3;

/// Backoff before the first retry; doubles per attempt.
pub const INITIAL_BACKOFF: Duration = Duration::from_millis(500);

/// Per-request timeout for the remote provider.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Capability that maps text to a fixed-dimension vector.
///
/// The provider is an external collaborator: it may fail or rate-limit, and
/// implementations are expected to apply their own bounded retry policy.
pub trait EmbeddingProvider: Send + Sync {
    /// Embeds `text` into a vector of [`Self::dimension`] floats.
    fn embed(&self, text: &str) -> impl std::future::Future<Output = EmbeddingResult<Vec<f32>>> + Send;

    /// Output dimension, fixed for the lifetime of the provider.
    fn dimension(&self) -> usize;
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: [&'a str; 1],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

/// HTTP client for an OpenAI-style `POST {base_url}/embeddings` endpoint.
///
/// Retries transient failures with exponential backoff; exhausted retries
/// surface as [`EmbeddingError::RetriesExhausted`].
#[derive(Debug, Clone)]
pub struct RemoteEmbedder {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
    dimension: usize,
}

impl RemoteEmbedder {
    /// Creates a client for `{base_url}/embeddings`.
    pub fn new(
        base_url: &str,
        model: impl Into<String>,
        api_key: Option<String>,
        dimension: usize,
    ) -> EmbeddingResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| EmbeddingError::RequestFailed {
                reason: e.to_string(),
            })?;

        Ok(Self {
            client,
            endpoint: format!("{}/embeddings", base_url.trim_end_matches('/')),
            model: model.into(),
            api_key,
            dimension,
        })
    }

    async fn request(&self, text: &str) -> EmbeddingResult<Vec<f32>> {
        let body = EmbeddingRequest {
            model: &self.model,
            input: [text],
        };

        let mut request = self.client.post(&self.endpoint).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| EmbeddingError::RequestFailed {
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(EmbeddingError::RequestFailed {
                reason: format!("provider returned {status}"),
            });
        }

        let parsed: EmbeddingResponse =
            response
                .json()
                .await
                .map_err(|e| EmbeddingError::RequestFailed {
                    reason: e.to_string(),
                })?;

        let embedding = parsed
            .data
            .into_iter()
            .next()
            .ok_or(EmbeddingError::EmptyResponse)?
            .embedding;

        if embedding.len() != self.dimension {
            return Err(EmbeddingError::DimensionMismatch {
                expected: self.dimension,
                actual: embedding.len(),
            });
        }

        Ok(embedding)
    }
}

impl EmbeddingProvider for RemoteEmbedder {
    async fn embed(&self, text: &str) -> EmbeddingResult<Vec<f32>> {
        let mut backoff = INITIAL_BACKOFF;

        for attempt in 1..=MAX_ATTEMPTS {
            match self.request(text).await {
                Ok(embedding) => {
                    debug!(attempt, dim = embedding.len(), "embedding generated");
                    return Ok(embedding);
                }
                // Dimension mismatch is a configuration problem, retrying
                // cannot fix it.
                Err(e @ EmbeddingError::DimensionMismatch { .. }) => return Err(e),
                Err(e) if attempt < MAX_ATTEMPTS => {
                    warn!(
                        attempt,
                        backoff_ms = backoff.as_millis() as u64,
                        error = %e,
                        "embedding request failed, retrying"
                    );
                    tokio::time::sleep(backoff).await;
                    backoff *= 2;
                }
                Err(e) => {
                    return Err(EmbeddingError::RetriesExhausted {
                        attempts: MAX_ATTEMPTS,
                        reason: e.to_string(),
                    });
                }
            }
        }

        unreachable!("retry loop always returns")
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}
