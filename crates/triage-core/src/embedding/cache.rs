use std::borrow::Cow;
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use tracing::{debug, info, warn};

use crate::hashing::hash_text;

use super::error::{EmbeddingError, EmbeddingResult};
use super::provider::EmbeddingProvider;

const TEMP_EXTENSION: &str = "json.tmp";

/// Disk-backed embedding cache keyed by content hash.
///
/// Every miss calls the wrapped provider, stores the vector under the BLAKE3
/// hash of the (truncated) text, and rewrites the whole cache file before
/// returning. Hits never touch the provider.
///
/// Text over the character budget is truncated before hashing, so the same
/// input always maps to the same cache key.
pub struct EmbeddingCache<P> {
    provider: P,
    cache_path: PathBuf,
    max_chars: usize,
    entries: RwLock<HashMap<String, Vec<f32>>>,
}

impl<P: EmbeddingProvider> EmbeddingCache<P> {
    /// Opens (or starts fresh) a cache at `cache_path`.
    ///
    /// A corrupt cache file is discarded with a warning: the cache is a pure
    /// performance layer and every entry can be recomputed.
    pub fn open(provider: P, cache_path: PathBuf, max_chars: usize) -> EmbeddingResult<Self> {
        let entries = if cache_path.exists() {
            let bytes = fs::read(&cache_path)?;
            match serde_json::from_slice::<HashMap<String, Vec<f32>>>(&bytes) {
                Ok(map) => {
                    info!(entries = map.len(), path = %cache_path.display(), "loaded embedding cache");
                    map
                }
                Err(e) => {
                    warn!(error = %e, path = %cache_path.display(), "embedding cache corrupt, starting fresh");
                    HashMap::new()
                }
            }
        } else {
            debug!(path = %cache_path.display(), "no embedding cache found, starting fresh");
            HashMap::new()
        };

        Ok(Self {
            provider,
            cache_path,
            max_chars,
            entries: RwLock::new(entries),
        })
    }

    /// Output dimension of the wrapped provider.
    pub fn dimension(&self) -> usize {
        self.provider.dimension()
    }

    /// The wrapped provider.
    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Number of cached vectors.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns `true` if no vectors are cached.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Truncates `text` to the configured character budget.
    ///
    /// Deterministic: char-based (never splits a UTF-8 sequence) and marked
    /// with a trailing ellipsis, matching what gets hashed and embedded.
    pub fn truncate<'a>(&self, text: &'a str) -> Cow<'a, str> {
        match text.char_indices().nth(self.max_chars) {
            None => Cow::Borrowed(text),
            Some((byte_idx, _)) => {
                warn!(
                    original_chars = text.chars().count(),
                    max_chars = self.max_chars,
                    "truncating text before embedding"
                );
                Cow::Owned(format!("{}...", &text[..byte_idx]))
            }
        }
    }

    /// Returns the embedding for `text`, computing and persisting on miss.
    ///
    /// A provider failure is surfaced as an error; no placeholder vector is
    /// ever cached or returned.
    pub async fn get_or_compute(&self, text: &str) -> EmbeddingResult<Vec<f32>> {
        let text = self.truncate(text);
        let key = hash_text(&text);

        if let Some(vector) = self.entries.read().get(&key) {
            debug!("embedding cache hit");
            return Ok(vector.clone());
        }

        let vector = self.provider.embed(&text).await?;

        {
            let mut entries = self.entries.write();
            entries.insert(key, vector.clone());
            self.persist(&entries);
        }

        Ok(vector)
    }

    /// Batch variant: all-or-nothing.
    ///
    /// Embeddings are returned in input order. If any miss fails, the whole
    /// batch fails and nothing new is persisted - a failed item must never be
    /// silently replaced by a degenerate placeholder that would later match
    /// arbitrary queries.
    pub async fn get_or_compute_batch(&self, texts: &[String]) -> EmbeddingResult<Vec<Vec<f32>>> {
        let mut results = Vec::with_capacity(texts.len());
        let mut fresh: Vec<(String, Vec<f32>)> = Vec::new();
        let mut cache_hits = 0usize;

        for text in texts {
            let text = self.truncate(text);
            let key = hash_text(&text);

            if let Some(vector) = self.entries.read().get(&key) {
                cache_hits += 1;
                results.push(vector.clone());
                continue;
            }

            // A repeated text within the batch should not hit the provider twice.
            if let Some((_, vector)) = fresh.iter().find(|(k, _)| *k == key) {
                results.push(vector.clone());
                continue;
            }

            let vector = self.provider.embed(&text).await?;
            fresh.push((key, vector.clone()));
            results.push(vector);
        }

        if !fresh.is_empty() {
            let mut entries = self.entries.write();
            for (key, vector) in fresh {
                entries.insert(key, vector);
            }
            self.persist(&entries);
        }

        debug!(
            total = texts.len(),
            cache_hits, "embedding batch complete"
        );
        Ok(results)
    }

    /// Rewrites the cache file via temp-file + atomic rename.
    ///
    /// A failed write is logged and swallowed: the in-memory map stays
    /// authoritative and the previous file is left intact.
    fn persist(&self, entries: &HashMap<String, Vec<f32>>) {
        if let Err(e) = self.write_atomic(entries) {
            warn!(error = %e, path = %self.cache_path.display(), "failed to persist embedding cache");
        }
    }

    fn write_atomic(&self, entries: &HashMap<String, Vec<f32>>) -> EmbeddingResult<()> {
        if let Some(parent) = self.cache_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let bytes = serde_json::to_vec(entries).map_err(|e| EmbeddingError::RequestFailed {
            reason: format!("cache serialization failed: {e}"),
        })?;

        let temp_path = temp_path_for(&self.cache_path);
        {
            let mut file = File::create(&temp_path)?;
            file.write_all(&bytes)?;
            file.sync_all()?;
        }
        fs::rename(&temp_path, &self.cache_path)?;

        Ok(())
    }
}

fn temp_path_for(path: &Path) -> PathBuf {
    path.with_extension(TEMP_EXTENSION)
}
