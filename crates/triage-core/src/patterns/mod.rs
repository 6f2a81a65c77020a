//! Error-pattern store: typed records over the flat vector index.
//!
//! Owns the vector index and the pattern list as one unit; after any
//! mutation completes, index row count equals pattern count. Retrieval is
//! best-effort: an embedding failure degrades to an empty result, never a
//! crash.

pub mod error;
pub mod model;

#[cfg(test)]
mod tests;

pub use error::{StoreError, StoreResult};
pub use model::{NewPattern, Pattern, RetrievedPattern, Severity, MAX_EXAMPLES};

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::embedding::{EmbeddingCache, EmbeddingProvider};
use crate::index::FlatIndex;

const PATTERNS_FILENAME: &str = "patterns.json";
const INDEX_FILENAME: &str = "patterns.idx";
const TEMP_EXTENSION: &str = "json.tmp";
const INDEX_TEMP_EXTENSION: &str = "idx.tmp";

/// How many candidates to over-fetch per requested result, leaving room for
/// the threshold/category/severity filters.
const SEARCH_OVERFETCH: usize = 3;

struct StoreState {
    patterns: Vec<Pattern>,
    index: FlatIndex,
}

/// Store and retrieve error patterns by vector similarity.
///
/// Single-writer, multiple-reader: writers hold the state lock for the whole
/// "append index, append list, persist both" sequence, so readers can never
/// observe more index rows than pattern entries.
pub struct PatternStore<P> {
    embedder: EmbeddingCache<P>,
    patterns_path: PathBuf,
    index_path: PathBuf,
    state: RwLock<StoreState>,
}

/// Aggregate counts over the stored patterns.
#[derive(Debug, Clone, Default, Serialize)]
pub struct StoreStats {
    /// Total stored patterns.
    pub total_patterns: usize,
    /// Counts keyed by category.
    pub by_category: BTreeMap<String, usize>,
    /// Counts keyed by severity name.
    pub by_severity: BTreeMap<String, usize>,
    /// Counts keyed by error type.
    pub by_error_type: BTreeMap<String, usize>,
}

impl<P: EmbeddingProvider> PatternStore<P> {
    /// Opens the store under `data_dir`, loading persisted state if present.
    ///
    /// Both files present: load and cross-check. Neither: start fresh.
    /// Exactly one, or a count/dimension disagreement, is a fatal
    /// configuration error - the store must not start desynchronized.
    pub fn open(embedder: EmbeddingCache<P>, data_dir: &Path) -> StoreResult<Self> {
        fs::create_dir_all(data_dir)?;

        let patterns_path = data_dir.join(PATTERNS_FILENAME);
        let index_path = data_dir.join(INDEX_FILENAME);
        let dimension = embedder.dimension();

        let state = match (patterns_path.exists(), index_path.exists()) {
            (true, true) => {
                let bytes = fs::read(&patterns_path)?;
                let patterns: Vec<Pattern> =
                    serde_json::from_slice(&bytes).map_err(|e| StoreError::Malformed {
                        path: patterns_path.clone(),
                        reason: e.to_string(),
                    })?;
                let index = FlatIndex::load(&index_path, dimension)?;

                if index.row_count() != patterns.len() {
                    return Err(StoreError::Inconsistent {
                        rows: index.row_count(),
                        patterns: patterns.len(),
                    });
                }

                info!(patterns = patterns.len(), "loaded error patterns from disk");
                StoreState { patterns, index }
            }
            (false, false) => {
                info!("no existing error patterns found, starting fresh");
                StoreState {
                    patterns: Vec::new(),
                    index: FlatIndex::new(dimension),
                }
            }
            (true, false) => {
                return Err(StoreError::MissingCompanion {
                    missing: index_path,
                })
            }
            (false, true) => {
                return Err(StoreError::MissingCompanion {
                    missing: patterns_path,
                })
            }
        };

        Ok(Self {
            embedder,
            patterns_path,
            index_path,
            state: RwLock::new(state),
        })
    }

    /// The embedding cache backing this store.
    pub fn embedder(&self) -> &EmbeddingCache<P> {
        &self.embedder
    }

    /// Number of stored patterns.
    pub fn len(&self) -> usize {
        self.state.read().patterns.len()
    }

    /// Returns `true` if no patterns are stored.
    pub fn is_empty(&self) -> bool {
        self.state.read().patterns.is_empty()
    }

    /// Rows currently in the vector index (always equals [`Self::len`]).
    pub fn row_count(&self) -> usize {
        self.state.read().index.row_count()
    }

    /// Adds one pattern; returns its assigned id.
    pub async fn add_pattern(&self, pattern: NewPattern) -> StoreResult<usize> {
        let ids = self.add_patterns_batch(vec![pattern]).await?;
        Ok(ids[0])
    }

    /// Adds patterns in bulk; returns assigned ids in input order.
    ///
    /// Embeddings are computed before any mutation, so a provider failure
    /// inserts nothing. If persisting fails, the in-memory append is rolled
    /// back and the whole add fails.
    pub async fn add_patterns_batch(&self, patterns: Vec<NewPattern>) -> StoreResult<Vec<usize>> {
        if patterns.is_empty() {
            return Ok(Vec::new());
        }

        let descriptions: Vec<String> = patterns.iter().map(|p| p.description.clone()).collect();
        let embeddings = self.embedder.get_or_compute_batch(&descriptions).await?;

        let mut state = self.state.write();
        let prev_rows = state.index.row_count();
        let prev_len = state.patterns.len();

        let result = (|| -> StoreResult<Vec<usize>> {
            let starting_row = state.index.add(&embeddings)?;
            let ids: Vec<usize> = (0..patterns.len()).map(|i| starting_row + i).collect();

            for (pattern, id) in patterns.into_iter().zip(&ids) {
                state.patterns.push(pattern.into_pattern(*id));
            }

            self.persist(&state)?;
            Ok(ids)
        })();

        match result {
            Ok(ids) => {
                info!(added = ids.len(), total = state.patterns.len(), "added error patterns");
                Ok(ids)
            }
            Err(e) => {
                state.index.truncate_rows(prev_rows);
                state.patterns.truncate(prev_len);
                warn!(error = %e, "pattern add failed, rolled back");
                Err(e)
            }
        }
    }

    /// Retrieves up to `k` patterns relevant to `question`.
    ///
    /// Candidates arrive in ascending-distance order and are filtered by
    /// relevance threshold, category (a `"general"` pattern matches every
    /// category), and minimum severity. The surviving order is the candidate
    /// order; `relevance_score = 1/(1+d)` is a monotonic transform of
    /// distance so no re-sort is needed.
    ///
    /// Degrades to an empty list on embedding failure - retrieval is a
    /// best-effort enhancement, never on the critical path.
    pub async fn retrieve_relevant(
        &self,
        question: &str,
        k: usize,
        category: Option<&str>,
        min_severity: Severity,
        threshold: f32,
    ) -> Vec<RetrievedPattern> {
        if k == 0 || self.is_empty() {
            debug!("no patterns in storage yet");
            return Vec::new();
        }

        let query = match self.embedder.get_or_compute(question).await {
            Ok(vector) => vector,
            Err(e) => {
                warn!(error = %e, "question embedding failed, returning no patterns");
                return Vec::new();
            }
        };

        let state = self.state.read();
        let search_k = (k * SEARCH_OVERFETCH).min(state.index.row_count());
        let candidates = match state.index.search(&query, search_k) {
            Ok(candidates) => candidates,
            Err(e) => {
                warn!(error = %e, "index search failed, returning no patterns");
                return Vec::new();
            }
        };

        let mut results = Vec::new();
        for (row, distance) in candidates {
            let pattern = &state.patterns[row];
            let relevance_score = 1.0 / (1.0 + distance);

            if threshold > 0.0 && relevance_score < threshold {
                continue;
            }
            if let Some(category) = category {
                if pattern.category != category && pattern.category != "general" {
                    continue;
                }
            }
            if pattern.severity < min_severity {
                continue;
            }

            results.push(RetrievedPattern {
                pattern: pattern.clone(),
                relevance_score,
            });
            if results.len() >= k {
                break;
            }
        }

        debug!(retrieved = results.len(), requested = k, "pattern retrieval complete");
        results
    }

    /// Returns the `n` most frequent patterns, optionally filtered by
    /// category and a minimum frequency.
    pub fn get_top_patterns(
        &self,
        n: usize,
        category: Option<&str>,
        min_frequency: u32,
    ) -> Vec<Pattern> {
        let state = self.state.read();

        let mut filtered: Vec<Pattern> = state
            .patterns
            .iter()
            .filter(|p| p.frequency >= min_frequency)
            .filter(|p| category.is_none_or(|c| p.category == c))
            .cloned()
            .collect();

        // Stable sort keeps insertion order on equal frequency.
        filtered.sort_by(|a, b| b.frequency.cmp(&a.frequency));
        filtered.truncate(n);
        filtered
    }

    /// Aggregate counts over the stored patterns.
    pub fn stats(&self) -> StoreStats {
        let state = self.state.read();
        let mut stats = StoreStats {
            total_patterns: state.patterns.len(),
            ..Default::default()
        };

        for pattern in &state.patterns {
            *stats.by_category.entry(pattern.category.clone()).or_default() += 1;
            *stats
                .by_severity
                .entry(pattern.severity.as_str().to_string())
                .or_default() += 1;
            let error_type = if pattern.error_type.is_empty() {
                "unknown".to_string()
            } else {
                pattern.error_type.clone()
            };
            *stats.by_error_type.entry(error_type).or_default() += 1;
        }

        stats
    }

    /// Writes both files: stage each to a temp path, then rename the pair.
    ///
    /// Neither live file is touched until both staged copies are written and
    /// fsynced, so a failed write leaves the previous consistent pair on
    /// disk. A crash between the two renames can still leave a mismatch,
    /// which the next [`PatternStore::open`] reports.
    fn persist(&self, state: &StoreState) -> StoreResult<()> {
        let bytes = serde_json::to_vec_pretty(&state.patterns).map_err(|e| {
            StoreError::Malformed {
                path: self.patterns_path.clone(),
                reason: format!("serialization failed: {e}"),
            }
        })?;

        let patterns_temp = self.patterns_path.with_extension(TEMP_EXTENSION);
        let index_temp = self.index_path.with_extension(INDEX_TEMP_EXTENSION);

        let staged = (|| -> StoreResult<()> {
            let mut file = File::create(&patterns_temp).map_err(StoreError::Persist)?;
            file.write_all(&bytes).map_err(StoreError::Persist)?;
            file.sync_all().map_err(StoreError::Persist)?;

            state.index.write_snapshot(&index_temp)?;
            Ok(())
        })();
        if let Err(e) = staged {
            let _ = fs::remove_file(&patterns_temp);
            let _ = fs::remove_file(&index_temp);
            return Err(e);
        }

        fs::rename(&index_temp, &self.index_path).map_err(StoreError::Persist)?;
        fs::rename(&patterns_temp, &self.patterns_path).map_err(StoreError::Persist)?;
        Ok(())
    }
}
