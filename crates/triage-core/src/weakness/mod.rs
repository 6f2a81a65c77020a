//! Weakness matcher: weighted trigger scoring over a curated table.
//!
//! No embeddings, no I/O after construction. The matcher is immutable once
//! built; a reload builds a fresh instance and swaps the reference.

pub mod error;
pub mod model;


pub use error::{WeaknessError, WeaknessResult};
pub use model::{WeaknessFile, WeaknessMatch, WeaknessPattern, WeaknessTriggers};

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::Serialize;
use tracing::{debug, info};

/// Score contribution when the caller's entity type is listed in the triggers.
const ENTITY_TYPE_WEIGHT: f32 = 0.30;
/// Score weight for the fraction of trigger keywords found in the question.
const KEYWORD_WEIGHT: f32 = 0.40;
/// Score weight for the fraction of question patterns found in the question.
const QUESTION_PATTERN_WEIGHT: f32 = 0.30;

/// Matches questions against known model weaknesses.
pub struct WeaknessMatcher {
    weaknesses: Vec<WeaknessPattern>,
}

/// Aggregate counts over the weakness table.
#[derive(Debug, Clone, Default, Serialize)]
pub struct WeaknessStats {
    /// Records in the table.
    pub total_weaknesses: usize,
    /// Counts keyed by category.
    pub by_category: BTreeMap<String, usize>,
    /// Counts keyed by severity name.
    pub by_severity: BTreeMap<String, usize>,
    /// Mean observed frequency, 0 for an empty table.
    pub avg_frequency: f32,
}

impl WeaknessMatcher {
    /// Loads the table from a `{"weaknesses": [...]}` JSON file.
    pub fn load(path: &Path) -> WeaknessResult<Self> {
        if !path.exists() {
            return Err(WeaknessError::NotFound {
                path: path.to_path_buf(),
            });
        }

        let bytes = fs::read(path)?;
        let file: WeaknessFile =
            serde_json::from_slice(&bytes).map_err(|e| WeaknessError::Malformed {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        info!(
            weaknesses = file.weaknesses.len(),
            path = %path.display(),
            "loaded weakness table"
        );
        Ok(Self::from_weaknesses(file.weaknesses))
    }

    /// Builds a matcher over an in-memory table.
    pub fn from_weaknesses(weaknesses: Vec<WeaknessPattern>) -> Self {
        Self { weaknesses }
    }

    /// Records in the table.
    pub fn len(&self) -> usize {
        self.weaknesses.len()
    }

    /// Returns `true` for an empty table.
    pub fn is_empty(&self) -> bool {
        self.weaknesses.is_empty()
    }

    /// Finds weaknesses matching `question`, best first.
    ///
    /// Records with `frequency < min_frequency` or a zero trigger score are
    /// excluded. Ties on score break by higher frequency. Pure and
    /// synchronous; safe to call on every request.
    pub fn match_weaknesses(
        &self,
        question: &str,
        entity_type: Option<&str>,
        top_k: usize,
        min_frequency: f32,
    ) -> Vec<WeaknessMatch> {
        let mut matches: Vec<WeaknessMatch> = self
            .weaknesses
            .iter()
            .filter(|w| w.frequency >= min_frequency)
            .filter_map(|w| {
                let match_score = score_weakness(question, entity_type, w);
                (match_score > 0.0).then(|| WeaknessMatch {
                    weakness: w.clone(),
                    match_score,
                })
            })
            .collect();

        matches.sort_by(|a, b| {
            b.match_score
                .total_cmp(&a.match_score)
                .then(b.weakness.frequency.total_cmp(&a.weakness.frequency))
        });
        matches.truncate(top_k);

        if !matches.is_empty() {
            let ids: Vec<&str> = matches.iter().map(|m| m.weakness.weakness_id.as_str()).collect();
            debug!(matched = ?ids, "matched weakness patterns");
        }
        matches
    }

    /// Aggregate counts over the table.
    pub fn stats(&self) -> WeaknessStats {
        let mut stats = WeaknessStats {
            total_weaknesses: self.weaknesses.len(),
            ..Default::default()
        };

        let mut frequency_sum = 0.0f32;
        for weakness in &self.weaknesses {
            *stats.by_category.entry(weakness.category.clone()).or_default() += 1;
            *stats
                .by_severity
                .entry(weakness.severity.as_str().to_string())
                .or_default() += 1;
            frequency_sum += weakness.frequency;
        }

        if !self.weaknesses.is_empty() {
            stats.avg_frequency = frequency_sum / self.weaknesses.len() as f32;
        }
        stats
    }
}

/// Weighted trigger score in [0, 1].
///
/// Three independent signals, each capped to its weight: entity-type listing,
/// fraction of trigger keywords present, fraction of question patterns
/// present. Matching is case-sensitive substring containment.
fn score_weakness(
    question: &str,
    entity_type: Option<&str>,
    weakness: &WeaknessPattern,
) -> f32 {
    let triggers = &weakness.triggers;
    let mut score = 0.0;

    if let Some(entity_type) = entity_type {
        if triggers.entity_types.iter().any(|t| t == entity_type) {
            score += ENTITY_TYPE_WEIGHT;
        }
    }

    score += KEYWORD_WEIGHT * containment_fraction(question, &triggers.keywords);
    score += QUESTION_PATTERN_WEIGHT * containment_fraction(question, &triggers.question_patterns);

    score
}

/// Fraction of `needles` contained in `haystack`, capped at 1.
fn containment_fraction(haystack: &str, needles: &[String]) -> f32 {
    if needles.is_empty() {
        return 0.0;
    }

    let matched = needles.iter().filter(|n| haystack.contains(n.as_str())).count();
    (matched as f32 / needles.len() as f32).min(1.0)
}
