//! Weakness table model types.

use serde::{Deserialize, Serialize};

use crate::patterns::Severity;

/// Trigger signals for one weakness record.
///
/// All matching is plain substring containment against the question text;
/// no tokenization, no embeddings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WeaknessTriggers {
    /// Entity categories this weakness applies to (`diseases`, `vaccines`, ...).
    #[serde(default)]
    pub entity_types: Vec<String>,
    /// Keywords whose presence in the question counts toward the score.
    #[serde(default)]
    pub keywords: Vec<String>,
    /// Question phrasings whose presence counts toward the score.
    #[serde(default)]
    pub question_patterns: Vec<String>,
}

/// A curated record of a known model failure mode.
///
/// Loaded wholesale from the weakness table file; never mutated in place. A
/// reload replaces the whole table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeaknessPattern {
    /// Stable string key (`missing_referral_advice`, ...).
    pub weakness_id: String,
    /// Entity category the weakness belongs to.
    pub category: String,
    /// Finer-grained grouping within the category.
    #[serde(default)]
    pub subcategory: String,
    /// Human-readable description of the failure mode.
    pub description: String,
    /// How bad answers exhibiting this weakness are.
    #[serde(default)]
    pub severity: Severity,
    /// Observed rate in [0, 1], not a count.
    #[serde(default)]
    pub frequency: f32,
    /// What makes a question susceptible.
    #[serde(default)]
    pub triggers: WeaknessTriggers,
    /// Reminder text injected verbatim into prompts.
    pub prompt_addition: String,
}

/// A matched weakness plus its score against the question.
#[derive(Debug, Clone, Serialize)]
pub struct WeaknessMatch {
    /// The matched record.
    #[serde(flatten)]
    pub weakness: WeaknessPattern,
    /// Weighted trigger score in (0, 1].
    pub match_score: f32,
}

/// On-disk shape of the weakness table file.
#[derive(Debug, Deserialize)]
pub struct WeaknessFile {
    /// The full table.
    pub weaknesses: Vec<WeaknessPattern>,
}
