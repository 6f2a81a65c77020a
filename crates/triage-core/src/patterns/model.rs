//! Pattern model types.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Max example strings kept per pattern.
pub const MAX_EXAMPLES: usize = 5;

/// Pattern severity, ordered `minor < major < critical`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Cosmetic or low-impact error.
    Minor,
    /// Materially wrong or incomplete answer.
    Major,
    /// Dangerous or safety-relevant error.
    Critical,
}

impl Severity {
    /// Lowercase name as stored in JSON files.
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Minor => "minor",
            Severity::Major => "major",
            Severity::Critical => "critical",
        }
    }
}

impl Default for Severity {
    fn default() -> Self {
        Severity::Minor
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn default_category() -> String {
    "general".to_string()
}

fn default_severity() -> Severity {
    Severity::Minor
}

/// A stored error pattern: what went wrong and how to avoid it.
///
/// Immutable once created except for `frequency`, which later merges may
/// bump. `id` is the dense 0-based position matching the pattern's row in
/// the vector index; the two collections are always modified together.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pattern {
    /// Sequence position, assigned at insert; equals the index row.
    pub id: usize,
    /// Text that was embedded.
    pub description: String,
    /// Remediation guidance injected into prompts.
    pub guideline: String,
    /// Entity category, or `"general"` to match every category.
    #[serde(default = "default_category")]
    pub category: String,
    /// Free-form tag (`factual_error`, `incomplete`, ...).
    #[serde(default)]
    pub error_type: String,
    /// How bad the error is.
    #[serde(default = "default_severity")]
    pub severity: Severity,
    /// Occurrence count.
    #[serde(default)]
    pub frequency: u32,
    /// Example questions/answers (bounded to [`MAX_EXAMPLES`]).
    #[serde(default)]
    pub examples: Vec<String>,
}

/// Input record for [`crate::PatternStore::add_patterns_batch`]; the store
/// assigns the `id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPattern {
    /// Text to embed.
    pub description: String,
    /// Remediation guidance.
    pub guideline: String,
    /// Entity category, defaulting to `"general"`.
    #[serde(default = "default_category")]
    pub category: String,
    /// Free-form tag.
    #[serde(default)]
    pub error_type: String,
    /// Severity, defaulting to `minor`.
    #[serde(default = "default_severity")]
    pub severity: Severity,
    /// Occurrence count, defaulting to 1.
    #[serde(default = "default_frequency")]
    pub frequency: u32,
    /// Example questions/answers.
    #[serde(default)]
    pub examples: Vec<String>,
}

fn default_frequency() -> u32 {
    1
}

impl NewPattern {
    /// Minimal pattern with everything else defaulted.
    pub fn new(description: impl Into<String>, guideline: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            guideline: guideline.into(),
            category: default_category(),
            error_type: String::new(),
            severity: default_severity(),
            frequency: default_frequency(),
            examples: Vec::new(),
        }
    }

    pub(crate) fn into_pattern(self, id: usize) -> Pattern {
        let mut examples = self.examples;
        examples.truncate(MAX_EXAMPLES);

        Pattern {
            id,
            description: self.description,
            guideline: self.guideline,
            category: self.category,
            error_type: self.error_type,
            severity: self.severity,
            frequency: self.frequency,
            examples,
        }
    }
}

/// A retrieved pattern plus its similarity to the query.
#[derive(Debug, Clone, Serialize)]
pub struct RetrievedPattern {
    /// The stored pattern.
    #[serde(flatten)]
    pub pattern: Pattern,
    /// `1 / (1 + squared_l2_distance)`, in (0, 1]; 1.0 is a perfect match.
    pub relevance_score: f32,
}
