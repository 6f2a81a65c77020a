//! Decision engine: three-tier routing with hot-reloadable backing data.
//!
//! Tier 1 is the weakness matcher, tier 2 the heuristic RAG gate, tier 3
//! baseline. The entity table and the matcher sit behind `RwLock<Arc<_>>`;
//! a reload parses the changed file off to the side and swaps the `Arc`, so
//! requests in flight see either the fully-old or fully-new structure.

pub mod error;


pub use error::{EngineError, EngineResult};

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::weakness::{WeaknessMatch, WeaknessMatcher, WeaknessStats};

/// Category keyword tables, mined from the backing question corpus.
const CATEGORY_KEYWORDS: &[(&str, &[&str])] = &[
    (
        "diseases",
        &[
            "糖尿病", "高血压", "白血病", "肺结节", "半月板", "游走脾",
            "沙门氏菌", "卡波西肉瘤", "家族性高胆固醇血症", "类鼻疽",
            "疾病", "症状", "治疗", "病因",
        ],
    ),
    (
        "examinations",
        &[
            "检查", "筛查", "CT", "MRI", "X光", "超声", "B超",
            "血常规", "尿检", "心电图", "胃镜", "肠镜", "活检",
        ],
    ),
    (
        "surgeries",
        &[
            "手术", "术后", "操作", "切除", "置换", "移植",
            "微创", "开放", "腹腔镜", "穿刺",
        ],
    ),
    (
        "vaccines",
        &[
            "疫苗", "接种", "注射", "免疫", "预防针",
            "乙肝", "流感", "肺炎", "狂犬", "HPV",
        ],
    ),
];

/// Topics known to be absent from the reference corpus.
const OOD_KEYWORDS: &[&str] = &[
    "摇晃综合征", "婴儿摇晃", "Shaken Baby",
    "念珠菌性龟头炎", "念珠菌龟头",
    "海绵状血管瘤", "血管瘤",
    "阴唇粘连", "外阴粘连",
    "先天性心脏病筛查",
    "单纯性甲状腺肿",
    "心脏性猝死预防",
    "变性手术", "性别肯定手术",
    "感染性疾病通用症状",
];

/// Generic category words excluded from prefix matching: an entity whose
/// name starts with one of these would match nearly any question in its
/// category.
const PREFIX_BLOCKLIST: &[&str] = &["检查", "手术", "疫苗"];

/// Confidence when a weakness match drives the decision.
const WEAKNESS_CONFIDENCE: f32 = 0.85;

/// Entity names grouped by category plus a flat lookup set.
///
/// Immutable once built; a reload builds a new table and swaps the `Arc`.
struct EntityTable {
    by_category: BTreeMap<String, Vec<String>>,
    all: BTreeSet<String>,
}

impl EntityTable {
    fn load(path: &Path) -> EngineResult<Self> {
        if !path.exists() {
            return Err(EngineError::EntityFileMissing {
                path: path.to_path_buf(),
            });
        }

        let bytes = fs::read(path)?;
        let by_category: BTreeMap<String, Vec<String>> = serde_json::from_slice(&bytes)
            .map_err(|e| EngineError::EntityFileMalformed {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        let all = by_category.values().flatten().cloned().collect();
        Ok(Self { by_category, all })
    }
}

/// Tunables for the engine, taken from [`crate::Config`] at composition time.
#[derive(Debug, Clone, Copy)]
pub struct EngineOptions {
    /// Max weakness matches per request.
    pub weakness_top_k: usize,
    /// Minimum weakness frequency to consider.
    pub weakness_min_frequency: f32,
    /// Whether `auto_reload` requests may trigger an mtime poll.
    pub hot_reload: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            weakness_top_k: 2,
            weakness_min_frequency: 0.15,
            hot_reload: true,
        }
    }
}

/// Which tier produced the final decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RoutingTier {
    /// A known weakness matched; its reminders drive the prompt.
    Weakness,
    /// No weakness, but retrieval is expected to help.
    Rag,
    /// Neither signal fired; answer from the base prompt alone.
    Baseline,
}

/// Per-request routing decision. Never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct RoutingDecision {
    /// Whether to run pattern retrieval for this question.
    pub use_rag: bool,
    /// Human-readable cause of the RAG verdict.
    pub rag_reason: String,
    /// Confidence of the RAG verdict, in [0, 1].
    pub rag_confidence: f32,
    /// Matched weaknesses, best first.
    pub weakness_patterns: Vec<WeaknessMatch>,
    /// `!weakness_patterns.is_empty()`.
    pub has_weaknesses: bool,
    /// Which tier decided.
    pub routing_tier: RoutingTier,
    /// When backing files were last polled for changes.
    pub last_reload_check: DateTime<Utc>,
}

/// Engine configuration snapshot for the stats endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct EngineStats {
    /// Distinct entity names across all categories.
    pub total_entities: usize,
    /// Entity counts keyed by category.
    pub entities_by_category: BTreeMap<String, usize>,
    /// Total category keywords in the static tables.
    pub category_keywords: usize,
    /// Size of the out-of-domain keyword table.
    pub ood_keywords: usize,
    /// Weakness table aggregates.
    pub weaknesses: WeaknessStats,
    /// When backing files were last polled.
    pub last_reload_check: DateTime<Utc>,
    /// Modification time of the entity file at last (re)load.
    pub entity_file_mtime: Option<DateTime<Utc>>,
    /// Modification time of the weakness file at last (re)load.
    pub weakness_file_mtime: Option<DateTime<Utc>>,
}

struct ReloadState {
    entity_mtime: Option<SystemTime>,
    weakness_mtime: Option<SystemTime>,
    last_check: DateTime<Utc>,
}

/// Smart routing decision engine.
///
/// Construction is fatal on a missing or malformed backing file; a reload
/// failure keeps the previous structure and logs.
pub struct DecisionEngine {
    entity_path: PathBuf,
    weakness_path: PathBuf,
    opts: EngineOptions,
    entities: RwLock<Arc<EntityTable>>,
    matcher: RwLock<Arc<WeaknessMatcher>>,
    reload: Mutex<ReloadState>,
}

impl DecisionEngine {
    /// Builds the engine, loading both backing files.
    pub fn new(
        entity_path: impl Into<PathBuf>,
        weakness_path: impl Into<PathBuf>,
        opts: EngineOptions,
    ) -> EngineResult<Self> {
        let entity_path = entity_path.into();
        let weakness_path = weakness_path.into();

        let entities = EntityTable::load(&entity_path)?;
        let matcher = WeaknessMatcher::load(&weakness_path)?;

        info!(
            entities = entities.all.len(),
            weaknesses = matcher.len(),
            "decision engine initialized"
        );

        let reload = ReloadState {
            entity_mtime: mtime(&entity_path),
            weakness_mtime: mtime(&weakness_path),
            last_check: Utc::now(),
        };

        Ok(Self {
            entity_path,
            weakness_path,
            opts,
            entities: RwLock::new(Arc::new(entities)),
            matcher: RwLock::new(Arc::new(matcher)),
            reload: Mutex::new(reload),
        })
    }

    /// Distinct entity names currently loaded.
    pub fn entity_count(&self) -> usize {
        self.entities.read().all.len()
    }

    /// Weakness records currently loaded.
    pub fn weakness_count(&self) -> usize {
        self.matcher.read().len()
    }

    /// Whether hot reload is enabled for this engine.
    pub fn hot_reload_enabled(&self) -> bool {
        self.opts.hot_reload
    }

    /// Polls the backing files and reloads whichever changed.
    ///
    /// Returns `true` if anything was reloaded. A parse failure on reload
    /// keeps the old structure; the stale mtime means the next poll retries.
    pub fn check_for_updates(&self) -> bool {
        let mut reload = self.reload.lock();
        let mut reloaded = false;

        let entity_mtime = mtime(&self.entity_path);
        if entity_mtime > reload.entity_mtime {
            match EntityTable::load(&self.entity_path) {
                Ok(table) => {
                    info!(entities = table.all.len(), "entity names updated, reloaded");
                    *self.entities.write() = Arc::new(table);
                    reload.entity_mtime = entity_mtime;
                    reloaded = true;
                }
                Err(e) => {
                    warn!(error = %e, "entity reload failed, keeping previous table");
                }
            }
        }

        let weakness_mtime = mtime(&self.weakness_path);
        if weakness_mtime > reload.weakness_mtime {
            match WeaknessMatcher::load(&self.weakness_path) {
                Ok(matcher) => {
                    info!(weaknesses = matcher.len(), "weakness table updated, reloaded");
                    *self.matcher.write() = Arc::new(matcher);
                    reload.weakness_mtime = weakness_mtime;
                    reloaded = true;
                }
                Err(e) => {
                    warn!(error = %e, "weakness reload failed, keeping previous table");
                }
            }
        }

        reload.last_check = Utc::now();
        reloaded
    }

    /// Unconditionally reparses and swaps both backing files.
    ///
    /// Unlike the mtime poll, a parse failure here is surfaced: a forced
    /// reload is an explicit operator action.
    pub fn force_reload(&self) -> EngineResult<()> {
        let mut reload = self.reload.lock();

        let entities = EntityTable::load(&self.entity_path)?;
        let matcher = WeaknessMatcher::load(&self.weakness_path)?;

        info!(
            entities = entities.all.len(),
            weaknesses = matcher.len(),
            "forced reload complete"
        );

        *self.entities.write() = Arc::new(entities);
        *self.matcher.write() = Arc::new(matcher);
        reload.entity_mtime = mtime(&self.entity_path);
        reload.weakness_mtime = mtime(&self.weakness_path);
        reload.last_check = Utc::now();

        Ok(())
    }

    /// Decides whether retrieval is worth running for `question`.
    ///
    /// Ordered cascade, first match wins. `_min_confidence` is carried for
    /// callers that apply their own cutoff; the cascade itself always
    /// answers with a confidence.
    pub fn should_use_rag(&self, question: &str, _min_confidence: f32) -> (bool, String, f32) {
        let entities = self.entities.read().clone();

        // Exact entity containment beats everything.
        for name in &entities.all {
            if question.contains(name.as_str()) {
                return (true, format!("Exact match: '{name}'"), 0.95);
            }
        }

        for keyword in OOD_KEYWORDS {
            if question.contains(keyword) {
                return (false, format!("Known OOD topic: '{keyword}'"), 0.90);
            }
        }

        let matched: Vec<&str> = CATEGORY_KEYWORDS
            .iter()
            .filter(|(_, keywords)| keywords.iter().any(|kw| question.contains(kw)))
            .map(|(category, _)| *category)
            .collect();
        match matched.len() {
            0 => {}
            1 => return (true, format!("Category match: {}", matched[0]), 0.65),
            _ => {
                return (
                    true,
                    format!("Multiple category matches: {}", matched.join(", ")),
                    0.75,
                )
            }
        }

        // Partial match: a 3-char entity prefix, unless it begins with a
        // generic category word that would match nearly anything.
        for name in &entities.all {
            let prefix: String = name.chars().take(3).collect();
            if prefix.chars().count() < 3 {
                continue;
            }
            if PREFIX_BLOCKLIST.iter().any(|blocked| prefix.starts_with(blocked)) {
                continue;
            }
            if question.contains(&prefix) {
                return (true, format!("Partial match: '{name}'"), 0.60);
            }
        }

        (
            true,
            "Uncertain - defer to threshold filter".to_string(),
            0.50,
        )
    }

    /// Full three-tier routing decision.
    pub fn get_routing_decision(
        &self,
        question: &str,
        entity_type: Option<&str>,
        min_confidence: f32,
        auto_reload: bool,
    ) -> RoutingDecision {
        if auto_reload && self.opts.hot_reload {
            self.check_for_updates();
        }

        let matcher = self.matcher.read().clone();
        let weakness_patterns = matcher.match_weaknesses(
            question,
            entity_type,
            self.opts.weakness_top_k,
            self.opts.weakness_min_frequency,
        );
        let has_weaknesses = !weakness_patterns.is_empty();

        let (use_rag, rag_reason, rag_confidence) = if has_weaknesses {
            // Weakness reminders drive the prompt; retrieval may still
            // supplement with bad-case context.
            (
                true,
                format!(
                    "Supplemental context for weakness: {}",
                    weakness_patterns[0].weakness.weakness_id
                ),
                WEAKNESS_CONFIDENCE,
            )
        } else {
            self.should_use_rag(question, min_confidence)
        };

        let routing_tier = if has_weaknesses {
            RoutingTier::Weakness
        } else if use_rag {
            RoutingTier::Rag
        } else {
            RoutingTier::Baseline
        };

        if has_weaknesses {
            let ids: Vec<&str> = weakness_patterns
                .iter()
                .map(|w| w.weakness.weakness_id.as_str())
                .collect();
            debug!(use_rag, weaknesses = ?ids, "routing decision");
        }

        RoutingDecision {
            use_rag,
            rag_reason,
            rag_confidence,
            weakness_patterns,
            has_weaknesses,
            routing_tier,
            last_reload_check: self.reload.lock().last_check,
        }
    }

    /// Configuration snapshot for the stats endpoint.
    pub fn stats(&self) -> EngineStats {
        let entities = self.entities.read().clone();
        let matcher = self.matcher.read().clone();
        let reload = self.reload.lock();

        EngineStats {
            total_entities: entities.all.len(),
            entities_by_category: entities
                .by_category
                .iter()
                .map(|(category, names)| (category.clone(), names.len()))
                .collect(),
            category_keywords: CATEGORY_KEYWORDS.iter().map(|(_, kws)| kws.len()).sum(),
            ood_keywords: OOD_KEYWORDS.len(),
            weaknesses: matcher.stats(),
            last_reload_check: reload.last_check,
            entity_file_mtime: reload.entity_mtime.map(DateTime::from),
            weakness_file_mtime: reload.weakness_mtime.map(DateTime::from),
        }
    }
}

fn mtime(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|m| m.modified()).ok()
}
