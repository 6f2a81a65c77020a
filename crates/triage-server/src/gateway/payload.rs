use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use triage::engine::{EngineStats, RoutingDecision};
use triage::patterns::{NewPattern, StoreStats};

#[derive(Debug, Deserialize)]
pub struct RouteRequest {
    pub question: String,
    #[serde(default)]
    pub entity_type: Option<String>,
    #[serde(default)]
    pub min_confidence: Option<f32>,
}

#[derive(Debug, Deserialize)]
pub struct PromptRequest {
    pub question: String,
    #[serde(default)]
    pub entity_type: Option<String>,
    #[serde(default)]
    pub min_confidence: Option<f32>,
    #[serde(default)]
    pub base_prompt: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PromptResponse {
    pub enhanced_prompt: String,
    pub use_rag: bool,
    pub weakness_patterns_applied: usize,
    /// Retrieved patterns folded into the reference section.
    pub rag_patterns_used: usize,
    pub routing_decision: RoutingDecision,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub entities_loaded: usize,
    pub weaknesses_loaded: usize,
    pub patterns_loaded: usize,
    pub hot_reload_enabled: bool,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub engine: EngineStats,
    pub patterns: StoreStats,
    pub decision_cache_entries: u64,
}

#[derive(Debug, Serialize)]
pub struct ReloadResponse {
    pub reloaded: bool,
    pub message: &'static str,
    pub entities_loaded: usize,
    pub weaknesses_loaded: usize,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct AddPatternsRequest {
    pub patterns: Vec<NewPattern>,
}

#[derive(Debug, Serialize)]
pub struct AddPatternsResponse {
    pub added: usize,
    pub ids: Vec<usize>,
    pub total_patterns: usize,
}
