use std::sync::Arc;
use std::time::Duration;

use moka::sync::Cache;

use triage::config::Config;
use triage::embedding::EmbeddingProvider;
use triage::engine::{DecisionEngine, RoutingDecision};
use triage::patterns::PatternStore;
use triage::prompt::PromptBuilder;

/// Shared state behind every handler.
///
/// The routing-decision cache is keyed by a hash of (question, entity_type)
/// and invalidated whenever a hot reload swaps the backing data, so a cached
/// decision never outlives the table that produced it.
pub struct HandlerState<P: EmbeddingProvider + 'static> {
    pub engine: Arc<DecisionEngine>,
    pub patterns: Arc<PatternStore<P>>,
    pub prompt_builder: PromptBuilder,
    pub decision_cache: Cache<u64, RoutingDecision>,
    pub rag_min_confidence: f32,
    pub relevance_threshold: f32,
    pub retrieval_k: usize,
}

// Derived Clone would require P: Clone; the store is behind an Arc anyway.
impl<P: EmbeddingProvider + 'static> Clone for HandlerState<P> {
    fn clone(&self) -> Self {
        Self {
            engine: Arc::clone(&self.engine),
            patterns: Arc::clone(&self.patterns),
            prompt_builder: self.prompt_builder,
            decision_cache: self.decision_cache.clone(),
            rag_min_confidence: self.rag_min_confidence,
            relevance_threshold: self.relevance_threshold,
            retrieval_k: self.retrieval_k,
        }
    }
}

impl<P: EmbeddingProvider + 'static> HandlerState<P> {
    pub fn new(engine: Arc<DecisionEngine>, patterns: Arc<PatternStore<P>>, config: &Config) -> Self {
        let decision_cache = Cache::builder()
            .max_capacity(config.decision_cache_capacity)
            .time_to_live(Duration::from_secs(config.decision_cache_ttl_secs))
            .build();

        Self {
            engine,
            patterns,
            prompt_builder: PromptBuilder,
            decision_cache,
            rag_min_confidence: config.rag_min_confidence,
            relevance_threshold: config.relevance_threshold,
            retrieval_k: config.retrieval_k,
        }
    }
}
