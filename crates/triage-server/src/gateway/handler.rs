use axum::{Json, extract::State};
use tracing::{debug, info};

use triage::embedding::EmbeddingProvider;
use triage::engine::RoutingDecision;
use triage::hashing::hash_decision_key;
use triage::patterns::{RetrievedPattern, Severity};

use super::error::GatewayError;
use super::payload::{
    AddPatternsRequest, AddPatternsResponse, PromptRequest, PromptResponse, ReloadResponse,
    RouteRequest, StatsResponse,
};
use super::state::HandlerState;

/// Routing decision for a question.
#[tracing::instrument(skip(state, request), fields(entity_type = ?request.entity_type))]
pub async fn route_handler<P: EmbeddingProvider + 'static>(
    State(state): State<HandlerState<P>>,
    Json(request): Json<RouteRequest>,
) -> Result<Json<RoutingDecision>, GatewayError> {
    if request.question.trim().is_empty() {
        return Err(GatewayError::InvalidRequest("question is empty".into()));
    }

    let decision = decide(
        &state,
        &request.question,
        request.entity_type.as_deref(),
        request.min_confidence,
    );
    Ok(Json(decision))
}

/// Routing decision plus a ready-to-use enhanced prompt.
#[tracing::instrument(skip(state, request), fields(entity_type = ?request.entity_type))]
pub async fn prompt_handler<P: EmbeddingProvider + 'static>(
    State(state): State<HandlerState<P>>,
    Json(request): Json<PromptRequest>,
) -> Result<Json<PromptResponse>, GatewayError> {
    if request.question.trim().is_empty() {
        return Err(GatewayError::InvalidRequest("question is empty".into()));
    }

    let decision = decide(
        &state,
        &request.question,
        request.entity_type.as_deref(),
        request.min_confidence,
    );

    // Retrieval is supplemental: it runs only when the decision calls for it
    // and clears the configured confidence floor.
    let retrieved = if decision.use_rag && decision.rag_confidence >= state.rag_min_confidence {
        state
            .patterns
            .retrieve_relevant(
                &request.question,
                state.retrieval_k,
                request.entity_type.as_deref(),
                Severity::Minor,
                state.relevance_threshold,
            )
            .await
    } else {
        Vec::new()
    };

    let rag_context = format_rag_context(&retrieved);
    let enhanced_prompt = state.prompt_builder.build_prompt(
        request.base_prompt.as_deref(),
        &decision.weakness_patterns,
        rag_context.as_deref(),
    );

    debug!(
        weaknesses = decision.weakness_patterns.len(),
        rag_patterns = retrieved.len(),
        "enhanced prompt built"
    );

    Ok(Json(PromptResponse {
        enhanced_prompt,
        use_rag: decision.use_rag,
        weakness_patterns_applied: decision.weakness_patterns.len(),
        rag_patterns_used: retrieved.len(),
        routing_decision: decision,
    }))
}

/// Engine + pattern-store statistics.
#[tracing::instrument(skip(state))]
pub async fn stats_handler<P: EmbeddingProvider + 'static>(
    State(state): State<HandlerState<P>>,
) -> Json<StatsResponse> {
    Json(StatsResponse {
        engine: state.engine.stats(),
        patterns: state.patterns.stats(),
        decision_cache_entries: state.decision_cache.entry_count(),
    })
}

/// Unconditional reparse of both backing files.
#[tracing::instrument(skip(state))]
pub async fn reload_handler<P: EmbeddingProvider + 'static>(
    State(state): State<HandlerState<P>>,
) -> Result<Json<ReloadResponse>, GatewayError> {
    state.engine.force_reload()?;
    state.decision_cache.invalidate_all();

    info!("forced reload via API");
    Ok(Json(ReloadResponse {
        reloaded: true,
        message: "Data reloaded successfully",
        entities_loaded: state.engine.entity_count(),
        weaknesses_loaded: state.engine.weakness_count(),
        timestamp: chrono::Utc::now(),
    }))
}

/// Bulk pattern ingestion (used by the offline evaluation pipeline).
#[tracing::instrument(skip(state, request), fields(count = request.patterns.len()))]
pub async fn add_patterns_handler<P: EmbeddingProvider + 'static>(
    State(state): State<HandlerState<P>>,
    Json(request): Json<AddPatternsRequest>,
) -> Result<Json<AddPatternsResponse>, GatewayError> {
    if request.patterns.is_empty() {
        return Err(GatewayError::InvalidRequest("patterns is empty".into()));
    }
    if request.patterns.iter().any(|p| p.description.trim().is_empty()) {
        return Err(GatewayError::InvalidRequest(
            "pattern description is empty".into(),
        ));
    }

    let ids = state.patterns.add_patterns_batch(request.patterns).await?;

    Ok(Json(AddPatternsResponse {
        added: ids.len(),
        ids,
        total_patterns: state.patterns.len(),
    }))
}

/// Cache-aware routing decision.
///
/// The hot-reload poll happens here, outside the engine call, so a reload
/// can drop every cached decision computed against the old tables before
/// the lookup.
fn decide<P: EmbeddingProvider + 'static>(
    state: &HandlerState<P>,
    question: &str,
    entity_type: Option<&str>,
    min_confidence: Option<f32>,
) -> RoutingDecision {
    if state.engine.hot_reload_enabled() && state.engine.check_for_updates() {
        state.decision_cache.invalidate_all();
    }

    let key = hash_decision_key(question, entity_type);
    if let Some(decision) = state.decision_cache.get(&key) {
        debug!("decision cache hit");
        return decision;
    }

    let decision = state.engine.get_routing_decision(
        question,
        entity_type,
        min_confidence.unwrap_or(state.rag_min_confidence),
        false,
    );
    state.decision_cache.insert(key, decision.clone());
    decision
}

/// Renders retrieved patterns as the reference-material block: the guideline
/// to follow, with the error it prevents alongside.
fn format_rag_context(retrieved: &[RetrievedPattern]) -> Option<String> {
    if retrieved.is_empty() {
        return None;
    }

    let lines: Vec<String> = retrieved
        .iter()
        .map(|r| format!("- {}（易错点：{}）", r.pattern.guideline, r.pattern.description))
        .collect();
    Some(lines.join("\n"))
}
