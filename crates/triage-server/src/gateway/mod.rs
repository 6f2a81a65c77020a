//! HTTP gateway (Axum) for the smart router.
//!
//! This module is primarily used by the `triage` server binary.

#![allow(missing_docs)]

pub mod error;
pub mod handler;
pub mod payload;
pub mod state;


use axum::{
    Json, Router,
    routing::{get, post},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub use handler::{
    add_patterns_handler, prompt_handler, reload_handler, route_handler, stats_handler,
};
pub use state::HandlerState;

use payload::HealthResponse;
use triage::embedding::EmbeddingProvider;

pub fn create_router_with_state<P>(state: HandlerState<P>) -> Router
where
    P: EmbeddingProvider + 'static,
{
    Router::new()
        .route("/healthz", get(health_handler))
        .route("/api/v1/route", post(route_handler))
        .route("/api/v1/prompt", post(prompt_handler))
        .route("/api/v1/stats", get(stats_handler))
        .route("/api/v1/reload", post(reload_handler))
        .route("/api/v1/patterns", post(add_patterns_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[tracing::instrument(skip(state))]
pub async fn health_handler<P: EmbeddingProvider + 'static>(
    axum::extract::State(state): axum::extract::State<HandlerState<P>>,
) -> Json<HealthResponse> {
    let entities_loaded = state.engine.entity_count();
    let weaknesses_loaded = state.engine.weakness_count();

    // The service still answers with empty tables, just without its signals.
    let status = if entities_loaded == 0 || weaknesses_loaded == 0 {
        "degraded"
    } else {
        "healthy"
    };

    Json(HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION"),
        entities_loaded,
        weaknesses_loaded,
        patterns_loaded: state.patterns.len(),
        hot_reload_enabled: state.engine.hot_reload_enabled(),
    })
}
