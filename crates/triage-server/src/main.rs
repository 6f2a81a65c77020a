//! Triage HTTP server entrypoint.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use mimalloc::MiMalloc;
use tokio::net::TcpListener;
use tokio::signal;

use triage::config::Config;
use triage::embedding::{EmbeddingCache, RemoteEmbedder};
use triage::engine::{DecisionEngine, EngineOptions};
use triage::patterns::PatternStore;
use triage_server::gateway::{HandlerState, create_router_with_state};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

const EMBEDDING_CACHE_FILENAME: &str = "embedding_cache.json";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    println!(
        r#"
████████╗██████╗ ██╗ █████╗  ██████╗ ███████╗
╚══██╔══╝██╔══██╗██║██╔══██╗██╔════╝ ██╔════╝
   ██║   ██████╔╝██║███████║██║  ███╗█████╗
   ██║   ██╔══██╗██║██╔══██║██║   ██║██╔══╝
   ██║   ██║  ██║██║██║  ██║╚██████╔╝███████╗
   ╚═╝   ╚═╝  ╚═╝╚═╝╚═╝  ╚═╝ ╚═════╝ ╚══════╝

        MATCH. RETRIEVE. ROUTE.
                                      AGPL-3.0
"#
    );

    if std::env::args().any(|arg| arg == "--health-check") {
        std::process::exit(run_health_check());
    }

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = Config::from_env()?;
    config.validate()?;
    let addr: SocketAddr = config.socket_addr().parse()?;

    tracing::info!(
        bind_addr = %config.bind_addr,
        port = config.port,
        "Triage starting"
    );

    let embedder = RemoteEmbedder::new(
        &config.embedding_base_url,
        config.embedding_model.clone(),
        config.embedding_api_key.clone(),
        config.embedding_dimension,
    )?;
    let embedding_cache = EmbeddingCache::open(
        embedder,
        config.data_dir.join(EMBEDDING_CACHE_FILENAME),
        config.max_embed_chars,
    )?;

    let patterns = Arc::new(PatternStore::open(embedding_cache, &config.data_dir)?);

    let engine = Arc::new(DecisionEngine::new(
        config.entity_names_path.clone(),
        config.weaknesses_path.clone(),
        EngineOptions {
            weakness_top_k: config.weakness_top_k,
            weakness_min_frequency: config.weakness_min_frequency,
            hot_reload: config.hot_reload,
        },
    )?);

    tracing::info!(
        entities = engine.entity_count(),
        weaknesses = engine.weakness_count(),
        patterns = patterns.len(),
        hot_reload = config.hot_reload,
        "router components ready"
    );

    let state = HandlerState::new(engine, patterns, &config);
    let app = create_router_with_state(state);

    let listener = TcpListener::bind(addr).await?;
    tracing::info!(addr = %addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Triage shutdown complete");
    Ok(())
}

fn run_health_check() -> i32 {
    let port = std::env::var("TRIAGE_PORT")
        .ok()
        .and_then(|p| p.parse::<u16>().ok())
        .unwrap_or(8000);

    let url = format!("http://127.0.0.1:{}/healthz", port);

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("failed to build runtime");

    rt.block_on(async {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(1))
            .build()
            .expect("failed to build client");

        match client.get(&url).send().await {
            Ok(res) if res.status().is_success() => 0,
            _ => 1,
        }
    })
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
