mod analysis;
mod chat;
mod config;
mod errors;
mod extraction;
mod llm_client;
mod routes;
mod state;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::llm_client::GeminiClient;
use crate::routes::build_router;
use crate::state::{spawn_session_sweeper, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on a missing GEMINI_KEY)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={}",
                env!("CARGO_PKG_NAME").replace('-', "_"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Resume Analyzer API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize LLM client
    let model = GeminiClient::new(
        config.gemini_api_key.clone(),
        Duration::from_secs(config.llm_timeout_secs),
    )?;
    info!(
        "LLM client initialized (model: {}, timeout: {}s)",
        llm_client::MODEL,
        config.llm_timeout_secs
    );
    info!("Upload limit: {} bytes", config.max_upload_bytes);

    let state = AppState::new(config.clone(), Arc::new(model));
    spawn_session_sweeper(state.sessions.clone(), config.session_ttl_secs);
    info!("Idle sessions expire after {}s", config.session_ttl_secs);

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
