//! BaristaBot - conversational café ordering
//!
//! An LLM dialogue policy drives a small tool catalog that edits a
//! per-session order, served as a web page and a JSON API.

mod api;
mod config;
mod llm;
mod runtime;
mod state_machine;
mod system_prompt;
mod tools;

use api::{create_router, AppState};
use config::AppConfig;
use llm::{GeminiService, LlmService, LoggingService};
use runtime::SessionManager;
use std::sync::Arc;
use tools::ToolCatalog;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "baristabot=info,tower_http=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    // Configuration; a missing API key stops startup here
    let config = AppConfig::from_env().map_err(|e| {
        tracing::error!(error = %e, "Invalid configuration");
        e
    })?;

    // Dialogue policy
    let gemini = GeminiService::new(&config.llm)?;
    let llm: Arc<dyn LlmService> = Arc::new(LoggingService::new(Arc::new(gemini)));
    tracing::info!(model = %llm.model_id(), "Dialogue policy initialized");

    let catalog = Arc::new(ToolCatalog::new());
    let system_prompt = system_prompt::build_system_prompt(&catalog);
    let sessions = SessionManager::new(
        llm,
        catalog,
        system_prompt,
        config.llm.max_tokens,
        config.session.clone(),
    );

    let state = AppState::new(sessions);

    // Create router
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let compression = CompressionLayer::new()
        .gzip(true)
        .br(true)
        .deflate(true)
        .zstd(true);

    let app = create_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(compression);

    // Start server
    let addr = config.server.addr;
    tracing::info!("BaristaBot server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
