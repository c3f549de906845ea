mod auth;
mod config;
mod db;
mod errors;
mod feedback;
mod interview;
mod llm_client;
mod models;
mod retry;
mod routes;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::db::create_pool;
use crate::feedback::evaluator::LlmEvaluator;
use crate::feedback::pg_store::PgFeedbackStore;
use crate::feedback::pipeline::FeedbackPipeline;
use crate::feedback::store::{FeedbackStore, InMemoryFeedbackStore};
use crate::llm_client::{LlmClient, LlmSettings};
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Mock Interview API v{}", env!("CARGO_PKG_VERSION"));

    // Feedback store: PostgreSQL when configured, process memory otherwise
    let store: Arc<dyn FeedbackStore> = match &config.database_url {
        Some(url) => Arc::new(PgFeedbackStore::new(create_pool(url).await?)),
        None => {
            warn!("DATABASE_URL not set; feedback records are kept in memory only");
            Arc::new(InMemoryFeedbackStore::new())
        }
    };

    // Initialize LLM client
    let llm = LlmClient::new(LlmSettings {
        api_url: config.llm_api_url.clone(),
        api_key: config.anthropic_api_key.clone(),
        model: config.llm_model.clone(),
        timeout: config.llm_timeout,
    })?;
    info!("LLM client initialized (model: {})", llm.model());

    let evaluator = Arc::new(LlmEvaluator::new(llm.clone(), config.max_qa_pairs));
    let feedback = FeedbackPipeline::new(
        store,
        evaluator,
        config.retry,
        config.fallback_policy,
        config.default_job_role.clone(),
    );
    info!(
        fallback = ?config.fallback_policy,
        retries = config.retry.retries,
        "Feedback pipeline ready"
    );

    let state = AppState {
        feedback: Arc::new(feedback),
        llm,
        config: config.clone(),
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict origins to the web client's domain

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
