use std::sync::Arc;

use crate::config::Config;
use crate::feedback::pipeline::FeedbackPipeline;
use crate::llm_client::LlmClient;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Feedback generation and every feedback read go through the pipeline.
    pub feedback: Arc<FeedbackPipeline>,
    pub llm: LlmClient,
    pub config: Config,
}
