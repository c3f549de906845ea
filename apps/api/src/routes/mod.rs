pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::feedback::handlers as feedback;
use crate::interview::handlers as interview;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Feedback API
        .route("/api/v1/feedback", post(feedback::handle_generate_feedback))
        .route("/api/v1/feedback/latest", get(feedback::handle_get_latest))
        .route(
            "/api/v1/feedback/interview/:interview_id",
            get(feedback::handle_get_by_interview),
        )
        .route(
            "/api/v1/feedback/records/:id",
            get(feedback::handle_get_record),
        )
        // Interview API
        .route(
            "/api/v1/interviews/questions",
            post(interview::handle_generate_questions),
        )
        .with_state(state)
}
