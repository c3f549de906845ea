use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::errors::AppError;
use crate::feedback::pipeline::{FeedbackFailure, FeedbackRequest, FeedbackSummary};
use crate::feedback::transcript::TranscriptEntry;
use crate::models::feedback::FeedbackRecord;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct GenerateFeedbackRequest {
    pub interview_id: String,
    #[serde(default)]
    pub transcript: Vec<TranscriptEntry>,
    pub job_role: Option<String>,
    pub record_id: Option<Uuid>,
}

/// POST /api/v1/feedback
///
/// Always answers with `{ success, record_id, error? }`; the status code
/// tells which stage failed.
pub async fn handle_generate_feedback(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<GenerateFeedbackRequest>,
) -> (StatusCode, Json<FeedbackSummary>) {
    let outcome = state
        .feedback
        .run(FeedbackRequest {
            interview_id: req.interview_id,
            user_id: user.user_id,
            transcript: req.transcript,
            job_role: req.job_role,
            record_id: req.record_id,
        })
        .await;

    let status = match &outcome.failure {
        None => StatusCode::CREATED,
        Some(FeedbackFailure::Validation(_)) => StatusCode::BAD_REQUEST,
        Some(FeedbackFailure::Conflict(_)) => StatusCode::CONFLICT,
        Some(FeedbackFailure::Evaluation(_)) => StatusCode::BAD_GATEWAY,
        Some(FeedbackFailure::Persistence(_)) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(outcome.summary()))
}

/// GET /api/v1/feedback/interview/:interview_id
pub async fn handle_get_by_interview(
    State(state): State<AppState>,
    user: AuthUser,
    Path(interview_id): Path<String>,
) -> Result<Json<FeedbackRecord>, AppError> {
    state
        .feedback
        .lookup(&interview_id, &user.user_id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("No feedback for interview {interview_id}")))
}

/// GET /api/v1/feedback/latest
///
/// Most recent record for the caller across all interviews.
pub async fn handle_get_latest(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<FeedbackRecord>, AppError> {
    state
        .feedback
        .latest_for_user(&user.user_id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("No feedback recorded yet".to_string()))
}

/// GET /api/v1/feedback/records/:id
pub async fn handle_get_record(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<FeedbackRecord>, AppError> {
    state
        .feedback
        .get(id, &user.user_id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Feedback {id} not found")))
}
