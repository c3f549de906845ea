//! Axum route handlers for the Interview API.

use axum::{extract::State, Json};

use crate::auth::AuthUser;
use crate::errors::AppError;
use crate::interview::questions::{generate_questions, QuestionList, QuestionRequest};
use crate::state::AppState;

/// POST /api/v1/interviews/questions
///
/// Generates a voice-safe list of interview questions.
pub async fn handle_generate_questions(
    State(state): State<AppState>,
    _user: AuthUser,
    Json(request): Json<QuestionRequest>,
) -> Result<Json<QuestionList>, AppError> {
    let list = generate_questions(&state.llm, &state.config.retry, &request).await?;
    Ok(Json(list))
}
