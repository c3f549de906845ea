//! Feedback pipeline — orchestrates one feedback generation.
//!
//! Flow: validate → upsert processing record → segment transcript →
//!       evaluate under retry → complete (or mark error) → outcome.
//!
//! The pipeline never returns `Err`: every run ends in a `FeedbackOutcome`
//! that says whether the record reached `completed`.

use std::str::FromStr;
use std::sync::Arc;

use serde::Serialize;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::feedback::evaluator::{Evaluation, EvaluationSource, Evaluator};
use crate::feedback::store::{FeedbackStore, NewFeedback, StoreError};
use crate::feedback::transcript::{segment, TranscriptEntry};
use crate::models::feedback::FeedbackRecord;
use crate::retry::{with_retry, RetryPolicy};

/// What to do once the evaluator has exhausted its retries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FallbackPolicy {
    /// Store the neutral evaluation (source = fallback) and report success.
    #[default]
    Degrade,
    /// Mark the record `error` and report an evaluation failure.
    Strict,
}

impl FromStr for FallbackPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "degrade" => Ok(FallbackPolicy::Degrade),
            "strict" => Ok(FallbackPolicy::Strict),
            other => Err(format!("expected 'degrade' or 'strict', got '{other}'")),
        }
    }
}

/// Input for one pipeline run. `user_id` comes from the auth gate.
#[derive(Debug, Clone)]
pub struct FeedbackRequest {
    pub interview_id: String,
    pub user_id: String,
    pub transcript: Vec<TranscriptEntry>,
    pub job_role: Option<String>,
    pub record_id: Option<Uuid>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedbackFailure {
    /// Bad input; nothing was written.
    Validation(String),
    /// The explicit record id belongs to another user; nothing was written.
    Conflict(String),
    /// Strict policy only: the evaluator gave up and the record is `error`.
    Evaluation(String),
    /// The store failed; the record keeps its last written state.
    Persistence(String),
}

impl FeedbackFailure {
    pub fn message(&self) -> &str {
        match self {
            FeedbackFailure::Validation(m)
            | FeedbackFailure::Conflict(m)
            | FeedbackFailure::Evaluation(m)
            | FeedbackFailure::Persistence(m) => m,
        }
    }
}

/// Terminal result of a pipeline run.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedbackOutcome {
    pub record_id: Option<Uuid>,
    pub source: Option<EvaluationSource>,
    pub failure: Option<FeedbackFailure>,
}

impl FeedbackOutcome {
    fn completed(record_id: Uuid, source: EvaluationSource) -> Self {
        Self {
            record_id: Some(record_id),
            source: Some(source),
            failure: None,
        }
    }

    fn failed(record_id: Option<Uuid>, failure: FeedbackFailure) -> Self {
        Self {
            record_id,
            source: None,
            failure: Some(failure),
        }
    }

    pub fn is_success(&self) -> bool {
        self.failure.is_none()
    }

    pub fn summary(&self) -> FeedbackSummary {
        FeedbackSummary {
            success: self.is_success(),
            record_id: self.record_id,
            error: self.failure.as_ref().map(|f| f.message().to_string()),
        }
    }
}

/// Wire shape of an outcome: `{ success, record_id, error? }`.
#[derive(Debug, Clone, Serialize)]
pub struct FeedbackSummary {
    pub success: bool,
    pub record_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub struct FeedbackPipeline {
    store: Arc<dyn FeedbackStore>,
    evaluator: Arc<dyn Evaluator>,
    retry: RetryPolicy,
    fallback: FallbackPolicy,
    default_job_role: String,
}

impl FeedbackPipeline {
    pub fn new(
        store: Arc<dyn FeedbackStore>,
        evaluator: Arc<dyn Evaluator>,
        retry: RetryPolicy,
        fallback: FallbackPolicy,
        default_job_role: String,
    ) -> Self {
        Self {
            store,
            evaluator,
            retry,
            fallback,
            default_job_role,
        }
    }

    /// Runs one feedback generation to a terminal outcome.
    pub async fn run(&self, request: FeedbackRequest) -> FeedbackOutcome {
        let interview_id = request.interview_id.trim().to_string();
        let user_id = request.user_id.trim().to_string();

        if interview_id.is_empty() {
            return FeedbackOutcome::failed(
                None,
                FeedbackFailure::Validation("interview_id cannot be empty".to_string()),
            );
        }
        if user_id.is_empty() {
            return FeedbackOutcome::failed(
                None,
                FeedbackFailure::Validation("user_id cannot be empty".to_string()),
            );
        }

        let job_role = request
            .job_role
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty())
            .unwrap_or_else(|| self.default_job_role.clone());

        // Step 1: processing record
        let pairs = segment(&request.transcript);
        let record_id = match self
            .store
            .create_pending(NewFeedback {
                record_id: request.record_id,
                interview_id: interview_id.clone(),
                user_id: user_id.clone(),
                job_role: job_role.clone(),
                transcript: request.transcript,
            })
            .await
        {
            Ok(id) => id,
            Err(e) => {
                error!(interview_id = %interview_id, "Failed to create feedback record: {e}");
                let failure = match e {
                    StoreError::Conflict(_) => FeedbackFailure::Conflict(e.to_string()),
                    _ => FeedbackFailure::Persistence(format!(
                        "Failed to create feedback record: {e}"
                    )),
                };
                return FeedbackOutcome::failed(request.record_id, failure);
            }
        };

        info!(
            record_id = %record_id,
            interview_id = %interview_id,
            pairs = pairs.len(),
            "Evaluating interview transcript"
        );

        // Step 2: evaluation
        let (evaluation, source) = if pairs.is_empty() {
            info!(record_id = %record_id, "Transcript has no Q&A pairs, storing neutral evaluation");
            (Evaluation::neutral(), EvaluationSource::EmptyTranscript)
        } else {
            let result = with_retry("evaluate_interview", &self.retry, || {
                self.evaluator.evaluate(&pairs, &job_role)
            })
            .await;

            match (result, self.fallback) {
                (Ok(evaluation), _) => (evaluation, EvaluationSource::Model),
                (Err(e), FallbackPolicy::Degrade) => {
                    warn!(record_id = %record_id, "Evaluation failed, storing neutral fallback: {e}");
                    (Evaluation::neutral(), EvaluationSource::Fallback)
                }
                (Err(e), FallbackPolicy::Strict) => {
                    let message = format!("Evaluation failed: {e}");
                    error!(record_id = %record_id, "{message}");
                    if let Err(store_err) = self.store.mark_error(record_id, &message).await {
                        error!(record_id = %record_id, "Failed to mark record as errored: {store_err}");
                        return FeedbackOutcome::failed(
                            Some(record_id),
                            FeedbackFailure::Persistence(format!(
                                "Failed to mark record as errored: {store_err}"
                            )),
                        );
                    }
                    return FeedbackOutcome::failed(
                        Some(record_id),
                        FeedbackFailure::Evaluation(message),
                    );
                }
            }
        };

        // Step 3: persist
        if let Err(e) = self
            .store
            .complete_with_evaluation(record_id, &evaluation, source)
            .await
        {
            error!(record_id = %record_id, "Failed to store evaluation: {e}");
            return FeedbackOutcome::failed(
                Some(record_id),
                FeedbackFailure::Persistence(format!("Failed to store evaluation: {e}")),
            );
        }

        info!(
            record_id = %record_id,
            source = source.as_str(),
            overall_score = evaluation.overall_score,
            "Feedback completed"
        );
        FeedbackOutcome::completed(record_id, source)
    }

    /// Primary read path: the record for this interview, or `None`.
    pub async fn lookup(
        &self,
        interview_id: &str,
        user_id: &str,
    ) -> Result<Option<FeedbackRecord>, StoreError> {
        self.store
            .find_by_interview(interview_id.trim(), user_id)
            .await
    }

    /// Loose fallback read: the user's most recent record for any interview.
    /// Callers must not treat this as the record for a specific interview.
    pub async fn latest_for_user(
        &self,
        user_id: &str,
    ) -> Result<Option<FeedbackRecord>, StoreError> {
        self.store.find_latest_for_user(user_id).await
    }

    pub async fn get(
        &self,
        record_id: Uuid,
        user_id: &str,
    ) -> Result<Option<FeedbackRecord>, StoreError> {
        self.store.find_by_id(record_id, user_id).await
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
