//! PostgreSQL-backed feedback store.

use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::feedback::evaluator::{Evaluation, EvaluationSource};
use crate::feedback::store::{FeedbackStore, NewFeedback, StoreError};
use crate::models::feedback::{FeedbackRecord, FeedbackRow, FeedbackStatus};

pub struct PgFeedbackStore {
    pool: PgPool,
}

impl PgFeedbackStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn into_record(row: Option<FeedbackRow>) -> Result<Option<FeedbackRecord>, StoreError> {
        row.map(FeedbackRecord::try_from)
            .transpose()
            .map_err(StoreError::Corrupt)
    }
}

#[async_trait]
impl FeedbackStore for PgFeedbackStore {
    async fn create_pending(&self, new: NewFeedback) -> Result<Uuid, StoreError> {
        let id = new.record_id.unwrap_or_else(Uuid::new_v4);

        // Upsert keyed by id. The WHERE guard turns a foreign-owned id into
        // zero affected rows instead of a takeover.
        let result = sqlx::query(
            r#"
            INSERT INTO feedbacks (id, interview_id, user_id, job_role, status, transcript)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (id) DO UPDATE SET
                interview_id = EXCLUDED.interview_id,
                job_role = EXCLUDED.job_role,
                transcript = EXCLUDED.transcript,
                status = EXCLUDED.status,
                error_message = NULL,
                updated_at = now()
            WHERE feedbacks.user_id = EXCLUDED.user_id
            "#,
        )
        .bind(id)
        .bind(&new.interview_id)
        .bind(&new.user_id)
        .bind(&new.job_role)
        .bind(FeedbackStatus::Processing.as_str())
        .bind(Json(&new.transcript))
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Conflict(id));
        }

        info!(
            record_id = %id,
            interview_id = %new.interview_id,
            user_id = %new.user_id,
            "Feedback record set to processing"
        );
        Ok(id)
    }

    async fn complete_with_evaluation(
        &self,
        record_id: Uuid,
        evaluation: &Evaluation,
        source: EvaluationSource,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE feedbacks SET
                communication = $2,
                technical_knowledge = $3,
                problem_solving = $4,
                confidence = $5,
                overall_score = $6,
                strengths = $7,
                areas_for_improvement = $8,
                detailed_feedback = $9,
                source = $10,
                status = $11,
                evaluated_at = now(),
                updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(record_id)
        .bind(evaluation.communication as i16)
        .bind(evaluation.technical_knowledge as i16)
        .bind(evaluation.problem_solving as i16)
        .bind(evaluation.confidence as i16)
        .bind(evaluation.overall_score as i16)
        .bind(&evaluation.strengths)
        .bind(&evaluation.areas_for_improvement)
        .bind(&evaluation.detailed_feedback)
        .bind(source.as_str())
        .bind(FeedbackStatus::Completed.as_str())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(record_id));
        }
        Ok(())
    }

    async fn mark_error(&self, record_id: Uuid, message: &str) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE feedbacks SET status = $3, error_message = $2, updated_at = now() WHERE id = $1",
        )
        .bind(record_id)
        .bind(message)
        .bind(FeedbackStatus::Error.as_str())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(record_id));
        }
        Ok(())
    }

    async fn find_by_interview(
        &self,
        interview_id: &str,
        user_id: &str,
    ) -> Result<Option<FeedbackRecord>, StoreError> {
        let row = sqlx::query_as::<_, FeedbackRow>(
            r#"
            SELECT * FROM feedbacks
            WHERE interview_id = $1 AND user_id = $2
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(interview_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Self::into_record(row)
    }

    async fn find_latest_for_user(
        &self,
        user_id: &str,
    ) -> Result<Option<FeedbackRecord>, StoreError> {
        let row = sqlx::query_as::<_, FeedbackRow>(
            "SELECT * FROM feedbacks WHERE user_id = $1 ORDER BY created_at DESC LIMIT 1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Self::into_record(row)
    }

    async fn find_by_id(
        &self,
        record_id: Uuid,
        user_id: &str,
    ) -> Result<Option<FeedbackRecord>, StoreError> {
        let row = sqlx::query_as::<_, FeedbackRow>(
            "SELECT * FROM feedbacks WHERE id = $1 AND user_id = $2",
        )
        .bind(record_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Self::into_record(row)
    }
}
