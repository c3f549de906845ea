//! Feedback Record Store — persistence seam for feedback records.
//!
//! Default backend: `PgFeedbackStore` (see `pg_store.rs`).
//! `InMemoryFeedbackStore` is used when no `DATABASE_URL` is configured and
//! by the pipeline tests.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::feedback::evaluator::{Evaluation, EvaluationSource};
use crate::feedback::transcript::TranscriptEntry;
use crate::models::feedback::{FeedbackRecord, FeedbackStatus};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("feedback record {0} not found")]
    NotFound(Uuid),

    /// An explicit record id already belongs to another user.
    #[error("feedback record {0} belongs to another user")]
    Conflict(Uuid),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("corrupt feedback record: {0}")]
    Corrupt(String),
}

/// Input for `create_pending`.
#[derive(Debug, Clone)]
pub struct NewFeedback {
    /// Upsert key. `None` always allocates a fresh record.
    pub record_id: Option<Uuid>,
    pub interview_id: String,
    pub user_id: String,
    pub job_role: String,
    pub transcript: Vec<TranscriptEntry>,
}

#[async_trait]
pub trait FeedbackStore: Send + Sync {
    /// Inserts (or resets) a record in `processing` state and returns its id.
    async fn create_pending(&self, new: NewFeedback) -> Result<Uuid, StoreError>;

    /// Merges the evaluation into the record and marks it `completed`.
    async fn complete_with_evaluation(
        &self,
        record_id: Uuid,
        evaluation: &Evaluation,
        source: EvaluationSource,
    ) -> Result<(), StoreError>;

    /// Marks the record `error`. Evaluation fields are left untouched.
    async fn mark_error(&self, record_id: Uuid, message: &str) -> Result<(), StoreError>;

    /// Primary lookup. Returns the most recent match when duplicates exist.
    async fn find_by_interview(
        &self,
        interview_id: &str,
        user_id: &str,
    ) -> Result<Option<FeedbackRecord>, StoreError>;

    /// Loose fallback: the user's most recent record for any interview.
    async fn find_latest_for_user(
        &self,
        user_id: &str,
    ) -> Result<Option<FeedbackRecord>, StoreError>;

    async fn find_by_id(
        &self,
        record_id: Uuid,
        user_id: &str,
    ) -> Result<Option<FeedbackRecord>, StoreError>;
}

// ────────────────────────────────────────────────────────────────────────────
// InMemoryFeedbackStore
// ────────────────────────────────────────────────────────────────────────────

/// Process-local store. Records are lost on restart.
#[derive(Default)]
pub struct InMemoryFeedbackStore {
    records: RwLock<HashMap<Uuid, FeedbackRecord>>,
}

impl InMemoryFeedbackStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    fn latest<'a>(
        records: impl Iterator<Item = &'a FeedbackRecord>,
    ) -> Option<FeedbackRecord> {
        records.max_by_key(|r| r.created_at).cloned()
    }
}

#[async_trait]
impl FeedbackStore for InMemoryFeedbackStore {
    async fn create_pending(&self, new: NewFeedback) -> Result<Uuid, StoreError> {
        let now = Utc::now();
        let mut records = self.records.write().await;
        let id = new.record_id.unwrap_or_else(Uuid::new_v4);

        if let Some(existing) = records.get_mut(&id) {
            if existing.user_id != new.user_id {
                return Err(StoreError::Conflict(id));
            }
            existing.interview_id = new.interview_id;
            existing.job_role = new.job_role;
            existing.transcript = new.transcript;
            existing.status = FeedbackStatus::Processing;
            existing.error_message = None;
            existing.updated_at = now;
            return Ok(id);
        }

        records.insert(
            id,
            FeedbackRecord {
                id,
                interview_id: new.interview_id,
                user_id: new.user_id,
                job_role: new.job_role,
                status: FeedbackStatus::Processing,
                error_message: None,
                transcript: new.transcript,
                communication: None,
                technical_knowledge: None,
                problem_solving: None,
                confidence: None,
                overall_score: None,
                strengths: Vec::new(),
                areas_for_improvement: Vec::new(),
                detailed_feedback: None,
                source: None,
                created_at: now,
                updated_at: now,
                evaluated_at: None,
            },
        );
        Ok(id)
    }

    async fn complete_with_evaluation(
        &self,
        record_id: Uuid,
        evaluation: &Evaluation,
        source: EvaluationSource,
    ) -> Result<(), StoreError> {
        let mut records = self.records.write().await;
        let record = records
            .get_mut(&record_id)
            .ok_or(StoreError::NotFound(record_id))?;
        record.apply_evaluation(evaluation, source, Utc::now());
        Ok(())
    }

    async fn mark_error(&self, record_id: Uuid, message: &str) -> Result<(), StoreError> {
        let mut records = self.records.write().await;
        let record = records
            .get_mut(&record_id)
            .ok_or(StoreError::NotFound(record_id))?;
        record.status = FeedbackStatus::Error;
        record.error_message = Some(message.to_string());
        record.updated_at = Utc::now();
        Ok(())
    }

    async fn find_by_interview(
        &self,
        interview_id: &str,
        user_id: &str,
    ) -> Result<Option<FeedbackRecord>, StoreError> {
        let records = self.records.read().await;
        Ok(Self::latest(records.values().filter(|r| {
            r.interview_id == interview_id && r.user_id == user_id
        })))
    }

    async fn find_latest_for_user(
        &self,
        user_id: &str,
    ) -> Result<Option<FeedbackRecord>, StoreError> {
        let records = self.records.read().await;
        Ok(Self::latest(records.values().filter(|r| r.user_id == user_id)))
    }

    async fn find_by_id(
        &self,
        record_id: Uuid,
        user_id: &str,
    ) -> Result<Option<FeedbackRecord>, StoreError> {
        let records = self.records.read().await;
        Ok(records
            .get(&record_id)
            .filter(|r| r.user_id == user_id)
            .cloned())
    }
}

/// In-memory store whose status writes can be made to fail.
#[cfg(test)]
#[derive(Default)]
pub(crate) struct FaultyStore {
    pub inner: InMemoryFeedbackStore,
    pub fail_complete: bool,
    pub fail_mark_error: bool,
}

#[cfg(test)]
#[async_trait]
impl FeedbackStore for FaultyStore {
    async fn create_pending(&self, new: NewFeedback) -> Result<Uuid, StoreError> {
        self.inner.create_pending(new).await
    }

    async fn complete_with_evaluation(
        &self,
        record_id: Uuid,
        evaluation: &Evaluation,
        source: EvaluationSource,
    ) -> Result<(), StoreError> {
        if self.fail_complete {
            return Err(StoreError::Corrupt("disk full".to_string()));
        }
        self.inner
            .complete_with_evaluation(record_id, evaluation, source)
            .await
    }

    async fn mark_error(&self, record_id: Uuid, message: &str) -> Result<(), StoreError> {
        if self.fail_mark_error {
            return Err(StoreError::Corrupt("disk full".to_string()));
        }
        self.inner.mark_error(record_id, message).await
    }

    async fn find_by_interview(
        &self,
        interview_id: &str,
        user_id: &str,
    ) -> Result<Option<FeedbackRecord>, StoreError> {
        self.inner.find_by_interview(interview_id, user_id).await
    }

    async fn find_latest_for_user(
        &self,
        user_id: &str,
    ) -> Result<Option<FeedbackRecord>, StoreError> {
        self.inner.find_latest_for_user(user_id).await
    }

    async fn find_by_id(
        &self,
        record_id: Uuid,
        user_id: &str,
    ) -> Result<Option<FeedbackRecord>, StoreError> {
        self.inner.find_by_id(record_id, user_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_feedback(record_id: Option<Uuid>, interview_id: &str, user_id: &str) -> NewFeedback {
        NewFeedback {
            record_id,
            interview_id: interview_id.to_string(),
            user_id: user_id.to_string(),
            job_role: "Software Engineer".to_string(),
            transcript: vec![
                TranscriptEntry::interviewer("Q1"),
                TranscriptEntry::candidate("A1"),
            ],
        }
    }

    #[tokio::test]
    async fn test_create_pending_starts_processing() {
        let store = InMemoryFeedbackStore::new();
        let id = store
            .create_pending(new_feedback(None, "int-1", "user-1"))
            .await
            .unwrap();

        let record = store.find_by_id(id, "user-1").await.unwrap().unwrap();
        assert_eq!(record.status, FeedbackStatus::Processing);
        assert_eq!(record.interview_id, "int-1");
        assert!(record.evaluation().is_none());
    }

    #[tokio::test]
    async fn test_create_pending_with_same_explicit_id_is_idempotent() {
        let store = InMemoryFeedbackStore::new();
        let id = Uuid::new_v4();

        let first = store
            .create_pending(new_feedback(Some(id), "int-1", "user-1"))
            .await
            .unwrap();
        let second = store
            .create_pending(new_feedback(Some(id), "int-1", "user-1"))
            .await
            .unwrap();

        assert_eq!(first, id);
        assert_eq!(second, id);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_create_pending_without_id_allocates_new_records() {
        let store = InMemoryFeedbackStore::new();
        let a = store
            .create_pending(new_feedback(None, "int-1", "user-1"))
            .await
            .unwrap();
        let b = store
            .create_pending(new_feedback(None, "int-1", "user-1"))
            .await
            .unwrap();
        assert_ne!(a, b);
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn test_explicit_id_of_another_user_conflicts() {
        let store = InMemoryFeedbackStore::new();
        let id = Uuid::new_v4();
        store
            .create_pending(new_feedback(Some(id), "int-1", "user-1"))
            .await
            .unwrap();

        let err = store
            .create_pending(new_feedback(Some(id), "int-1", "user-2"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(conflict) if conflict == id));
    }

    #[tokio::test]
    async fn test_mark_error_keeps_evaluation_fields() {
        let store = InMemoryFeedbackStore::new();
        let id = store
            .create_pending(new_feedback(None, "int-1", "user-1"))
            .await
            .unwrap();
        store
            .complete_with_evaluation(id, &Evaluation::neutral(), EvaluationSource::Model)
            .await
            .unwrap();
        store.mark_error(id, "re-evaluation failed").await.unwrap();

        let record = store.find_by_id(id, "user-1").await.unwrap().unwrap();
        assert_eq!(record.status, FeedbackStatus::Error);
        assert_eq!(record.error_message.as_deref(), Some("re-evaluation failed"));
        assert_eq!(record.evaluation(), Some(Evaluation::neutral()));
    }

    #[tokio::test]
    async fn test_complete_unknown_record_is_not_found() {
        let store = InMemoryFeedbackStore::new();
        let id = Uuid::new_v4();
        let err = store
            .complete_with_evaluation(id, &Evaluation::neutral(), EvaluationSource::Model)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_find_by_interview_is_scoped_to_user() {
        let store = InMemoryFeedbackStore::new();
        store
            .create_pending(new_feedback(None, "int-1", "user-1"))
            .await
            .unwrap();

        assert!(store
            .find_by_interview("int-1", "user-1")
            .await
            .unwrap()
            .is_some());
        assert!(store
            .find_by_interview("int-1", "user-2")
            .await
            .unwrap()
            .is_none());
        assert!(store
            .find_by_interview("int-2", "user-1")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_latest_for_user_ignores_interview() {
        let store = InMemoryFeedbackStore::new();
        store
            .create_pending(new_feedback(None, "int-1", "user-1"))
            .await
            .unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let newer = store
            .create_pending(new_feedback(None, "int-2", "user-1"))
            .await
            .unwrap();

        let latest = store.find_latest_for_user("user-1").await.unwrap().unwrap();
        assert_eq!(latest.id, newer);
        assert!(store.find_latest_for_user("user-9").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_find_by_id_hides_other_users_records() {
        let store = InMemoryFeedbackStore::new();
        let id = store
            .create_pending(new_feedback(None, "int-1", "user-1"))
            .await
            .unwrap();
        assert!(store.find_by_id(id, "user-2").await.unwrap().is_none());
    }
}
