use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

use crate::feedback::evaluator::{Evaluation, EvaluationSource};
use crate::feedback::transcript::TranscriptEntry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackStatus {
    Processing,
    Completed,
    Error,
}

impl FeedbackStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedbackStatus::Processing => "processing",
            FeedbackStatus::Completed => "completed",
            FeedbackStatus::Error => "error",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "processing" => Some(FeedbackStatus::Processing),
            "completed" => Some(FeedbackStatus::Completed),
            "error" => Some(FeedbackStatus::Error),
            _ => None,
        }
    }
}

/// Raw row of the `feedbacks` table.
#[derive(Debug, Clone, FromRow)]
pub struct FeedbackRow {
    pub id: Uuid,
    pub interview_id: String,
    pub user_id: String,
    pub job_role: String,
    pub status: String,
    pub error_message: Option<String>,
    pub transcript: Value,
    pub communication: Option<i16>,
    pub technical_knowledge: Option<i16>,
    pub problem_solving: Option<i16>,
    pub confidence: Option<i16>,
    pub overall_score: Option<i16>,
    pub strengths: Vec<String>,
    pub areas_for_improvement: Vec<String>,
    pub detailed_feedback: Option<String>,
    pub source: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub evaluated_at: Option<DateTime<Utc>>,
}

/// A persisted feedback record as returned to API callers.
///
/// Score fields stay `None` until the record is completed. An errored record
/// keeps whatever evaluation fields were written before the failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackRecord {
    pub id: Uuid,
    pub interview_id: String,
    pub user_id: String,
    pub job_role: String,
    pub status: FeedbackStatus,
    pub error_message: Option<String>,
    pub transcript: Vec<TranscriptEntry>,
    pub communication: Option<u8>,
    pub technical_knowledge: Option<u8>,
    pub problem_solving: Option<u8>,
    pub confidence: Option<u8>,
    pub overall_score: Option<u8>,
    pub strengths: Vec<String>,
    pub areas_for_improvement: Vec<String>,
    pub detailed_feedback: Option<String>,
    pub source: Option<EvaluationSource>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub evaluated_at: Option<DateTime<Utc>>,
}

impl FeedbackRecord {
    /// Overwrites the evaluation fields and marks the record completed.
    pub fn apply_evaluation(
        &mut self,
        evaluation: &Evaluation,
        source: EvaluationSource,
        now: DateTime<Utc>,
    ) {
        self.communication = Some(evaluation.communication);
        self.technical_knowledge = Some(evaluation.technical_knowledge);
        self.problem_solving = Some(evaluation.problem_solving);
        self.confidence = Some(evaluation.confidence);
        self.overall_score = Some(evaluation.overall_score);
        self.strengths = evaluation.strengths.clone();
        self.areas_for_improvement = evaluation.areas_for_improvement.clone();
        self.detailed_feedback = Some(evaluation.detailed_feedback.clone());
        self.source = Some(source);
        self.status = FeedbackStatus::Completed;
        self.evaluated_at = Some(now);
        self.updated_at = now;
    }

    /// The stored evaluation, if every score has been written.
    #[cfg(test)]
    pub fn evaluation(&self) -> Option<Evaluation> {
        Some(Evaluation {
            communication: self.communication?,
            technical_knowledge: self.technical_knowledge?,
            problem_solving: self.problem_solving?,
            confidence: self.confidence?,
            overall_score: self.overall_score?,
            strengths: self.strengths.clone(),
            areas_for_improvement: self.areas_for_improvement.clone(),
            detailed_feedback: self.detailed_feedback.clone().unwrap_or_default(),
        })
    }
}

impl TryFrom<FeedbackRow> for FeedbackRecord {
    type Error = String;

    fn try_from(row: FeedbackRow) -> Result<Self, Self::Error> {
        let status = FeedbackStatus::parse(&row.status)
            .ok_or_else(|| format!("record {} has unknown status '{}'", row.id, row.status))?;
        let source = match row.source.as_deref() {
            None => None,
            Some(s) => Some(
                EvaluationSource::parse(s)
                    .ok_or_else(|| format!("record {} has unknown source '{s}'", row.id))?,
            ),
        };
        let transcript: Vec<TranscriptEntry> = serde_json::from_value(row.transcript)
            .map_err(|e| format!("record {} has unreadable transcript: {e}", row.id))?;

        Ok(FeedbackRecord {
            id: row.id,
            interview_id: row.interview_id,
            user_id: row.user_id,
            job_role: row.job_role,
            status,
            error_message: row.error_message,
            transcript,
            communication: score_from_db(row.communication),
            technical_knowledge: score_from_db(row.technical_knowledge),
            problem_solving: score_from_db(row.problem_solving),
            confidence: score_from_db(row.confidence),
            overall_score: score_from_db(row.overall_score),
            strengths: row.strengths,
            areas_for_improvement: row.areas_for_improvement,
            detailed_feedback: row.detailed_feedback,
            source,
            created_at: row.created_at,
            updated_at: row.updated_at,
            evaluated_at: row.evaluated_at,
        })
    }
}

fn score_from_db(value: Option<i16>) -> Option<u8> {
    value.and_then(|v| u8::try_from(v).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row() -> FeedbackRow {
        let now = Utc::now();
        FeedbackRow {
            id: Uuid::new_v4(),
            interview_id: "interview-1".to_string(),
            user_id: "user-1".to_string(),
            job_role: "Software Engineer".to_string(),
            status: "processing".to_string(),
            error_message: None,
            transcript: serde_json::json!([{"role": "interviewer", "text": "Q1"}]),
            communication: None,
            technical_knowledge: None,
            problem_solving: None,
            confidence: None,
            overall_score: None,
            strengths: vec![],
            areas_for_improvement: vec![],
            detailed_feedback: None,
            source: None,
            created_at: now,
            updated_at: now,
            evaluated_at: None,
        }
    }

    #[test]
    fn test_processing_row_converts_without_evaluation() {
        let record = FeedbackRecord::try_from(row()).unwrap();
        assert_eq!(record.status, FeedbackStatus::Processing);
        assert_eq!(record.transcript.len(), 1);
        assert!(record.evaluation().is_none());
    }

    #[test]
    fn test_unknown_status_is_rejected() {
        let mut bad = row();
        bad.status = "pending".to_string();
        assert!(FeedbackRecord::try_from(bad).is_err());
    }

    #[test]
    fn test_apply_evaluation_completes_record() {
        let mut record = FeedbackRecord::try_from(row()).unwrap();
        let evaluation = Evaluation::neutral();
        record.apply_evaluation(&evaluation, EvaluationSource::Fallback, Utc::now());

        assert_eq!(record.status, FeedbackStatus::Completed);
        assert_eq!(record.source, Some(EvaluationSource::Fallback));
        assert!(record.evaluated_at.is_some());
        assert_eq!(record.evaluation(), Some(evaluation));
    }

    #[test]
    fn test_status_serializes_snake_case() {
        assert_eq!(
            serde_json::to_value(FeedbackStatus::Completed).unwrap(),
            serde_json::json!("completed")
        );
        assert_eq!(FeedbackStatus::parse("error"), Some(FeedbackStatus::Error));
    }

    #[test]
    fn test_status_column_text_matches_wire_name() {
        for status in [
            FeedbackStatus::Processing,
            FeedbackStatus::Completed,
            FeedbackStatus::Error,
        ] {
            assert_eq!(FeedbackStatus::parse(status.as_str()), Some(status));
            assert_eq!(
                serde_json::to_value(status).unwrap(),
                serde_json::json!(status.as_str())
            );
        }
    }
}
