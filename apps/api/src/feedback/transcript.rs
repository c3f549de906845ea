//! Transcript segmentation — turns a flat list of speaker turns into
//! question/answer pairs.

use serde::{Deserialize, Serialize};

/// Who spoke a transcript turn.
///
/// The voice SDK tags turns `assistant` / `user`; both spellings are accepted.
/// Any other role (e.g. `system`) deserializes to `Other` and is ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    #[serde(alias = "assistant")]
    Interviewer,
    #[serde(alias = "user")]
    Candidate,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub role: Role,
    #[serde(alias = "content", default)]
    pub text: String,
}

#[cfg(test)]
impl TranscriptEntry {
    pub fn interviewer(text: impl Into<String>) -> Self {
        Self {
            role: Role::Interviewer,
            text: text.into(),
        }
    }

    pub fn candidate(text: impl Into<String>) -> Self {
        Self {
            role: Role::Candidate,
            text: text.into(),
        }
    }
}

/// One interviewer question and the candidate's immediate reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QaPair {
    pub question: String,
    pub answer: String,
}

/// Pairs each candidate turn with the latest unanswered interviewer turn.
///
/// - a new question replaces an unanswered one
/// - a candidate turn with no pending question is dropped
/// - blank interviewer turns are skipped
pub fn segment(entries: &[TranscriptEntry]) -> Vec<QaPair> {
    let mut pairs = Vec::new();
    let mut pending: Option<&str> = None;

    for entry in entries {
        match entry.role {
            Role::Interviewer => {
                if !entry.text.trim().is_empty() {
                    pending = Some(entry.text.as_str());
                }
            }
            Role::Candidate => {
                if let Some(question) = pending.take() {
                    pairs.push(QaPair {
                        question: question.to_string(),
                        answer: entry.text.clone(),
                    });
                }
            }
            Role::Other => {}
        }
    }

    pairs
}
