//! Evaluator — scores Q&A pairs with the generative model.
//!
//! `AppState` carries an `Arc<dyn Evaluator>` inside the pipeline, so tests
//! can swap in a scripted evaluator without touching the orchestration.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::feedback::prompts::{EVALUATION_PERSONA, EVALUATION_PROMPT_TEMPLATE, NO_ANSWER};
use crate::feedback::transcript::QaPair;
use crate::llm_client::prompts::{json_system, render_template};
use crate::llm_client::{LlmClient, LlmError};

pub const MIN_SCORE: u8 = 1;
pub const MAX_SCORE: u8 = 5;
/// Scale midpoint, used for every score of the neutral evaluation.
pub const NEUTRAL_SCORE: u8 = 3;

/// Structured evaluation of one interview. Every score is on the 1–5 scale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub communication: u8,
    pub technical_knowledge: u8,
    pub problem_solving: u8,
    pub confidence: u8,
    pub overall_score: u8,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub areas_for_improvement: Vec<String>,
    #[serde(default)]
    pub detailed_feedback: String,
}

impl Evaluation {
    /// The substitute result used when no model evaluation is available.
    pub fn neutral() -> Self {
        Self {
            communication: NEUTRAL_SCORE,
            technical_knowledge: NEUTRAL_SCORE,
            problem_solving: NEUTRAL_SCORE,
            confidence: NEUTRAL_SCORE,
            overall_score: NEUTRAL_SCORE,
            strengths: vec!["Completed the interview".to_string()],
            areas_for_improvement: vec![
                "Provide more detailed responses".to_string(),
                "Support answers with specific examples".to_string(),
            ],
            detailed_feedback: "The interview was completed. To improve, focus on giving \
                detailed, specific examples and talk through your thought process when \
                answering technical questions."
                .to_string(),
        }
    }

    fn scores(&self) -> [(&'static str, u8); 5] {
        [
            ("communication", self.communication),
            ("technical_knowledge", self.technical_knowledge),
            ("problem_solving", self.problem_solving),
            ("confidence", self.confidence),
            ("overall_score", self.overall_score),
        ]
    }

    /// Rejects any score outside the 1–5 scale.
    pub fn validate(&self) -> Result<(), EvaluatorError> {
        for (field, value) in self.scores() {
            if !(MIN_SCORE..=MAX_SCORE).contains(&value) {
                return Err(EvaluatorError::ScoreOutOfRange { field, value });
            }
        }
        Ok(())
    }
}

/// Where a stored evaluation came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvaluationSource {
    Model,
    /// The model failed after retries and the neutral evaluation was stored.
    Fallback,
    /// The transcript had no Q&A pairs; the model was not called.
    EmptyTranscript,
}

impl EvaluationSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            EvaluationSource::Model => "model",
            EvaluationSource::Fallback => "fallback",
            EvaluationSource::EmptyTranscript => "empty_transcript",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "model" => Some(EvaluationSource::Model),
            "fallback" => Some(EvaluationSource::Fallback),
            "empty_transcript" => Some(EvaluationSource::EmptyTranscript),
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum EvaluatorError {
    #[error("model call failed: {0}")]
    Llm(#[from] LlmError),

    #[error("score {field}={value} is outside the 1-5 scale")]
    ScoreOutOfRange { field: &'static str, value: u8 },
}

#[async_trait]
pub trait Evaluator: Send + Sync {
    async fn evaluate(&self, pairs: &[QaPair], job_role: &str)
        -> Result<Evaluation, EvaluatorError>;
}

/// Evaluator backed by the LLM client.
pub struct LlmEvaluator {
    llm: LlmClient,
    max_pairs: usize,
}

impl LlmEvaluator {
    pub fn new(llm: LlmClient, max_pairs: usize) -> Self {
        Self { llm, max_pairs }
    }
}

#[async_trait]
impl Evaluator for LlmEvaluator {
    async fn evaluate(
        &self,
        pairs: &[QaPair],
        job_role: &str,
    ) -> Result<Evaluation, EvaluatorError> {
        let prompt = build_evaluation_prompt(pairs, job_role, self.max_pairs);
        let evaluation: Evaluation = self
            .llm
            .call_json(&prompt, &json_system(EVALUATION_PERSONA))
            .await?;
        evaluation.validate()?;
        Ok(evaluation)
    }
}

/// Fills the rubric template with at most `max_pairs` leading pairs.
pub fn build_evaluation_prompt(pairs: &[QaPair], job_role: &str, max_pairs: usize) -> String {
    let qa_block = pairs
        .iter()
        .take(max_pairs)
        .enumerate()
        .map(|(i, pair)| {
            let answer = if pair.answer.trim().is_empty() {
                NO_ANSWER
            } else {
                pair.answer.as_str()
            };
            format!("Q{}: {}\nA: {}", i + 1, pair.question, answer)
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    render_template(
        EVALUATION_PROMPT_TEMPLATE,
        &[("job_role", job_role), ("qa_block", qa_block.as_str())],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::parse_json_text;

    fn pair(q: &str, a: &str) -> QaPair {
        QaPair {
            question: q.to_string(),
            answer: a.to_string(),
        }
    }

    #[test]
    fn test_prompt_caps_pairs() {
        let pairs: Vec<QaPair> = (1..=8)
            .map(|i| pair(&format!("question {i}"), &format!("answer {i}")))
            .collect();
        let prompt = build_evaluation_prompt(&pairs, "Data Analyst", 6);
        assert!(prompt.contains("Q6: question 6"));
        assert!(!prompt.contains("question 7"));
        assert!(prompt.contains("role of Data Analyst"));
    }

    #[test]
    fn test_prompt_marks_empty_answers() {
        let prompt = build_evaluation_prompt(&[pair("What is a pivot table?", " ")], "Analyst", 6);
        assert!(prompt.contains("Q1: What is a pivot table?\nA: No answer provided"));
    }

    #[test]
    fn test_role_text_is_not_expanded_as_placeholder() {
        let pairs = vec![pair("Explain VLOOKUP", "It searches a column")];
        let prompt = build_evaluation_prompt(&pairs, "Dev {qa_block}", 6);
        assert_eq!(prompt.matches("Explain VLOOKUP").count(), 1);
        assert!(prompt.contains("role of Dev {qa_block}"));
    }

    #[test]
    fn test_answer_text_is_not_expanded_as_placeholder() {
        let pairs = vec![pair("Q", "my title is {job_role}")];
        let prompt = build_evaluation_prompt(&pairs, "Analyst", 6);
        assert!(prompt.contains("A: my title is {job_role}"));
    }

    #[test]
    fn test_prompt_is_deterministic() {
        let pairs = vec![pair("Q", "A")];
        assert_eq!(
            build_evaluation_prompt(&pairs, "SRE", 6),
            build_evaluation_prompt(&pairs, "SRE", 6)
        );
    }

    #[test]
    fn test_fenced_model_output_parses() {
        let raw = "```json\n{\n  \"communication\": 4,\n  \"technical_knowledge\": 3,\n  \
                   \"problem_solving\": 4,\n  \"confidence\": 5,\n  \"overall_score\": 4,\n  \
                   \"strengths\": [\"Clear structure\"],\n  \"areas_for_improvement\": [\"Depth\"],\n  \
                   \"detailed_feedback\": \"Solid.\"\n}\n```";
        let evaluation: Evaluation = parse_json_text(raw).unwrap();
        assert!(evaluation.validate().is_ok());
        assert_eq!(evaluation.confidence, 5);
        assert_eq!(evaluation.strengths, vec!["Clear structure".to_string()]);
    }

    #[test]
    fn test_percentage_scale_is_rejected() {
        let evaluation = Evaluation {
            overall_score: 85,
            ..Evaluation::neutral()
        };
        let err = evaluation.validate().unwrap_err();
        assert!(matches!(
            err,
            EvaluatorError::ScoreOutOfRange {
                field: "overall_score",
                value: 85
            }
        ));
    }

    #[test]
    fn test_zero_score_is_rejected() {
        let evaluation = Evaluation {
            communication: 0,
            ..Evaluation::neutral()
        };
        assert!(evaluation.validate().is_err());
    }

    #[test]
    fn test_neutral_uses_midpoint() {
        let neutral = Evaluation::neutral();
        assert!(neutral.validate().is_ok());
        assert!(neutral.scores().iter().all(|(_, v)| *v == NEUTRAL_SCORE));
        assert!(!neutral.strengths.is_empty());
        assert!(!neutral.areas_for_improvement.is_empty());
    }

    #[test]
    fn test_source_round_trips_through_str() {
        for source in [
            EvaluationSource::Model,
            EvaluationSource::Fallback,
            EvaluationSource::EmptyTranscript,
        ] {
            assert_eq!(EvaluationSource::parse(source.as_str()), Some(source));
        }
        assert_eq!(EvaluationSource::parse("gemini"), None);
    }
}
