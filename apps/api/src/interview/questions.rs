//! Question generation — asks the model for a list of interview questions
//! that a voice assistant can read aloud.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::errors::AppError;
use crate::interview::prompts::{QUESTIONS_PERSONA, QUESTIONS_PROMPT_TEMPLATE};
use crate::llm_client::prompts::{json_system, render_template};
use crate::llm_client::{LlmClient, LlmError};
use crate::retry::{with_retry_when, RetryPolicy};

pub const MAX_QUESTIONS: u8 = 20;

#[derive(Debug, Clone, Deserialize)]
pub struct QuestionRequest {
    pub role: String,
    pub level: String,
    #[serde(default)]
    pub techstack: Vec<String>,
    /// Behavioural vs technical emphasis, free text (e.g. "technical", "mixed").
    pub focus: String,
    pub amount: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionList {
    pub questions: Vec<String>,
}

impl QuestionRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.role.trim().is_empty() {
            return Err(AppError::Validation("role cannot be empty".to_string()));
        }
        if self.level.trim().is_empty() {
            return Err(AppError::Validation("level cannot be empty".to_string()));
        }
        if self.amount == 0 || self.amount > MAX_QUESTIONS {
            return Err(AppError::Validation(format!(
                "amount must be between 1 and {MAX_QUESTIONS}"
            )));
        }
        Ok(())
    }
}

pub async fn generate_questions(
    llm: &LlmClient,
    retry: &RetryPolicy,
    request: &QuestionRequest,
) -> Result<QuestionList, AppError> {
    request.validate()?;

    let prompt = build_questions_prompt(request);
    let system = json_system(QUESTIONS_PERSONA);

    let list: QuestionList = with_retry_when(
        "generate_questions",
        retry,
        || llm.call_json::<QuestionList>(&prompt, &system),
        LlmError::is_transient,
    )
    .await
    .map_err(|e| AppError::Llm(format!("Question generation failed: {e}")))?;

    let questions = clean_questions(list.questions, request.amount as usize);
    if questions.is_empty() {
        return Err(AppError::Llm(
            "Question generation returned no usable questions".to_string(),
        ));
    }

    info!(
        role = %request.role,
        requested = request.amount,
        generated = questions.len(),
        "Generated interview questions"
    );
    Ok(QuestionList { questions })
}

fn build_questions_prompt(request: &QuestionRequest) -> String {
    let techstack = if request.techstack.is_empty() {
        "not specified".to_string()
    } else {
        request.techstack.join(", ")
    };
    let focus = if request.focus.trim().is_empty() {
        "balanced"
    } else {
        request.focus.trim()
    };

    let amount = request.amount.to_string();

    render_template(
        QUESTIONS_PROMPT_TEMPLATE,
        &[
            ("role", request.role.trim()),
            ("level", request.level.trim()),
            ("techstack", techstack.as_str()),
            ("focus", focus),
            ("amount", amount.as_str()),
        ],
    )
}

/// Makes questions safe for text-to-speech, drops blanks and truncates.
fn clean_questions(raw: Vec<String>, amount: usize) -> Vec<String> {
    raw.into_iter()
        .map(|q| sanitize_for_voice(&q))
        .filter(|q| !q.is_empty())
        .take(amount)
        .collect()
}

fn sanitize_for_voice(text: &str) -> String {
    text.replace('*', "")
        .replace('/', " or ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(amount: u8) -> QuestionRequest {
        QuestionRequest {
            role: "Financial Analyst".to_string(),
            level: "junior".to_string(),
            techstack: vec!["Excel".to_string(), "Power Query".to_string()],
            focus: "technical".to_string(),
            amount,
        }
    }

    #[test]
    fn test_sanitize_removes_markup_and_slashes() {
        assert_eq!(
            sanitize_for_voice("  **When** would you use VLOOKUP/XLOOKUP?  "),
            "When would you use VLOOKUP or XLOOKUP?"
        );
    }

    #[test]
    fn test_clean_questions_drops_blanks_and_truncates() {
        let raw = vec![
            "Q1?".to_string(),
            "**".to_string(),
            "Q2?".to_string(),
            "Q3?".to_string(),
        ];
        assert_eq!(clean_questions(raw, 2), vec!["Q1?", "Q2?"]);
    }

    #[test]
    fn test_validate_amount_bounds() {
        assert!(request(0).validate().is_err());
        assert!(request(MAX_QUESTIONS + 1).validate().is_err());
        assert!(request(5).validate().is_ok());
    }

    #[test]
    fn test_validate_requires_role() {
        let mut req = request(5);
        req.role = " ".to_string();
        assert!(matches!(req.validate(), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_prompt_includes_request_fields() {
        let prompt = build_questions_prompt(&request(7));
        assert!(prompt.contains("The job role is: Financial Analyst"));
        assert!(prompt.contains("Excel, Power Query"));
        assert!(prompt.contains("required is: 7"));
    }

    #[test]
    fn test_prompt_defaults_for_missing_stack_and_focus() {
        let mut req = request(3);
        req.techstack.clear();
        req.focus = String::new();
        let prompt = build_questions_prompt(&req);
        assert!(prompt.contains("tech stack used in the job is: not specified"));
        assert!(prompt.contains("lean towards: balanced"));
    }

    #[test]
    fn test_question_list_deserializes() {
        let list: QuestionList =
            serde_json::from_str(r#"{"questions": ["What is a pivot table?"]}"#).unwrap();
        assert_eq!(list.questions.len(), 1);
    }
}
