// Feedback evaluation prompt templates.
// All prompts for the feedback module are defined here.

pub const EVALUATION_PERSONA: &str = "\
You are an experienced technical interviewer scoring a mock interview. \
Be constructive but honest; do not inflate scores for vague or missing answers.";

pub const EVALUATION_PROMPT_TEMPLATE: &str = r#"Evaluate this mock interview for the role of {job_role} on a 1-5 scale.

{qa_block}

Score each dimension as an integer from 1 (poor) to 5 (excellent):
- communication: clarity, articulation, structured responses
- technical_knowledge: understanding of key concepts for the role
- problem_solving: ability to analyze problems and propose solutions
- confidence: confidence and engagement in responses
- overall_score: overall performance

OUTPUT SCHEMA (return exactly this structure):
{
  "communication": 3,
  "technical_knowledge": 3,
  "problem_solving": 3,
  "confidence": 3,
  "overall_score": 3,
  "strengths": ["specific strength 1", "strength 2"],
  "areas_for_improvement": ["area 1", "area 2"],
  "detailed_feedback": "Detailed feedback here..."
}

Return ONLY the JSON object — nothing else, no code fences."#;

/// Placeholder shown to the model when a candidate turn was empty.
pub const NO_ANSWER: &str = "No answer provided";
