// Interview question prompt templates.

pub const QUESTIONS_PERSONA: &str = "\
You are an experienced hiring manager preparing a spoken mock interview.";

pub const QUESTIONS_PROMPT_TEMPLATE: &str = r#"Prepare questions for a job interview.

The job role is: {role}
The experience level is: {level}
The tech stack used in the job is: {techstack}
The focus between behavioural and technical questions should lean towards: {focus}
The number of questions required is: {amount}

The questions will be read aloud by a voice assistant, so do not use "/", "*"
or any other special characters that could break text-to-speech.

OUTPUT SCHEMA (return exactly this structure):
{
  "questions": ["Question 1", "Question 2", "Question 3"]
}

Return ONLY the JSON object — nothing else, no code fences."#;
