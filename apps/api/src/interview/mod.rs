// Interview preparation: question lists for the voice agent to read.
// All LLM calls go through llm_client.

pub mod handlers;
pub mod prompts;
pub mod questions;
