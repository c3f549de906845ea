pub mod evaluator;
pub mod handlers;
pub mod pg_store;
pub mod pipeline;
pub mod prompts;
pub mod store;
pub mod transcript;
