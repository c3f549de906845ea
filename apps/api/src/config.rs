use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, Context, Result};

use crate::feedback::pipeline::FallbackPolicy;
use crate::retry::RetryPolicy;

const DEFAULT_LLM_API_URL: &str = "https://api.anthropic.com/v1/messages";
const DEFAULT_LLM_MODEL: &str = "claude-sonnet-4-5";

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing or malformed.
#[derive(Clone)]
pub struct Config {
    /// When unset, feedback records live in process memory only.
    pub database_url: Option<String>,
    pub anthropic_api_key: String,
    pub llm_api_url: String,
    pub llm_model: String,
    pub llm_timeout: Duration,
    pub jwt_secret: String,
    pub port: u16,
    pub rust_log: String,
    pub fallback_policy: FallbackPolicy,
    pub retry: RetryPolicy,
    pub max_qa_pairs: usize,
    pub default_job_role: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let backoff_factor: f64 = parse_env("FEEDBACK_BACKOFF_FACTOR", 1.5)?;
        if !backoff_factor.is_finite() || backoff_factor <= 1.0 {
            bail!("FEEDBACK_BACKOFF_FACTOR must be a finite number greater than 1");
        }

        let max_qa_pairs: usize = parse_env("FEEDBACK_MAX_QA_PAIRS", 6)?;
        if max_qa_pairs == 0 {
            bail!("FEEDBACK_MAX_QA_PAIRS must be at least 1");
        }

        Ok(Config {
            database_url: optional_env("DATABASE_URL"),
            anthropic_api_key: require_env("ANTHROPIC_API_KEY")?,
            llm_api_url: optional_env("LLM_API_URL")
                .unwrap_or_else(|| DEFAULT_LLM_API_URL.to_string()),
            llm_model: optional_env("LLM_MODEL").unwrap_or_else(|| DEFAULT_LLM_MODEL.to_string()),
            llm_timeout: Duration::from_secs(parse_env("LLM_TIMEOUT_SECS", 60)?),
            jwt_secret: require_env("JWT_SECRET")?,
            port: parse_env("PORT", 8080)?,
            rust_log: optional_env("RUST_LOG").unwrap_or_else(|| "info".to_string()),
            fallback_policy: parse_env("FEEDBACK_FALLBACK_POLICY", FallbackPolicy::Degrade)?,
            retry: RetryPolicy {
                retries: parse_env("FEEDBACK_RETRIES", 2)?,
                initial_delay: Duration::from_millis(parse_env("FEEDBACK_RETRY_DELAY_MS", 1000)?),
                backoff_factor,
            },
            max_qa_pairs,
            default_job_role: optional_env("DEFAULT_JOB_ROLE")
                .unwrap_or_else(|| "Software Engineer".to_string()),
        })
    }
}

const REDACTED: &str = "[redacted]";

/// Secrets and the database URL (which may embed a password) are redacted.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("database_url", &self.database_url.as_ref().map(|_| REDACTED))
            .field("anthropic_api_key", &REDACTED)
            .field("llm_api_url", &self.llm_api_url)
            .field("llm_model", &self.llm_model)
            .field("llm_timeout", &self.llm_timeout)
            .field("jwt_secret", &REDACTED)
            .field("port", &self.port)
            .field("rust_log", &self.rust_log)
            .field("fallback_policy", &self.fallback_policy)
            .field("retry", &self.retry)
            .field("max_qa_pairs", &self.max_qa_pairs)
            .field("default_job_role", &self.default_job_role)
            .finish()
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

/// Treats unset and blank values the same.
fn optional_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match optional_env(key) {
        None => Ok(default),
        Some(raw) => parse_value(key, &raw),
    }
}

fn parse_value<T>(key: &str, raw: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.parse::<T>()
        .map_err(|e| anyhow::anyhow!("{key} has invalid value '{raw}': {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_output_redacts_secrets() {
        let config = Config {
            database_url: Some("postgres://app:hunter2@db/feedback".to_string()),
            anthropic_api_key: "sk-ant-secret".to_string(),
            llm_api_url: DEFAULT_LLM_API_URL.to_string(),
            llm_model: DEFAULT_LLM_MODEL.to_string(),
            llm_timeout: Duration::from_secs(60),
            jwt_secret: "jwt-secret".to_string(),
            port: 8080,
            rust_log: "info".to_string(),
            fallback_policy: FallbackPolicy::Degrade,
            retry: RetryPolicy::default(),
            max_qa_pairs: 6,
            default_job_role: "Software Engineer".to_string(),
        };

        let out = format!("{config:?}");
        assert!(!out.contains("sk-ant-secret"), "{out}");
        assert!(!out.contains("jwt-secret"), "{out}");
        assert!(!out.contains("hunter2"), "{out}");
        assert!(out.contains("port: 8080"), "{out}");
    }

    #[test]
    fn test_parse_value_port() {
        let port: u16 = parse_value("PORT", "9000").unwrap();
        assert_eq!(port, 9000);
    }

    #[test]
    fn test_parse_value_reports_key_on_error() {
        let err = parse_value::<u16>("PORT", "not-a-port").unwrap_err();
        assert!(err.to_string().contains("PORT"), "{err}");
    }

    #[test]
    fn test_parse_value_fallback_policy() {
        let policy: FallbackPolicy = parse_value("FEEDBACK_FALLBACK_POLICY", "strict").unwrap();
        assert_eq!(policy, FallbackPolicy::Strict);
        assert!(parse_value::<FallbackPolicy>("FEEDBACK_FALLBACK_POLICY", "sometimes").is_err());
    }
}
