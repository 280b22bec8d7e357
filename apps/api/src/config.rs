use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::llm_client::{RetryPolicy, DEFAULT_MODEL};

/// Application configuration loaded from environment variables.
/// Fails at startup if the API key is missing or a numeric value does not parse.
#[derive(Debug, Clone)]
pub struct Config {
    pub google_api_key: String,
    pub gemini_model: String,
    pub llm_max_attempts: u32,
    pub llm_retry_backoff_secs: u64,
    pub tesseract_lang: String,
    /// Number of extracted documents memoized by content hash. 0 disables the cache.
    pub extraction_cache_capacity: usize,
    pub max_upload_bytes: usize,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            google_api_key: require_env("GOOGLE_API_KEY")?,
            gemini_model: std::env::var("GEMINI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string()),
            llm_max_attempts: parse_env("LLM_MAX_ATTEMPTS", 3)?,
            llm_retry_backoff_secs: parse_env("LLM_RETRY_BACKOFF_SECS", 2)?,
            tesseract_lang: std::env::var("TESSERACT_LANG").unwrap_or_else(|_| "eng".to_string()),
            extraction_cache_capacity: parse_env("EXTRACTION_CACHE_CAPACITY", 32)?,
            max_upload_bytes: parse_env("MAX_UPLOAD_BYTES", 10 * 1024 * 1024)?,
            port: parse_env("PORT", 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.llm_max_attempts,
            backoff: Duration::from_secs(self.llm_retry_backoff_secs),
        }
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} must be a valid number, got '{raw}'")),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Each test uses its own variable name so parallel tests never race on the environment.

    #[test]
    fn test_parse_env_uses_default_when_unset() {
        let value: u32 = parse_env("ATS_TEST_UNSET_VARIABLE", 7).unwrap();
        assert_eq!(value, 7);
    }

    #[test]
    fn test_parse_env_reads_value() {
        std::env::set_var("ATS_TEST_PARSE_VALUE", " 5 ");
        let value: u32 = parse_env("ATS_TEST_PARSE_VALUE", 3).unwrap();
        assert_eq!(value, 5);
    }

    #[test]
    fn test_parse_env_rejects_garbage() {
        std::env::set_var("ATS_TEST_PARSE_GARBAGE", "three");
        let result: Result<u32> = parse_env("ATS_TEST_PARSE_GARBAGE", 3);
        let message = format!("{:#}", result.unwrap_err());
        assert!(message.contains("ATS_TEST_PARSE_GARBAGE"), "got: {message}");
    }

    #[test]
    fn test_retry_policy_from_config() {
        let config = Config {
            google_api_key: "key".to_string(),
            gemini_model: DEFAULT_MODEL.to_string(),
            llm_max_attempts: 4,
            llm_retry_backoff_secs: 2,
            tesseract_lang: "eng".to_string(),
            extraction_cache_capacity: 0,
            max_upload_bytes: 1024,
            port: 8080,
            rust_log: "info".to_string(),
        };
        let policy = config.retry_policy();
        assert_eq!(policy.max_attempts, 4);
        assert_eq!(policy.backoff, Duration::from_secs(2));
    }
}
