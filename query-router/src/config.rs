use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::RouterError;
use crate::retry::RetryPolicy;

/// OpenAI-compatible chat completion endpoint used for classification and answers
#[derive(Clone, Debug)]
pub struct LlmSettings {
    pub endpoint: String,
    pub api_key: Option<String>,
    pub model: String,
    pub max_tokens: u32,
}

/// Search-index service holding per-project document and image indexes
#[derive(Clone, Debug)]
pub struct SearchSettings {
    pub endpoint: String,
    pub api_key: Option<String>,
    pub top_k: usize,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub port: u16,
    pub database_url: String,
    pub tenant_data_dir: PathBuf,
    pub retry: RetryPolicy,
    pub dispatch_max_workers: usize,
    pub llm: LlmSettings,
    pub search: SearchSettings,
}

impl Config {
    pub fn from_env() -> Result<Self, RouterError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the config from any key lookup (the process env in production)
    pub fn from_lookup<F>(lookup: F) -> Result<Self, RouterError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let multiplier: f64 = parse_or(&lookup, "RETRY_MULTIPLIER", 1.0)?;
        let min_secs: f64 = parse_or(&lookup, "RETRY_MIN", 1.0)?;
        let max_secs: f64 = parse_or(&lookup, "RETRY_MAX", 10.0)?;

        let valid = |v: f64| v.is_finite() && v >= 0.0;
        if !valid(multiplier) || !valid(min_secs) || !valid(max_secs) || min_secs > max_secs {
            return Err(RouterError::Config(
                "RETRY_MULTIPLIER, RETRY_MIN and RETRY_MAX must be >= 0 with RETRY_MIN <= RETRY_MAX"
                    .to_string(),
            ));
        }

        let retry = RetryPolicy {
            multiplier,
            min_delay: Duration::from_secs_f64(min_secs),
            max_delay: Duration::from_secs_f64(max_secs),
            max_attempts: parse_or(&lookup, "RETRY_ATTEMPTS", 3)?,
        };
        if retry.max_attempts == 0 {
            return Err(RouterError::Config("RETRY_ATTEMPTS must be at least 1".to_string()));
        }

        let dispatch_max_workers: usize = parse_or(&lookup, "DISPATCH_MAX_WORKERS", 8)?;
        if dispatch_max_workers == 0 {
            return Err(RouterError::Config("DISPATCH_MAX_WORKERS must be at least 1".to_string()));
        }

        Ok(Self {
            port: parse_or(&lookup, "PORT", 8080)?,
            database_url: lookup("DATABASE_URL").unwrap_or_else(|| "./.db/router.db".to_string()),
            tenant_data_dir: PathBuf::from(
                lookup("TENANT_DATA_DIR").unwrap_or_else(|| "./.db/tenants".to_string()),
            ),
            retry,
            dispatch_max_workers,
            llm: LlmSettings {
                endpoint: lookup("LLM_ENDPOINT")
                    .unwrap_or_else(|| "https://api.openai.com/v1/chat/completions".to_string()),
                api_key: non_empty(lookup("LLM_API_KEY")),
                model: lookup("LLM_MODEL").unwrap_or_else(|| "gpt-4o".to_string()),
                max_tokens: parse_or(&lookup, "LLM_MAX_TOKENS", 4096)?,
            },
            search: SearchSettings {
                endpoint: lookup("SEARCH_ENDPOINT")
                    .unwrap_or_else(|| "http://localhost:7700".to_string()),
                api_key: non_empty(lookup("SEARCH_API_KEY")),
                top_k: parse_or(&lookup, "SEARCH_TOP_K", 5)?,
            },
        })
    }
}

fn parse_or<T, F>(lookup: &F, key: &str, default: T) -> Result<T, RouterError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|e| RouterError::Config(format!("{} must be a valid number: {}", key, e))),
        _ => Ok(default),
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
