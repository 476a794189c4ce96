//! Service settings read from the environment at startup

use crate::decision::DEFAULT_KNOWN_ISSUE_THRESHOLD;
use crate::provider::ProviderConfig;
use crate::retry::RetryPolicy;
use anyhow::{Context, Result};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchStrategy {
    Lexical,
    Embedding,
}

impl FromStr for SearchStrategy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lexical" | "keyword" => Ok(Self::Lexical),
            "embedding" | "embeddings" => Ok(Self::Embedding),
            other => anyhow::bail!("unknown search strategy '{}' (expected lexical or embedding)", other),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub mock_llm: bool,
    pub api_key: Option<String>,
    pub base_url: String,
    pub chat_model: String,
    pub embedding_model: String,
    pub kb_path: PathBuf,
    pub embeddings_path: PathBuf,
    pub search_strategy: SearchStrategy,
    pub known_issue_threshold: f32,
    pub provider_timeout: Duration,
    pub retry_max_elapsed: Option<Duration>,
    pub request_timeout: Duration,
    pub rate_limit_requests: u32,
    pub rate_limit_window: Duration,
    pub port: u16,
}

fn parse_bool(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes")
}

fn parse_var<T>(name: &str, value: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse::<T>()
        .map_err(|e| anyhow::anyhow!("{}", e))
        .with_context(|| format!("Invalid value for {}: '{}'", name, value))
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build settings from any variable source (the process environment in production)
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let known_issue_threshold = match (get("KNOWN_ISSUE_THRESHOLD"), get("QUERY_MATCH_CONFIDENCE_THRESHOLD")) {
            (Some(v), legacy) => {
                if legacy.is_some() {
                    warn!("QUERY_MATCH_CONFIDENCE_THRESHOLD is ignored because KNOWN_ISSUE_THRESHOLD is set");
                }
                parse_var("KNOWN_ISSUE_THRESHOLD", &v)?
            }
            (None, Some(v)) => {
                warn!("QUERY_MATCH_CONFIDENCE_THRESHOLD is deprecated; use KNOWN_ISSUE_THRESHOLD");
                parse_var("QUERY_MATCH_CONFIDENCE_THRESHOLD", &v)?
            }
            (None, None) => DEFAULT_KNOWN_ISSUE_THRESHOLD,
        };

        let secs = |name: &str, default: u64| -> Result<Duration> {
            Ok(Duration::from_secs(match get(name) {
                Some(v) => parse_var(name, &v)?,
                None => default,
            }))
        };

        let retry_max_elapsed = match get("RETRY_MAX_ELAPSED_SECS") {
            Some(v) => Some(Duration::from_secs(parse_var("RETRY_MAX_ELAPSED_SECS", &v)?)),
            None => None,
        };

        Ok(Self {
            mock_llm: get("MOCK_LLM").map(|v| parse_bool(&v)).unwrap_or(true),
            api_key: get("OPENAI_API_KEY"),
            base_url: get("OPENAI_BASE_URL").unwrap_or_else(|| "https://api.openai.com/v1".to_string()),
            chat_model: get("CHAT_MODEL").unwrap_or_else(|| "gpt-4o-mini".to_string()),
            embedding_model: get("EMBEDDING_MODEL").unwrap_or_else(|| "text-embedding-3-small".to_string()),
            kb_path: get("KB_PATH").unwrap_or_else(|| "kb/kb.json".to_string()).into(),
            embeddings_path: get("KB_EMBEDDINGS_PATH")
                .unwrap_or_else(|| "kb/kb_index_embeddings.json".to_string())
                .into(),
            search_strategy: match get("SEARCH_STRATEGY") {
                Some(v) => v.parse()?,
                None => SearchStrategy::Lexical,
            },
            known_issue_threshold,
            provider_timeout: secs("PROVIDER_TIMEOUT_SECS", 30)?,
            retry_max_elapsed,
            request_timeout: secs("REQUEST_TIMEOUT_SECS", 60)?,
            rate_limit_requests: match get("RATE_LIMIT_REQUESTS") {
                Some(v) => parse_var("RATE_LIMIT_REQUESTS", &v)?,
                None => 10,
            },
            rate_limit_window: secs("RATE_LIMIT_WINDOW_SECONDS", 60)?,
            port: match get("PORT") {
                Some(v) => parse_var("PORT", &v)?,
                None => 8000,
            },
        })
    }

    /// Provider settings, if an API key is configured
    pub fn provider_config(&self) -> Option<ProviderConfig> {
        self.api_key.as_ref().map(|key| ProviderConfig {
            base_url: self.base_url.clone(),
            api_key: key.clone(),
            chat_model: self.chat_model.clone(),
            embedding_model: self.embedding_model.clone(),
            timeout: self.provider_timeout,
        })
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_elapsed: self.retry_max_elapsed,
            ..RetryPolicy::default()
        }
    }
}
