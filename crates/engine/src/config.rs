//! Engine configuration from environment variables.

use std::str::FromStr;
use std::time::Duration;

use crate::infrastructure::openai::{
    DEFAULT_LLM_BASE_URL, DEFAULT_LLM_MODEL, DEFAULT_LLM_TIMEOUT_SECS,
};
use crate::infrastructure::resilient_llm::RetryConfig;
use crate::use_cases::narration::{GeneratorSettings, DEFAULT_MAX_TOKENS, DEFAULT_TEMPERATURE};

pub const DEFAULT_SERVER_HOST: &str = "0.0.0.0";
pub const DEFAULT_SERVER_PORT: u16 = 3000;
pub const DEFAULT_DATABASE_URL: &str = "sqlite:talebound.db?mode=rwc";

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub server_host: String,
    pub server_port: u16,
    pub database_url: String,
    pub llm_base_url: String,
    pub llm_model: String,
    pub llm_api_key: Option<String>,
    pub llm_timeout_secs: u64,
    pub llm_max_tokens: u32,
    pub llm_temperature: f32,
    pub llm_max_retries: u32,
    pub cors_allowed_origins: Option<String>,
}

impl EngineConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Unparseable values fall back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let vars = Vars(lookup);

        Self {
            server_host: vars.get("SERVER_HOST").unwrap_or_else(|| DEFAULT_SERVER_HOST.into()),
            server_port: vars
                .parsed("SERVER_PORT")
                .or_else(|| vars.parsed("PORT"))
                .unwrap_or(DEFAULT_SERVER_PORT),
            database_url: vars
                .get("DATABASE_URL")
                .unwrap_or_else(|| DEFAULT_DATABASE_URL.into()),
            llm_base_url: vars
                .get("LLM_BASE_URL")
                .unwrap_or_else(|| DEFAULT_LLM_BASE_URL.into()),
            llm_model: vars.get("LLM_MODEL").unwrap_or_else(|| DEFAULT_LLM_MODEL.into()),
            llm_api_key: vars.get("LLM_API_KEY"),
            llm_timeout_secs: vars
                .parsed("LLM_TIMEOUT_SECS")
                .unwrap_or(DEFAULT_LLM_TIMEOUT_SECS),
            llm_max_tokens: vars.parsed("LLM_MAX_TOKENS").unwrap_or(DEFAULT_MAX_TOKENS),
            llm_temperature: vars
                .parsed::<f32>("LLM_TEMPERATURE")
                .filter(|t| (0.0..=2.0).contains(t))
                .unwrap_or(DEFAULT_TEMPERATURE),
            llm_max_retries: vars
                .parsed("LLM_MAX_RETRIES")
                .unwrap_or(RetryConfig::default().max_retries),
            cors_allowed_origins: vars.get("CORS_ALLOWED_ORIGINS"),
        }
    }

    pub fn generator_settings(&self) -> GeneratorSettings {
        GeneratorSettings {
            max_tokens: self.llm_max_tokens,
            temperature: self.llm_temperature,
            timeout: Duration::from_secs(self.llm_timeout_secs),
        }
    }

    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig {
            max_retries: self.llm_max_retries,
            ..RetryConfig::default()
        }
    }
}

/// Trimmed lookups; blank values count as unset.
struct Vars<F>(F);

impl<F: Fn(&str) -> Option<String>> Vars<F> {
    fn get(&self, key: &str) -> Option<String> {
        (self.0)(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn parsed<T: FromStr>(&self, key: &str) -> Option<T> {
        self.get(key).and_then(|v| v.parse().ok())
    }
}
