//! Backend settings.

use std::time::Duration;

use semkon_core::{OracleError, OracleResult};
use serde::{Deserialize, Serialize};

pub const DEFAULT_ENDPOINT: &str = "https://api.anthropic.com/v1/messages";
pub const DEFAULT_EXTRACT_MODEL: &str = "claude-haiku-4-5";
pub const DEFAULT_CHECK_MODEL: &str = "claude-opus-4-5";
pub const ANTHROPIC_VERSION: &str = "2023-06-01";
pub const AUTH_ENV_VAR: &str = "ANTHROPIC_API_KEY";

/// Beta flag required by the server-side fetch tool.
pub const WEB_FETCH_BETA: &str = "web-fetch-2025-09-10";

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnthropicConfig {
    /// Messages endpoint URL.
    pub endpoint: String,
    /// Model used for proposition extraction.
    pub extract_model: String,
    /// Model used for the checking agent.
    pub check_model: String,
    pub max_tokens: u32,
    /// Request/response rounds allowed per check before giving up.
    pub check_max_turns: u32,
    pub request_timeout_secs: u64,
    /// Retries after the first attempt for transient failures.
    pub max_retries: u32,
    /// Base backoff; doubled on every retry.
    pub retry_backoff_ms: u64,
    /// Offer server-side web search and fetch to the checking agent.
    pub web_tools: bool,
    /// Overrides the environment key when set.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
}

impl Default for AnthropicConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            extract_model: DEFAULT_EXTRACT_MODEL.to_string(),
            check_model: DEFAULT_CHECK_MODEL.to_string(),
            max_tokens: 16_000,
            check_max_turns: 40,
            request_timeout_secs: 600,
            max_retries: 3,
            retry_backoff_ms: 1_000,
            web_tools: true,
            api_key: None,
        }
    }
}

impl std::fmt::Debug for AnthropicConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnthropicConfig")
            .field("endpoint", &self.endpoint)
            .field("extract_model", &self.extract_model)
            .field("check_model", &self.check_model)
            .field("max_tokens", &self.max_tokens)
            .field("check_max_turns", &self.check_max_turns)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("max_retries", &self.max_retries)
            .field("retry_backoff_ms", &self.retry_backoff_ms)
            .field("web_tools", &self.web_tools)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl AnthropicConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    /// API key from the config, falling back to [`AUTH_ENV_VAR`].
    pub fn auth_token(&self) -> OracleResult<String> {
        if let Some(key) = self.api_key.as_deref().filter(|k| !k.trim().is_empty()) {
            return Ok(key.to_string());
        }
        std::env::var(AUTH_ENV_VAR)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| OracleError::invalid_config(format!("missing {AUTH_ENV_VAR}")))
    }

    pub fn validate(&self) -> OracleResult<()> {
        if self.endpoint.trim().is_empty() {
            return Err(OracleError::invalid_config("endpoint must not be empty"));
        }
        if self.extract_model.trim().is_empty() || self.check_model.trim().is_empty() {
            return Err(OracleError::invalid_config("model names must not be empty"));
        }
        if self.max_tokens == 0 {
            return Err(OracleError::invalid_config("max_tokens must be positive"));
        }
        if self.check_max_turns == 0 {
            return Err(OracleError::invalid_config("check_max_turns must be positive"));
        }
        Ok(())
    }
}
