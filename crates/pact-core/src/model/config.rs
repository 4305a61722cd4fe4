use std::fmt;
use std::time::Duration;

use crate::error::ModelError;

/// Key values that ship in sample configs and must never be sent upstream.
const PLACEHOLDER_KEYS: &[&str] = &["YOUR_API_KEY", "sk-xxx", "changeme"];

/// Connection settings for the remote text model.
///
/// Built once at startup and shared read-only (usually behind an `Arc`).
#[derive(Clone)]
pub struct ModelConfig {
    /// Full chat-completions endpoint URL.
    pub api_url: String,
    /// Bearer credential.
    pub api_key: String,
    /// Model identifier sent in every request.
    pub model_id: String,
    /// Budget for one invocation, retries included.
    pub timeout: Duration,
    /// Additional attempts after the first failure.
    pub max_retry: u32,
    /// Output token cap sent as `max_tokens`.
    pub max_tokens: u32,
}

impl ModelConfig {
    pub const DEFAULT_API_URL: &'static str = "https://api.openai.com/v1/chat/completions";
    pub const DEFAULT_MODEL_ID: &'static str = "gpt-4o-mini";
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);
    pub const DEFAULT_MAX_RETRY: u32 = 2;
    pub const DEFAULT_MAX_TOKENS: u32 = 3000;

    /// Build a config from explicit values, with default timing and limits.
    pub fn new(
        api_url: impl Into<String>,
        api_key: impl Into<String>,
        model_id: impl Into<String>,
    ) -> Self {
        Self {
            api_url: api_url.into(),
            api_key: api_key.into(),
            model_id: model_id.into(),
            timeout: Self::DEFAULT_TIMEOUT,
            max_retry: Self::DEFAULT_MAX_RETRY,
            max_tokens: Self::DEFAULT_MAX_TOKENS,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_retry(mut self, max_retry: u32) -> Self {
        self.max_retry = max_retry;
        self
    }

    /// Fail with [`ModelError::Configuration`] when the key is missing or a
    /// known placeholder, or the endpoint is blank.
    pub fn ensure_credentials(&self) -> Result<(), ModelError> {
        let key = self.api_key.trim();
        if key.is_empty() {
            return Err(ModelError::Configuration("API key is not set".into()));
        }
        if PLACEHOLDER_KEYS.contains(&key) || key.contains("自己填") {
            return Err(ModelError::Configuration(
                "API key is still a placeholder value".into(),
            ));
        }
        if self.api_url.trim().is_empty() {
            return Err(ModelError::Configuration("API URL is not set".into()));
        }
        Ok(())
    }
}

impl fmt::Debug for ModelConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelConfig")
            .field("api_url", &self.api_url)
            .field("api_key", &redact(&self.api_key))
            .field("model_id", &self.model_id)
            .field("timeout", &self.timeout)
            .field("max_retry", &self.max_retry)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

fn redact(key: &str) -> String {
    if key.is_empty() {
        return "<unset>".to_string();
    }
    let prefix: String = key.chars().take(4).collect();
    format!("{prefix}...")
}
