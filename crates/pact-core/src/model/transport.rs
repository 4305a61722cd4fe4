//! Single-attempt transport to a chat-completions endpoint.
//!
//! A [`Transport`] performs exactly one request and classifies its failure.
//! Retrying, backoff and timeouts belong to [`super::ModelInvoker`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::config::ModelConfig;
use crate::error::{ModelError, TransportError};

/// Longest error body kept from a non-success response.
const ERROR_BODY_LIMIT: usize = 512;

/// Request body sent to the model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_tokens: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatRequest {
    /// A single-turn user request.
    pub fn user(config: &ModelConfig, prompt: &str, temperature: f32) -> Self {
        Self {
            model: config.model_id.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            temperature,
            max_tokens: config.max_tokens,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// One request/response exchange with the remote generator.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send the request once and return the raw generated text.
    async fn send(&self, request: &ChatRequest) -> Result<String, TransportError>;
}

const _: () = {
    fn _assert_object_safe(_: &dyn Transport) {}
};

/// HTTP transport backed by a pooled `reqwest::Client`.
///
/// The client is cheap to share and hands each in-flight request its own
/// connection, so one `HttpTransport` serves all concurrent callers.
#[derive(Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
}

impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransport")
            .field("api_url", &self.api_url)
            .finish()
    }
}

impl HttpTransport {
    pub fn new(config: &ModelConfig) -> Result<Self, ModelError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ModelError::Configuration(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            api_url: config.api_url.clone(),
            api_key: config.api_key.clone(),
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: &ChatRequest) -> Result<String, TransportError> {
        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::Status {
                status: status.as_u16(),
                body: truncate(&body, ERROR_BODY_LIMIT),
            });
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| TransportError::MalformedEnvelope(e.to_string()))?;
        content_of(body)
    }
}

/// Pull `choices[0].message.content` out of a decoded response.
fn content_of(body: ChatResponse) -> Result<String, TransportError> {
    let content = body
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| TransportError::MalformedEnvelope("response has no choices".into()))?
        .message
        .content
        .ok_or_else(|| TransportError::MalformedEnvelope("choice has no content".into()))?;
    if content.trim().is_empty() {
        return Err(TransportError::EmptyContent);
    }
    Ok(content)
}

fn truncate(s: &str, max_bytes: usize) -> String {
    if s.len() <= max_bytes {
        return s.to_string();
    }
    let mut end = max_bytes;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &s[..end])
}
