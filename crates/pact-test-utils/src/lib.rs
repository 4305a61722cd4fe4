//! Shared test doubles for pact integration tests.
//!
//! - [`ScriptedModel`]: a [`LanguageModel`] that replays canned responses in
//!   order and records every prompt it was given.
//! - [`ScriptedTransport`]: a [`Transport`] that replays canned single-attempt
//!   outcomes and records when each request arrived, for backoff timing.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::time::Instant;

use pact_core::error::{ModelError, TransportError};
use pact_core::model::{ChatRequest, LanguageModel, ModelConfig, Transport};

/// One recorded model call.
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub prompt: String,
    pub temperature: f32,
}

/// A scripted outcome for one [`ScriptedModel`] call.
#[derive(Debug)]
pub enum Reply {
    Text(String),
    Unavailable,
    NotConfigured,
}

impl Reply {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }
}

/// Replays [`Reply`] values in order. Once the script runs out, every
/// further call gets the fallback reply (unavailable unless configured).
#[derive(Debug, Default)]
pub struct ScriptedModel {
    replies: Mutex<VecDeque<Reply>>,
    calls: Mutex<Vec<Call>>,
    repeat_text: Option<String>,
}

impl ScriptedModel {
    pub fn new(replies: impl IntoIterator<Item = Reply>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().collect()),
            ..Self::default()
        }
    }

    /// A model whose every reply is `text`.
    pub fn always(text: impl Into<String>) -> Self {
        Self {
            repeat_text: Some(text.into()),
            ..Self::default()
        }
    }

    /// A model that is never reachable.
    pub fn unavailable() -> Self {
        Self::default()
    }

    pub fn into_shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().expect("calls lock poisoned").clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().expect("calls lock poisoned").len()
    }

    fn next_reply(&self) -> Reply {
        let scripted = self.replies.lock().expect("replies lock poisoned").pop_front();
        match (scripted, &self.repeat_text) {
            (Some(reply), _) => reply,
            (None, Some(text)) => Reply::Text(text.clone()),
            (None, None) => Reply::Unavailable,
        }
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn invoke(&self, prompt: &str, temperature: f32) -> Result<String, ModelError> {
        self.calls.lock().expect("calls lock poisoned").push(Call {
            prompt: prompt.to_string(),
            temperature,
        });
        match self.next_reply() {
            Reply::Text(text) => Ok(text.trim().to_string()),
            Reply::Unavailable => Err(ModelError::Unavailable {
                attempts: 3,
                last: TransportError::Status {
                    status: 503,
                    body: "scripted outage".into(),
                },
            }),
            Reply::NotConfigured => Err(ModelError::Configuration("scripted".into())),
        }
    }
}

/// Replays single-attempt transport outcomes and timestamps each request.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    outcomes: Mutex<VecDeque<Result<String, TransportError>>>,
    arrivals: Mutex<Vec<Instant>>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedTransport {
    pub fn new(outcomes: impl IntoIterator<Item = Result<String, TransportError>>) -> Self {
        Self {
            outcomes: Mutex::new(outcomes.into_iter().collect()),
            ..Self::default()
        }
    }

    /// A transport whose every request fails with a 503.
    pub fn failing() -> Self {
        Self::default()
    }

    pub fn arrivals(&self) -> Vec<Instant> {
        self.arrivals.lock().expect("arrivals lock poisoned").clone()
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().expect("requests lock poisoned").clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: &ChatRequest) -> Result<String, TransportError> {
        self.arrivals
            .lock()
            .expect("arrivals lock poisoned")
            .push(Instant::now());
        self.requests
            .lock()
            .expect("requests lock poisoned")
            .push(request.clone());
        self.outcomes
            .lock()
            .expect("outcomes lock poisoned")
            .pop_front()
            .unwrap_or(Err(TransportError::Status {
                status: 503,
                body: "scripted outage".into(),
            }))
    }
}

/// A config with a usable key pointing nowhere.
pub fn test_config() -> ModelConfig {
    ModelConfig::new("http://127.0.0.1:9/v1/chat/completions", "sk-test-key", "test-model")
}

/// A plan response in the envelope form the model is asked for.
pub fn plan_json(title: &str, subtasks: &[&str]) -> String {
    let subtasks = subtasks
        .iter()
        .map(|s| format!("\"{s}\""))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        r#"{{"plan": {{"title": "{title}", "tasks": [{{"description": "{title}入门", "subtasks": [{subtasks}]}}]}}}}"#
    )
}
