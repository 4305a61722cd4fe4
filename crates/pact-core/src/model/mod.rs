//! Access to the remote text-generation model.
//!
//! ```text
//! pipelines
//!     |
//!     v
//! &dyn LanguageModel --invoke(prompt, temperature)--> ModelInvoker
//!                                                       |  retries, backoff, timeout
//!                                                       v
//!                                                 &dyn Transport (one attempt)
//!                                                       |
//!                                                       v
//!                                                 HttpTransport -> chat-completions API
//! ```

pub mod config;
pub mod invoker;
pub mod transport;

use async_trait::async_trait;

use crate::error::ModelError;

pub use config::ModelConfig;
pub use invoker::{Backoff, ModelInvoker, RetryState};
pub use transport::{ChatMessage, ChatRequest, HttpTransport, Transport};

/// Anything that turns a prompt into generated text.
///
/// Implementations return trimmed, non-empty text or a [`ModelError`].
/// The pipelines only depend on this trait, so tests substitute scripted
/// models for [`ModelInvoker`].
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn invoke(&self, prompt: &str, temperature: f32) -> Result<String, ModelError>;
}

const _: () = {
    fn _assert_object_safe(_: &dyn LanguageModel) {}
};
