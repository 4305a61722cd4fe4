//! Bounded-retry model invocation.
//!
//! Each call runs a small state machine:
//!
//! ```text
//! Pending -> Attempting(0) -> Succeeded
//!                  |
//!                  +-> RetryWait(0, d0) -> Attempting(1) -> ...
//!                  |
//!                  +-> Exhausted (after max_retry + 1 attempts)
//! ```
//!
//! The whole machine runs under the configured timeout. Dropping the
//! returned future abandons the in-flight request and any pending sleep.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use super::LanguageModel;
use super::config::ModelConfig;
use super::transport::{ChatRequest, HttpTransport, Transport};
use crate::error::{ModelError, TransportError};

/// Delay schedule between attempts: `unit * base^attempt`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Backoff {
    base: f64,
    unit: Duration,
}

impl Backoff {
    pub const DEFAULT_BASE: f64 = 1.5;

    /// Exponential backoff. `base` must be greater than 1 for the delays to
    /// grow; smaller values are raised to [`Backoff::DEFAULT_BASE`].
    pub fn exponential(base: f64, unit: Duration) -> Self {
        let base = if base > 1.0 { base } else { Self::DEFAULT_BASE };
        Self { base, unit }
    }

    /// Zero delay between attempts.
    pub fn none() -> Self {
        Self {
            base: Self::DEFAULT_BASE,
            unit: Duration::ZERO,
        }
    }

    /// Delay to wait after the failed attempt with the given zero-based index.
    pub fn delay(&self, attempt: u32) -> Duration {
        if self.unit.is_zero() {
            return Duration::ZERO;
        }
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let secs = self.unit.as_secs_f64() * self.base.powi(exponent);
        Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::exponential(Self::DEFAULT_BASE, Duration::from_secs(1))
    }
}

/// States of one invocation's retry loop.
#[derive(Debug, Clone, PartialEq)]
pub enum RetryState {
    Pending,
    Attempting { attempt: u32 },
    RetryWait { attempt: u32, delay: Duration },
    Succeeded { attempt: u32, content: String },
    Exhausted { attempts: u32 },
}

impl RetryState {
    /// Transition taken when attempt `attempt` fails.
    pub fn after_failure(attempt: u32, max_retry: u32, backoff: &Backoff) -> Self {
        if attempt >= max_retry {
            Self::Exhausted {
                attempts: attempt + 1,
            }
        } else {
            Self::RetryWait {
                attempt,
                delay: backoff.delay(attempt),
            }
        }
    }
}

/// Sends prompts to the remote generator with retries and a timeout.
pub struct ModelInvoker {
    config: Arc<ModelConfig>,
    transport: Arc<dyn Transport>,
    backoff: Backoff,
}

impl std::fmt::Debug for ModelInvoker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelInvoker")
            .field("config", &self.config)
            .field("backoff", &self.backoff)
            .finish()
    }
}

impl ModelInvoker {
    /// Build an invoker that talks HTTP to `config.api_url`.
    pub fn new(config: Arc<ModelConfig>) -> Result<Self, ModelError> {
        let transport = HttpTransport::new(&config)?;
        Ok(Self::with_transport(config, Arc::new(transport)))
    }

    /// Build an invoker over an arbitrary transport.
    pub fn with_transport(config: Arc<ModelConfig>, transport: Arc<dyn Transport>) -> Self {
        Self {
            config,
            transport,
            backoff: Backoff::default(),
        }
    }

    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    async fn run_attempts(&self, request: &ChatRequest) -> Result<String, ModelError> {
        let max_retry = self.config.max_retry;
        let mut state = RetryState::Pending;
        let mut last_error: Option<TransportError> = None;

        loop {
            state = match state {
                RetryState::Pending => RetryState::Attempting { attempt: 0 },
                RetryState::Attempting { attempt } => match self.transport.send(request).await {
                    Ok(raw) if !raw.trim().is_empty() => RetryState::Succeeded {
                        attempt,
                        content: raw.trim().to_string(),
                    },
                    Ok(_) => {
                        tracing::warn!(attempt = attempt + 1, "model returned empty content");
                        last_error = Some(TransportError::EmptyContent);
                        RetryState::after_failure(attempt, max_retry, &self.backoff)
                    }
                    Err(e) => {
                        tracing::warn!(attempt = attempt + 1, error = %e, "model call failed");
                        last_error = Some(e);
                        RetryState::after_failure(attempt, max_retry, &self.backoff)
                    }
                },
                RetryState::RetryWait { attempt, delay } => {
                    tracing::debug!(attempt = attempt + 1, ?delay, "backing off before retry");
                    tokio::time::sleep(delay).await;
                    RetryState::Attempting {
                        attempt: attempt + 1,
                    }
                }
                RetryState::Succeeded { attempt, content } => {
                    tracing::info!(attempt = attempt + 1, "model call succeeded");
                    return Ok(content);
                }
                RetryState::Exhausted { attempts } => {
                    tracing::error!(attempts, "all model call attempts failed");
                    return Err(ModelError::Unavailable {
                        attempts,
                        last: last_error.unwrap_or(TransportError::EmptyContent),
                    });
                }
            };
        }
    }
}

#[async_trait]
impl LanguageModel for ModelInvoker {
    async fn invoke(&self, prompt: &str, temperature: f32) -> Result<String, ModelError> {
        self.config.ensure_credentials()?;
        if prompt.trim().is_empty() {
            return Err(ModelError::InvalidRequest("prompt is empty".into()));
        }
        if !(0.0..=1.0).contains(&temperature) {
            return Err(ModelError::InvalidRequest(format!(
                "temperature {temperature} is outside [0, 1]"
            )));
        }

        let request = ChatRequest::user(&self.config, prompt, temperature);
        tracing::debug!(temperature, prompt_chars = prompt.chars().count(), "invoking model");

        let budget = self.config.timeout;
        tokio::time::timeout(budget, self.run_attempts(&request))
            .await
            .map_err(|_| {
                tracing::error!(?budget, "model call timed out");
                ModelError::Timeout(budget)
            })?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_grows_exponentially() {
        let backoff = Backoff::exponential(1.5, Duration::from_secs(1));
        assert_eq!(backoff.delay(0), Duration::from_secs(1));
        assert_eq!(backoff.delay(1), Duration::from_millis(1500));
        assert_eq!(backoff.delay(2), Duration::from_millis(2250));
    }

    #[test]
    fn backoff_rejects_non_growing_base() {
        let backoff = Backoff::exponential(0.5, Duration::from_secs(1));
        assert!(backoff.delay(1) > backoff.delay(0));
    }

    #[test]
    fn backoff_saturates_instead_of_overflowing() {
        let huge_base = Backoff::exponential(1e300, Duration::from_secs(1));
        assert_eq!(huge_base.delay(3), Duration::MAX);

        let backoff = Backoff::default();
        assert_eq!(backoff.delay(u32::MAX), Duration::MAX);
        assert!(backoff.delay(40) > backoff.delay(39));
    }

    #[test]
    fn no_backoff_is_zero() {
        assert_eq!(Backoff::none().delay(5), Duration::ZERO);
    }

    #[test]
    fn failure_before_bound_waits() {
        let backoff = Backoff::default();
        assert_eq!(
            RetryState::after_failure(0, 2, &backoff),
            RetryState::RetryWait {
                attempt: 0,
                delay: Duration::from_secs(1)
            }
        );
    }

    #[test]
    fn failure_at_bound_exhausts() {
        let backoff = Backoff::default();
        assert_eq!(
            RetryState::after_failure(2, 2, &backoff),
            RetryState::Exhausted { attempts: 3 }
        );
        assert_eq!(
            RetryState::after_failure(0, 0, &backoff),
            RetryState::Exhausted { attempts: 1 }
        );
    }
}
