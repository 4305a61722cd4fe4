//! Retry, backoff and timeout behaviour of the model invoker.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use pact_core::error::{ModelError, TransportError};
use pact_core::model::{Backoff, ChatRequest, LanguageModel, ModelConfig, ModelInvoker, Transport};
use pact_test_utils::{ScriptedTransport, test_config};

fn invoker(config: ModelConfig, transport: Arc<ScriptedTransport>) -> ModelInvoker {
    ModelInvoker::with_transport(Arc::new(config), transport)
}

#[tokio::test(start_paused = true)]
async fn always_failing_transport_is_attempted_three_times() {
    let transport = Arc::new(ScriptedTransport::failing());
    let invoker = invoker(test_config().with_max_retry(2), transport.clone());

    let err = invoker.invoke("生成计划", 0.3).await.unwrap_err();

    match err {
        ModelError::Unavailable { attempts, last } => {
            assert_eq!(attempts, 3);
            assert!(matches!(last, TransportError::Status { status: 503, .. }));
        }
        other => panic!("expected Unavailable, got {other:?}"),
    }

    let arrivals = transport.arrivals();
    assert_eq!(arrivals.len(), 3);
    let first_gap = arrivals[1] - arrivals[0];
    let second_gap = arrivals[2] - arrivals[1];
    assert!(first_gap >= Duration::from_secs(1), "first gap {first_gap:?}");
    assert!(second_gap > first_gap, "{second_gap:?} <= {first_gap:?}");
}

#[tokio::test(start_paused = true)]
async fn recovers_after_transient_failures() {
    let transport = Arc::new(ScriptedTransport::new([
        Err(TransportError::Network("connection reset".into())),
        Ok("   ".into()),
        Ok("  学习计划  ".into()),
    ]));
    let invoker = invoker(test_config(), transport.clone());

    let text = invoker.invoke("生成计划", 0.5).await.unwrap();

    assert_eq!(text, "学习计划");
    assert_eq!(transport.arrivals().len(), 3);
}

#[tokio::test]
async fn zero_backoff_retries_immediately() {
    let transport = Arc::new(ScriptedTransport::new([
        Err(TransportError::EmptyContent),
        Ok("ok".into()),
    ]));
    let invoker = invoker(test_config(), transport.clone()).with_backoff(Backoff::none());

    assert_eq!(invoker.invoke("p", 0.1).await.unwrap(), "ok");
    assert_eq!(transport.arrivals().len(), 2);
}

#[tokio::test]
async fn missing_key_fails_without_calling_transport() {
    let transport = Arc::new(ScriptedTransport::new([Ok("never".into())]));
    let config = ModelConfig::new(ModelConfig::DEFAULT_API_URL, "", "m");
    let invoker = invoker(config, transport.clone());

    let err = invoker.invoke("p", 0.3).await.unwrap_err();

    assert!(matches!(err, ModelError::Configuration(_)));
    assert!(err.is_fatal());
    assert!(transport.arrivals().is_empty());
}

#[tokio::test]
async fn placeholder_key_is_a_configuration_error() {
    let transport = Arc::new(ScriptedTransport::new([Ok("never".into())]));
    let config = ModelConfig::new(ModelConfig::DEFAULT_API_URL, "YOUR_API_KEY", "m");

    let err = invoker(config, transport.clone())
        .invoke("p", 0.3)
        .await
        .unwrap_err();

    assert!(matches!(err, ModelError::Configuration(_)));
    assert!(transport.arrivals().is_empty());
}

#[tokio::test]
async fn rejects_empty_prompt_and_bad_temperature() {
    let transport = Arc::new(ScriptedTransport::new([]));
    let invoker = invoker(test_config(), transport.clone());

    assert!(matches!(
        invoker.invoke("  ", 0.3).await,
        Err(ModelError::InvalidRequest(_))
    ));
    assert!(matches!(
        invoker.invoke("p", 1.5).await,
        Err(ModelError::InvalidRequest(_))
    ));
    assert!(transport.arrivals().is_empty());
}

#[tokio::test]
async fn request_carries_model_temperature_and_token_budget() {
    let transport = Arc::new(ScriptedTransport::new([Ok("ok".into())]));
    let invoker = invoker(test_config(), transport.clone());

    invoker.invoke("你好", 0.7).await.unwrap();

    let requests = transport.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].model, "test-model");
    assert_eq!(requests[0].temperature, 0.7);
    assert_eq!(requests[0].max_tokens, ModelConfig::DEFAULT_MAX_TOKENS);
    assert_eq!(requests[0].messages[0].content, "你好");
    assert_eq!(requests[0].messages[0].role, "user");
}

struct StalledTransport;

#[async_trait]
impl Transport for StalledTransport {
    async fn send(&self, _request: &ChatRequest) -> Result<String, TransportError> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok("too late".into())
    }
}

#[tokio::test(start_paused = true)]
async fn overall_timeout_bounds_the_call() {
    let config = test_config().with_timeout(Duration::from_secs(5));
    let invoker = ModelInvoker::with_transport(Arc::new(config), Arc::new(StalledTransport));

    let err = invoker.invoke("p", 0.3).await.unwrap_err();

    assert!(matches!(err, ModelError::Timeout(d) if d == Duration::from_secs(5)));
}

#[tokio::test(start_paused = true)]
async fn timeout_abandons_pending_backoff() {
    let transport = Arc::new(ScriptedTransport::failing());
    let config = test_config().with_timeout(Duration::from_secs(5));
    let invoker = invoker(config, transport.clone())
        .with_backoff(Backoff::exponential(2.0, Duration::from_secs(1000)));

    let start = tokio::time::Instant::now();
    let err = invoker.invoke("p", 0.3).await.unwrap_err();

    assert!(matches!(err, ModelError::Timeout(d) if d == Duration::from_secs(5)));
    assert_eq!(start.elapsed(), Duration::from_secs(5));
    assert_eq!(transport.arrivals().len(), 1);
}
