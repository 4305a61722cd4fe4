//! Character-chunked event stream of a finished plan.
//!
//! The stream yields one [`StreamEvent::Chunk`] per character of the
//! pretty-printed plan followed by a single [`StreamEvent::Done`]. Framing
//! (`data:` lines) belongs to the transport; [`StreamEvent::data`] gives the
//! payload of one frame.

use std::time::Duration;

use futures::Stream;
use serde::Serialize;

use crate::plan::Plan;

/// Payload of the final frame.
pub const DONE_SENTINEL: &str = "[DONE]";

/// Delay between chunks used by the HTTP surface.
pub const DEFAULT_PACE: Duration = Duration::from_millis(10);

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StreamChunk {
    pub role: &'static str,
    pub content: String,
}

impl StreamChunk {
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant",
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    Chunk(StreamChunk),
    Done,
}

impl StreamEvent {
    /// The frame payload: chunk JSON, or the done sentinel.
    pub fn data(&self) -> String {
        match self {
            Self::Chunk(chunk) => serde_json::json!({
                "role": chunk.role,
                "content": chunk.content,
            })
            .to_string(),
            Self::Done => DONE_SENTINEL.to_string(),
        }
    }
}

/// Stream `text` one character at a time, sleeping `pace` after each chunk.
pub fn text_stream(
    text: String,
    pace: Option<Duration>,
) -> impl Stream<Item = StreamEvent> + Send + 'static {
    async_stream::stream! {
        for ch in text.chars() {
            yield StreamEvent::Chunk(StreamChunk::assistant(ch));
            if let Some(pace) = pace {
                tokio::time::sleep(pace).await;
            }
        }
        yield StreamEvent::Done;
    }
}

/// Stream the pretty-printed plan body (without the envelope).
pub fn plan_stream(
    plan: &Plan,
    pace: Option<Duration>,
) -> impl Stream<Item = StreamEvent> + Send + 'static + use<> {
    let text = serde_json::to_string_pretty(plan).unwrap_or_else(|e| {
        tracing::error!(error = %e, "failed to serialize plan for streaming");
        String::new()
    });
    text_stream(text, pace)
}

/// A stream holding one whole message, then the sentinel.
pub fn message_stream(message: impl Into<String>) -> impl Stream<Item = StreamEvent> + Send + 'static {
    futures::stream::iter([
        StreamEvent::Chunk(StreamChunk::assistant(message)),
        StreamEvent::Done,
    ])
}

#[cfg(test)]
mod tests {
    use futures::StreamExt;

    use super::*;

    #[tokio::test]
    async fn chunks_reassemble_to_pretty_plan() {
        let plan = Plan::single_task("递归", "理解递归", vec!["基线条件".into()]);
        let events: Vec<StreamEvent> = plan_stream(&plan, None).collect().await;

        assert_eq!(events.last(), Some(&StreamEvent::Done));
        let text: String = events
            .iter()
            .filter_map(|e| match e {
                StreamEvent::Chunk(c) => Some(c.content.as_str()),
                StreamEvent::Done => None,
            })
            .collect();
        assert_eq!(text, serde_json::to_string_pretty(&plan).unwrap());
        assert_eq!(events.len(), text.chars().count() + 1);
    }

    #[test]
    fn event_payloads_are_chunk_json_or_sentinel() {
        let chunk = StreamEvent::Chunk(StreamChunk::assistant("递"));
        let value: serde_json::Value = serde_json::from_str(&chunk.data()).unwrap();
        assert_eq!(value, serde_json::json!({"role": "assistant", "content": "递"}));
        assert_eq!(StreamEvent::Done.data(), "[DONE]");
    }

    #[tokio::test]
    async fn message_stream_is_single_chunk() {
        let events: Vec<StreamEvent> = message_stream("请使用POST方法请求此接口。").collect().await;
        assert_eq!(events.len(), 2);
        assert_eq!(events[1], StreamEvent::Done);
    }

    #[tokio::test(start_paused = true)]
    async fn paced_stream_sleeps_between_chunks() {
        let start = tokio::time::Instant::now();
        let events: Vec<StreamEvent> =
            text_stream("abc".into(), Some(DEFAULT_PACE)).collect().await;
        assert_eq!(events.len(), 4);
        assert!(start.elapsed() >= DEFAULT_PACE * 3);
    }
}
