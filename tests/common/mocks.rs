use async_trait::async_trait;
use bytes::Bytes;
use futures_util::StreamExt;
use image_info_relay::{
    Error, Result,
    upstream::{LineStream, UpstreamClient, UpstreamReply},
};
use serde_json::json;
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;

/// Scripted upstream behaviour.
#[derive(Debug, Clone)]
pub enum MockReply {
    /// Answers with the given fragments: one envelope when buffered,
    /// one frame per fragment plus `[DONE]` when streaming.
    Content(Vec<String>),
    /// Raw buffered body, whatever the mode.
    RawBody(String),
    /// Raw upstream lines, whatever the mode.
    Lines(Vec<String>),
    /// Raw lines, then a transport error.
    LinesThenError(Vec<String>, Error),
    /// Raw lines, then silence forever.
    LinesThenStall(Vec<String>),
    /// The call itself fails.
    Fail(Error),
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub prompt: String,
    pub image_size: usize,
    pub streaming: bool,
}

/// Mock upstream client for testing
#[derive(Debug)]
pub struct MockUpstreamClient {
    pub reply: MockReply,
    pub calls: Arc<Mutex<Vec<RecordedCall>>>,
}

impl MockUpstreamClient {
    pub fn new(reply: MockReply) -> Self {
        Self {
            reply,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_content(fragments: &[&str]) -> Self {
        Self::new(MockReply::Content(
            fragments.iter().map(|f| f.to_string()).collect(),
        ))
    }

    pub fn failing(error: Error) -> Self {
        Self::new(MockReply::Fail(error))
    }

    pub fn get_calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }
}

pub fn delta_frame(content: &str) -> String {
    format!(
        "data: {}",
        json!({"choices": [{"index": 0, "delta": {"content": content}}]})
    )
}

pub fn completion_body(content: &str) -> String {
    json!({
        "id": "chatcmpl-123",
        "object": "chat.completion",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": content},
            "finish_reason": "stop"
        }]
    })
    .to_string()
}

fn line_stream(lines: &[String]) -> Vec<Result<String>> {
    lines.iter().cloned().map(Ok).collect()
}

#[async_trait]
impl UpstreamClient for MockUpstreamClient {
    async fn call(
        &self,
        prompt: &str,
        image_blob: &str,
        streaming: bool,
        _cancel: CancellationToken,
    ) -> Result<UpstreamReply> {
        self.calls.lock().unwrap().push(RecordedCall {
            prompt: prompt.to_string(),
            image_size: image_blob.len(),
            streaming,
        });

        let lines: LineStream = match &self.reply {
            MockReply::Content(fragments) if !streaming => {
                return Ok(UpstreamReply::Buffered(Bytes::from(completion_body(
                    &fragments.concat(),
                ))));
            }
            MockReply::Content(fragments) => {
                let mut lines: Vec<String> = Vec::new();
                for fragment in fragments {
                    lines.push(delta_frame(fragment));
                    lines.push(String::new());
                }
                lines.push("data: [DONE]".to_string());
                futures_util::stream::iter(line_stream(&lines)).boxed()
            }
            MockReply::RawBody(body) => {
                return Ok(UpstreamReply::Buffered(Bytes::from(body.clone())));
            }
            MockReply::Lines(lines) => futures_util::stream::iter(line_stream(lines)).boxed(),
            MockReply::LinesThenError(lines, error) => {
                let mut items = line_stream(lines);
                items.push(Err(error.clone()));
                futures_util::stream::iter(items).boxed()
            }
            MockReply::LinesThenStall(lines) => futures_util::stream::iter(line_stream(lines))
                .chain(futures_util::stream::pending())
                .boxed(),
            MockReply::Fail(error) => return Err(error.clone()),
        };

        Ok(UpstreamReply::Streaming(lines))
    }
}
