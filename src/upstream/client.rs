use super::{ChatCompletionRequest, LineBuffer, LineStream, UpstreamReply};
use crate::{Error, Result, config::UpstreamConfig};
use async_trait::async_trait;
use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use reqwest::StatusCode;
use std::{collections::VecDeque, fmt::Display, time::Duration};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Most bytes of a failed response body kept for diagnostics.
const ERROR_BODY_LIMIT: usize = 4096;

#[async_trait]
pub trait UpstreamClient: Send + Sync {
    /// Issues exactly one outbound call for `prompt` + `image_blob`.
    ///
    /// A streaming reply stops yielding lines once `cancel` fires.
    async fn call(
        &self,
        prompt: &str,
        image_blob: &str,
        streaming: bool,
        cancel: CancellationToken,
    ) -> Result<UpstreamReply>;
}

pub struct HttpUpstreamClient {
    client: reqwest::Client,
    url: String,
    api_key: String,
    model: String,
    max_tokens: u32,
}

impl HttpUpstreamClient {
    pub fn new(config: UpstreamConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if config.connect_timeout_secs > 0 {
            builder = builder.connect_timeout(Duration::from_secs(config.connect_timeout_secs));
        }
        let client = builder
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        if config.api_key.is_empty() {
            warn!("No upstream API key configured");
        }

        Ok(Self {
            client,
            url: config.url,
            api_key: config.api_key,
            model: config.model,
            max_tokens: config.max_tokens,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl UpstreamClient for HttpUpstreamClient {
    async fn call(
        &self,
        prompt: &str,
        image_blob: &str,
        streaming: bool,
        cancel: CancellationToken,
    ) -> Result<UpstreamReply> {
        let body = ChatCompletionRequest::image_prompt(
            &self.model,
            self.max_tokens,
            prompt,
            image_blob,
            streaming,
        );

        let request = self
            .client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .build()
            .map_err(|e| Error::UpstreamRequest(e.to_string()))?;

        debug!(
            "Calling upstream {} (model: {}, streaming: {}, image size: {})",
            self.url,
            self.model,
            streaming,
            image_blob.len()
        );

        let response = self
            .client
            .execute(request)
            .await
            .map_err(|e| Error::UpstreamConnect(e.to_string()))?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = read_error_body(response).await;
            warn!("Non-OK status code: {}, body: {}", status.as_u16(), body);
            return Err(Error::UpstreamStatus {
                status: status.as_u16(),
                body,
            });
        }

        if streaming {
            Ok(UpstreamReply::Streaming(lines_from_chunks(
                response.bytes_stream(),
                cancel,
            )))
        } else {
            let body = response
                .bytes()
                .await
                .map_err(|e| Error::UpstreamRead(e.to_string()))?;
            debug!("Received buffered upstream body of {} bytes", body.len());
            Ok(UpstreamReply::Buffered(body))
        }
    }
}

async fn read_error_body(mut response: reqwest::Response) -> String {
    let mut body = Vec::new();
    while body.len() < ERROR_BODY_LIMIT {
        match response.chunk().await {
            Ok(Some(chunk)) => body.extend_from_slice(&chunk),
            _ => break,
        }
    }
    body.truncate(ERROR_BODY_LIMIT);
    String::from_utf8_lossy(&body).into_owned()
}

struct LineState<S> {
    chunks: S,
    buffer: LineBuffer,
    ready: VecDeque<String>,
    exhausted: bool,
}

/// Turns a chunked body into a [`LineStream`] that ends on EOF, on the
/// first read error, or when `cancel` fires.
pub fn lines_from_chunks<S, E>(chunks: S, cancel: CancellationToken) -> LineStream
where
    S: Stream<Item = std::result::Result<Bytes, E>> + Send + 'static,
    E: Display + Send + 'static,
{
    let state = LineState {
        chunks: Box::pin(chunks),
        buffer: LineBuffer::new(),
        ready: VecDeque::new(),
        exhausted: false,
    };

    futures_util::stream::unfold(state, |mut state| async move {
        loop {
            if let Some(line) = state.ready.pop_front() {
                return Some((Ok(line), state));
            }
            if state.exhausted {
                return None;
            }
            match state.chunks.next().await {
                Some(Ok(chunk)) => state.ready.extend(state.buffer.push(&chunk)),
                Some(Err(e)) => {
                    state.exhausted = true;
                    return Some((Err(Error::UpstreamRead(e.to_string())), state));
                }
                None => {
                    state.exhausted = true;
                    state.ready.extend(state.buffer.finish());
                }
            }
        }
    })
    .take_until(cancel.cancelled_owned())
    .boxed()
}
