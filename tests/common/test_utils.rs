use super::mocks::MockUpstreamClient;
use futures_util::StreamExt;
use image_info_relay::{
    relay::{DownstreamEvent, EventStream, Relay},
    schema::{InferenceRequest, SchemaValidator},
};
use serde_json::{Value, json};
use std::sync::Arc;

pub const VALID_ID: &str = "0b6f6b4e-3c1a-4d6e-9a5f-2e8d7c6b5a49";
pub const VALID_PROMPT: &str = "Describe the scenery.";
pub const VALID_BLOB: &str = "data:image/webp;base64,AAAA";

pub fn valid_request(stream: bool) -> InferenceRequest {
    InferenceRequest {
        id: VALID_ID.to_string(),
        prompt: VALID_PROMPT.to_string(),
        stream,
        blob: VALID_BLOB.to_string(),
    }
}

pub fn request_json(stream: bool) -> Value {
    json!({
        "id": VALID_ID,
        "prompt": VALID_PROMPT,
        "stream": stream,
        "blob": VALID_BLOB,
    })
}

/// Relay over a mock upstream, returning both so calls can be inspected.
pub fn create_test_relay(upstream: MockUpstreamClient) -> (Relay, Arc<MockUpstreamClient>) {
    let upstream = Arc::new(upstream);
    let relay = Relay::new(
        Arc::new(SchemaValidator::new().unwrap()),
        upstream.clone(),
    );
    (relay, upstream)
}

pub async fn collect_events(events: EventStream) -> Vec<DownstreamEvent> {
    events.collect().await
}

pub fn sentinel_count(events: &[DownstreamEvent]) -> usize {
    events.iter().filter(|e| e.is_sentinel()).count()
}

pub fn joined_deltas(events: &[DownstreamEvent]) -> String {
    events
        .iter()
        .filter_map(|e| match e {
            DownstreamEvent::Delta(text) => Some(text.as_str()),
            _ => None,
        })
        .collect()
}
