use bytes::Bytes;
use futures_util::stream::BoxStream;
use serde::{Deserialize, Serialize};

/// Outbound chat-completions body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub max_tokens: u32,
    pub messages: Vec<ChatMessage>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub stream: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: Vec<ContentPart>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageUrl {
    pub url: String,
}

impl ChatCompletionRequest {
    /// Single user message carrying the prompt and the image data URI.
    pub fn image_prompt(
        model: &str,
        max_tokens: u32,
        prompt: &str,
        image_blob: &str,
        stream: bool,
    ) -> Self {
        Self {
            model: model.to_string(),
            max_tokens,
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: vec![
                    ContentPart::Text {
                        text: prompt.to_string(),
                    },
                    ContentPart::ImageUrl {
                        image_url: ImageUrl {
                            url: image_blob.to_string(),
                        },
                    },
                ],
            }],
            stream,
        }
    }
}

/// Raw lines of a streaming upstream body, in arrival order.
pub type LineStream = BoxStream<'static, crate::Result<String>>;

/// What one upstream call hands back.
pub enum UpstreamReply {
    /// Complete response body.
    Buffered(Bytes),
    /// Open connection, consumed line by line.
    Streaming(LineStream),
}

impl std::fmt::Debug for UpstreamReply {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Buffered(body) => f.debug_tuple("Buffered").field(&body.len()).finish(),
            Self::Streaming(_) => f.write_str("Streaming(..)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_image_prompt_wire_shape() {
        let request = ChatCompletionRequest::image_prompt(
            "gpt-4o",
            4096,
            "Describe the scenery.",
            "data:image/webp;base64,AAAA",
            false,
        );

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            json!({
                "model": "gpt-4o",
                "max_tokens": 4096,
                "messages": [{
                    "role": "user",
                    "content": [
                        {"type": "text", "text": "Describe the scenery."},
                        {"type": "image_url", "image_url": {"url": "data:image/webp;base64,AAAA"}}
                    ]
                }]
            })
        );
    }

    #[test]
    fn test_stream_toggle_serialized_only_when_set() {
        let request = ChatCompletionRequest::image_prompt("m", 1, "p", "u", true);
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["stream"], json!(true));
    }
}
