use super::DownstreamEvent;
use futures_util::stream::BoxStream;
use serde::{Deserialize, Serialize};

pub const PLACEHOLDER_ID: &str = "bad-id";
pub const PLACEHOLDER_PROMPT: &str = "bad-prompt";

/// Buffered answer document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferenceResponse {
    pub text: String,
}

/// Error document returned in place of an answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelayErrorStatus {
    pub id: String,
    pub prompt: String,
    pub message: String,
}

impl RelayErrorStatus {
    /// For requests whose fields were never validated.
    pub fn placeholder(message: impl Into<String>) -> Self {
        Self {
            id: PLACEHOLDER_ID.to_string(),
            prompt: PLACEHOLDER_PROMPT.to_string(),
            message: message.into(),
        }
    }

    pub fn for_request(id: &str, prompt: &str, message: impl Into<String>) -> Self {
        Self {
            id: id.to_string(),
            prompt: prompt.to_string(),
            message: message.into(),
        }
    }
}

pub type EventStream = BoxStream<'static, DownstreamEvent>;

/// What the HTTP layer has to write for one request.
pub enum RelayOutcome {
    /// Decode or validation failure; no upstream call was made.
    Rejected(RelayErrorStatus),
    /// Buffered upstream call failed.
    Failed(RelayErrorStatus),
    Answered(InferenceResponse),
    Streaming(EventStream),
}

impl std::fmt::Debug for RelayOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Rejected(status) => f.debug_tuple("Rejected").field(status).finish(),
            Self::Failed(status) => f.debug_tuple("Failed").field(status).finish(),
            Self::Answered(response) => f.debug_tuple("Answered").field(response).finish(),
            Self::Streaming(_) => f.write_str("Streaming(..)"),
        }
    }
}
