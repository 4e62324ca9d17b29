//! Upstream response translation.
//!
//! Buffered bodies are reduced to the first choice's message content.
//! Streamed bodies go line → frame → delta, see [`deltas`].

mod frame;
mod stream;
mod types;

pub use frame::*;
pub use stream::*;
pub use types::*;

use crate::{Error, Result, json::decode_object};

/// Extracts `choices[0].message.content` from a buffered response body.
///
/// Missing choices, message or content yield an empty string. Only a body
/// that is not the expected JSON envelope is an error.
pub fn extract_answer(body: &[u8]) -> Result<String> {
    let envelope: CompletionEnvelope = decode_object(body)
        .map_err(|reason| Error::envelope(format!("invalid completion body: {}", reason)))?;

    let content = envelope
        .first_content()
        .map_err(|reason| Error::envelope(format!("invalid completion body: {}", reason)))?;

    Ok(content.unwrap_or_default().to_string())
}
