use super::{ChunkContent, ChunkEnvelope, ContentDelta};
use crate::json::decode_object;

pub const DATA_PREFIX: &str = "data:";
pub const SENTINEL: &str = "[DONE]";

/// Classification of one upstream line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpstreamFrame {
    /// `data:` line; holds the payload after the prefix.
    Data(String),
    /// `data: [DONE]`.
    Done,
    /// Blank separators, comments and any other field.
    Other,
}

/// Result of decoding one data frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameOutcome {
    Delta(ContentDelta),
    Empty,
    Malformed(String),
}

pub fn classify(line: &str) -> UpstreamFrame {
    let Some(payload) = line.strip_prefix(DATA_PREFIX) else {
        return UpstreamFrame::Other;
    };
    let payload = payload.strip_prefix(' ').unwrap_or(payload);

    if payload.trim() == SENTINEL {
        UpstreamFrame::Done
    } else {
        UpstreamFrame::Data(payload.to_string())
    }
}

/// Concatenates `choices[*].delta.content` of one frame.
///
/// Invalid entries are dropped individually. The frame is malformed only
/// when it carries no text and at least one entry was invalid.
pub fn decode_delta(payload: &str) -> FrameOutcome {
    let envelope: ChunkEnvelope = match decode_object(payload.as_bytes()) {
        Ok(envelope) => envelope,
        Err(reason) => return FrameOutcome::Malformed(reason),
    };

    let mut text = String::new();
    let mut invalid = 0usize;
    for content in envelope.contents() {
        match content {
            ChunkContent::Text(part) => text.push_str(part),
            ChunkContent::Absent => {}
            ChunkContent::Invalid => invalid += 1,
        }
    }

    match ContentDelta::new(text) {
        Some(delta) => FrameOutcome::Delta(delta),
        None if invalid > 0 => {
            FrameOutcome::Malformed(format!("{} choice(s) without usable content", invalid))
        }
        None => FrameOutcome::Empty,
    }
}
