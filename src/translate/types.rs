use serde::Deserialize;
use serde_json::Value;

/// Buffered response envelope: `{"choices":[{"message":{"content":...}}]}`.
///
/// `choices` stays raw; only the fixed path of the first choice is read.
#[derive(Debug, Default, Deserialize)]
pub struct CompletionEnvelope {
    #[serde(default)]
    pub choices: Value,
}

impl CompletionEnvelope {
    /// `choices[0].message.content`; `None` when any step is missing or null.
    pub fn first_content(&self) -> Result<Option<&str>, String> {
        match self.choices.pointer("/0/message/content") {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(text)) => Ok(Some(text.as_str())),
            Some(other) => Err(format!("message content is not a string: {}", other)),
        }
    }
}

/// One streamed frame: `{"choices":[{"delta":{"content":...}}]}`.
#[derive(Debug, Default, Deserialize)]
pub struct ChunkEnvelope {
    #[serde(default)]
    pub choices: Value,
}

/// What one entry of a streamed frame's `choices` carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkContent<'a> {
    Text(&'a str),
    Absent,
    /// Entry is not an object, or its content is not a string.
    Invalid,
}

impl ChunkEnvelope {
    /// Per-choice `delta.content`, in order. A non-array `choices` has no entries.
    pub fn contents(&self) -> impl Iterator<Item = ChunkContent<'_>> {
        self.choices
            .as_array()
            .into_iter()
            .flatten()
            .map(|choice| {
                if !choice.is_object() {
                    return ChunkContent::Invalid;
                }
                match choice.pointer("/delta/content") {
                    None | Some(Value::Null) => ChunkContent::Absent,
                    Some(Value::String(text)) => ChunkContent::Text(text.as_str()),
                    Some(_) => ChunkContent::Invalid,
                }
            })
    }
}

/// Non-empty fragment of answer text, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentDelta(String);

impl ContentDelta {
    /// `None` for an empty fragment; empty deltas are never emitted.
    pub fn new(text: impl Into<String>) -> Option<Self> {
        let text = text.into();
        if text.is_empty() { None } else { Some(Self(text)) }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}
