use bytes::Bytes;

pub const SENTINEL: &str = "[DONE]";

/// One frame of the downstream event stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownstreamEvent {
    Delta(String),
    Error(String),
    Done,
}

impl DownstreamEvent {
    /// Encodes the event as `text/event-stream` bytes.
    ///
    /// Multi-line text becomes one `data:` line per line, which clients
    /// join back with `\n`.
    pub fn encode(&self) -> Bytes {
        let mut out = String::new();
        match self {
            Self::Delta(text) => push_data(&mut out, text),
            Self::Error(message) => {
                out.push_str("event: error\n");
                push_data(&mut out, message);
            }
            Self::Done => push_data(&mut out, SENTINEL),
        }
        out.push('\n');
        Bytes::from(out)
    }

    pub fn is_sentinel(&self) -> bool {
        matches!(self, Self::Done)
    }
}

fn push_data(out: &mut String, text: &str) {
    let text = text.replace("\r\n", "\n");
    for line in text.split(['\n', '\r']) {
        out.push_str("data: ");
        out.push_str(line);
        out.push('\n');
    }
}
