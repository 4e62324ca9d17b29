use crate::schema::Violations;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Bad payload: {0}")]
    Decode(String),

    #[error("Invalid payload: {0}")]
    Validation(Violations),

    #[error("Error creating request: {0}")]
    UpstreamRequest(String),

    #[error("Error making request: {0}")]
    UpstreamConnect(String),

    #[error("Non-OK status code: {status}")]
    UpstreamStatus { status: u16, body: String },

    #[error("Error reading response body: {0}")]
    UpstreamRead(String),

    #[error("Upstream idle timeout: no data received within {secs}s")]
    UpstreamIdleTimeout { secs: u64 },

    #[error("Unexpected upstream response: {0}")]
    UpstreamEnvelope(String),

    #[error("Unsupported image type '{extension}' for {path}")]
    UnsupportedImage { extension: String, path: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Address parse error: {0}")]
    AddrParse(#[from] std::net::AddrParseError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Clone for Error {
    fn clone(&self) -> Self {
        match self {
            Self::Config(s) => Self::Config(s.clone()),
            Self::Decode(s) => Self::Decode(s.clone()),
            Self::Validation(v) => Self::Validation(v.clone()),
            Self::UpstreamRequest(s) => Self::UpstreamRequest(s.clone()),
            Self::UpstreamConnect(s) => Self::UpstreamConnect(s.clone()),
            Self::UpstreamStatus { status, body } => Self::UpstreamStatus {
                status: *status,
                body: body.clone(),
            },
            Self::UpstreamRead(s) => Self::UpstreamRead(s.clone()),
            Self::UpstreamIdleTimeout { secs } => Self::UpstreamIdleTimeout { secs: *secs },
            Self::UpstreamEnvelope(s) => Self::UpstreamEnvelope(s.clone()),
            Self::UnsupportedImage { extension, path } => Self::UnsupportedImage {
                extension: extension.clone(),
                path: path.clone(),
            },
            Self::Internal(s) => Self::Internal(s.clone()),
            // For errors that can't be cloned, convert to string representation
            Self::Serialization(e) => Self::Internal(format!("Serialization error: {}", e)),
            Self::Yaml(e) => Self::Internal(format!("YAML error: {}", e)),
            Self::Io(e) => Self::Internal(format!("IO error: {}", e)),
            Self::AddrParse(e) => Self::Internal(format!("Address parse error: {}", e)),
        }
    }
}

impl Error {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    pub fn envelope(msg: impl Into<String>) -> Self {
        Self::UpstreamEnvelope(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// True for every cause that the relay reports outward as an upstream failure.
    pub fn is_upstream_failure(&self) -> bool {
        matches!(
            self,
            Self::UpstreamRequest(_)
                | Self::UpstreamConnect(_)
                | Self::UpstreamStatus { .. }
                | Self::UpstreamRead(_)
                | Self::UpstreamIdleTimeout { .. }
                | Self::UpstreamEnvelope(_)
        )
    }

    /// Short category label used in log lines.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Decode(_) => "BAD_PAYLOAD",
            Self::Validation(_) => "INVALID_PAYLOAD",
            e if e.is_upstream_failure() => "INFO_RETRIEVAL_ERROR",
            Self::UnsupportedImage { .. } => "UNSUPPORTED_IMAGE",
            _ => "INTERNAL_ERROR",
        }
    }
}
