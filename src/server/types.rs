use serde::{Deserialize, Serialize};

pub use crate::relay::{InferenceResponse, RelayErrorStatus};
pub use crate::schema::InferenceRequest;

/// Body of a 500 response, for failures outside the relay contract.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
