//! Structural schema for inbound requests.
//!
//! Each field is checked against length bounds and a regular expression.
//! No I/O happens here; the cost is one scan per field.

mod types;
mod validator;

pub use types::*;
pub use validator::*;
