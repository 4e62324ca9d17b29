pub mod config;
pub mod convert;
pub mod error;
pub mod json;
pub mod relay;
pub mod schema;
pub mod server;
pub mod translate;
pub mod upstream;

pub use error::{Error, Result};
