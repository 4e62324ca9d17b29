mod client;
mod lines;
mod types;

pub use client::*;
pub use lines::*;
pub use types::*;
