//! Structured-feedback producers.
//!
//! [`GeminiProducer`] calls a Vertex AI Gemini model; [`CannedProducer`]
//! replays fixed replies and is what the HTTP tests run against.

pub mod canned;
pub mod error;
pub mod gemini;
pub mod prompt;

pub use canned::CannedProducer;
pub use error::{Error, Result};
pub use gemini::{GeminiConfig, GeminiProducer};
