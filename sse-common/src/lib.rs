//! Streaming protocol layer for LLM chat responses.
//!
//! Turns Anthropic Messages and OpenAI Chat Completions SSE bodies into one
//! sequence of [`sse::StreamEvent`]s: text, tool-call start/arguments/end,
//! completion and error.

pub mod config;
pub mod error;
pub mod sse;

pub use error::{Result, StreamError};
