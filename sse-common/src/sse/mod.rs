pub mod anthropic;
pub mod decode;
pub mod events;
pub mod openai;
pub mod reader;
pub mod streaming;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::StreamError;

pub use decode::FrameDecoder;
pub use events::{anthropic_events, openai_events, vendor_events, EventParser, EventStream, FrameParser};
pub use reader::FrameReader;

// ============================================================================
// Frame — one blank-line delimited SSE block
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Frame {
    /// Value of the last `event:` line, empty when the block had none.
    pub event: String,
    /// All `data:` lines of the block joined by `\n`.
    pub data: String,
}

impl Frame {
    pub fn new(event: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            event: event.into(),
            data: data.into(),
        }
    }
}

// ============================================================================
// StreamEvent — Unified output of every vendor parser
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    Text { text: String },
    ToolCallStart { id: String, name: String },
    /// Fragment of the tool's JSON arguments. Concatenate in order per id.
    ToolCallDelta { id: String, args_chunk: String },
    ToolCallEnd { id: String },
    Done { stop_reason: String },
    Error { message: String },
}

// ============================================================================
// Vendor — which wire format a byte stream carries
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Vendor {
    Anthropic,
    #[serde(rename = "openai")]
    OpenAi,
}

impl FromStr for Vendor {
    type Err = StreamError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "anthropic" | "claude" => Ok(Vendor::Anthropic),
            "openai" | "chat" => Ok(Vendor::OpenAi),
            other => Err(StreamError::Config(format!("unknown vendor: {}", other))),
        }
    }
}

impl fmt::Display for Vendor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Vendor::Anthropic => f.write_str("anthropic"),
            Vendor::OpenAi => f.write_str("openai"),
        }
    }
}

// ============================================================================
// Payload helpers shared by the vendor parsers
// ============================================================================

/// Parse frame data, accepting only a JSON object.
fn parse_object(data: &str) -> Option<serde_json::Value> {
    match serde_json::from_str::<serde_json::Value>(data) {
        Ok(value @ serde_json::Value::Object(_)) => Some(value),
        Ok(_) => {
            tracing::debug!("Skipping SSE frame: data is not a JSON object");
            None
        }
        Err(err) => {
            tracing::debug!("Skipping SSE frame with malformed JSON: {}", err);
            None
        }
    }
}

/// Decode an already-parsed payload into its typed shape.
fn decode_payload<T: serde::de::DeserializeOwned>(payload: serde_json::Value) -> Option<T> {
    serde_json::from_value(payload)
        .map_err(|err| tracing::debug!("Skipping SSE frame with unexpected shape: {}", err))
        .ok()
}
