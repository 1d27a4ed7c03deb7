use serde::Deserialize;
use serde_json::Value;
use tracing::trace;

use super::events::FrameParser;
use super::{decode_payload, parse_object, Frame, StreamEvent};

const DEFAULT_STOP_REASON: &str = "end_turn";
const FALLBACK_ERROR_MESSAGE: &str = "Unknown Anthropic stream error";

// ============================================================================
// Wire payloads (Messages API streaming)
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EventKind {
    MessageStart,
    ContentBlockStart,
    ContentBlockDelta,
    ContentBlockStop,
    MessageDelta,
    MessageStop,
    Error,
    Unknown,
}

impl EventKind {
    fn from_name(name: &str) -> Self {
        match name {
            "message_start" => EventKind::MessageStart,
            "content_block_start" => EventKind::ContentBlockStart,
            "content_block_delta" => EventKind::ContentBlockDelta,
            "content_block_stop" => EventKind::ContentBlockStop,
            "message_delta" => EventKind::MessageDelta,
            "message_stop" => EventKind::MessageStop,
            "error" => EventKind::Error,
            _ => EventKind::Unknown,
        }
    }
}

#[derive(Debug, Deserialize)]
struct BlockStartPayload {
    content_block: Option<ContentBlock>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text,
    ToolUse {
        id: Option<String>,
        name: Option<String>,
    },
    /// thinking, server_tool_use, ...
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct BlockDeltaPayload {
    delta: Option<BlockDelta>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum BlockDelta {
    TextDelta { text: Option<String> },
    InputJsonDelta { partial_json: Option<String> },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct MessageDeltaPayload {
    delta: Option<MessageDelta>,
}

#[derive(Debug, Deserialize)]
struct MessageDelta {
    stop_reason: Option<String>,
}

// ============================================================================
// AnthropicParser — content-block state machine
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum BlockKind {
    #[default]
    None,
    Text,
    ToolUse,
}

/// Tool calls are correlated by the id carried on `content_block_start`; the
/// open block is closed by the next `content_block_stop`.
#[derive(Debug)]
pub struct AnthropicParser {
    block: BlockKind,
    tool_id: Option<String>,
    stop_reason: String,
    finished: bool,
    saw_error: bool,
}

impl AnthropicParser {
    pub fn new() -> Self {
        Self {
            block: BlockKind::None,
            tool_id: None,
            stop_reason: DEFAULT_STOP_REASON.to_string(),
            finished: false,
            saw_error: false,
        }
    }

    pub fn stop_reason(&self) -> &str {
        &self.stop_reason
    }

    fn on_block_start(&mut self, payload: Value) -> Vec<StreamEvent> {
        let Some(start) = decode_payload::<BlockStartPayload>(payload) else {
            return Vec::new();
        };

        match start.content_block {
            Some(ContentBlock::Text) => {
                self.block = BlockKind::Text;
                Vec::new()
            }
            Some(ContentBlock::ToolUse { id, name }) => {
                self.block = BlockKind::ToolUse;
                self.tool_id = id;
                vec![StreamEvent::ToolCallStart {
                    id: self.tool_id.clone().unwrap_or_default(),
                    name: name.unwrap_or_default(),
                }]
            }
            Some(ContentBlock::Other) | None => Vec::new(),
        }
    }

    fn on_block_delta(&mut self, payload: Value) -> Vec<StreamEvent> {
        let Some(delta) = decode_payload::<BlockDeltaPayload>(payload).and_then(|p| p.delta) else {
            return Vec::new();
        };

        match delta {
            BlockDelta::TextDelta { text: Some(text) } if !text.is_empty() => {
                vec![StreamEvent::Text { text }]
            }
            BlockDelta::InputJsonDelta {
                partial_json: Some(partial_json),
            } => vec![StreamEvent::ToolCallDelta {
                id: self.tool_id.clone().unwrap_or_default(),
                args_chunk: partial_json,
            }],
            BlockDelta::TextDelta { .. } | BlockDelta::InputJsonDelta { .. } | BlockDelta::Other => {
                Vec::new()
            }
        }
    }

    fn on_block_stop(&mut self) -> Vec<StreamEvent> {
        let was_tool = self.block == BlockKind::ToolUse;
        self.block = BlockKind::None;
        match self.tool_id.take() {
            Some(id) if was_tool => vec![StreamEvent::ToolCallEnd { id }],
            _ => Vec::new(),
        }
    }

    fn on_message_delta(&mut self, payload: Value) {
        let stop_reason = decode_payload::<MessageDeltaPayload>(payload)
            .and_then(|p| p.delta)
            .and_then(|d| d.stop_reason);
        if let Some(reason) = stop_reason {
            self.stop_reason = reason;
        }
    }

    fn on_error(&mut self, payload: Value) -> Vec<StreamEvent> {
        self.saw_error = true;
        // Each source is read on its own so a mistyped field never hides the other.
        let message = payload
            .pointer("/error/message")
            .and_then(Value::as_str)
            .or_else(|| payload.get("message").and_then(Value::as_str))
            .unwrap_or(FALLBACK_ERROR_MESSAGE);
        vec![StreamEvent::Error {
            message: message.to_string(),
        }]
    }

    fn done(&mut self) -> Vec<StreamEvent> {
        self.finished = true;
        vec![StreamEvent::Done {
            stop_reason: self.stop_reason.clone(),
        }]
    }
}

impl Default for AnthropicParser {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameParser for AnthropicParser {
    fn parse_frame(&mut self, frame: &Frame) -> Vec<StreamEvent> {
        if self.finished {
            return Vec::new();
        }
        let Some(payload) = parse_object(&frame.data) else {
            return Vec::new();
        };

        match EventKind::from_name(&frame.event) {
            EventKind::MessageStart => Vec::new(),
            EventKind::ContentBlockStart => self.on_block_start(payload),
            EventKind::ContentBlockDelta => self.on_block_delta(payload),
            EventKind::ContentBlockStop => self.on_block_stop(),
            EventKind::MessageDelta => {
                self.on_message_delta(payload);
                Vec::new()
            }
            EventKind::MessageStop => self.done(),
            EventKind::Error => self.on_error(payload),
            EventKind::Unknown => {
                trace!("Ignoring Anthropic SSE event: {:?}", frame.event);
                Vec::new()
            }
        }
    }

    fn is_finished(&self) -> bool {
        self.finished
    }

    /// A stream cut short after an `error` frame ends without `Done`.
    fn on_exhausted(&mut self) -> Vec<StreamEvent> {
        if self.finished || self.saw_error {
            return Vec::new();
        }
        self.done()
    }
}
