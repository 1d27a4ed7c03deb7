use indexmap::IndexMap;
use serde::Deserialize;
use tracing::warn;

use super::events::FrameParser;
use super::{decode_payload, parse_object, Frame, StreamEvent};

const DONE_SENTINEL: &str = "[DONE]";
const DEFAULT_FINISH_REASON: &str = "stop";
const TOOL_CALLS_FINISH_REASON: &str = "tool_calls";

// ============================================================================
// Wire payloads (Chat Completions streaming)
// ============================================================================

#[derive(Debug, Deserialize)]
struct ChatChunk {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    delta: Option<ChoiceDelta>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChoiceDelta {
    content: Option<String>,
    tool_calls: Option<Vec<ToolCallChunk>>,
}

#[derive(Debug, Deserialize)]
struct ToolCallChunk {
    /// Absent or null reads as slot 0.
    index: Option<i64>,
    id: Option<String>,
    function: Option<FunctionChunk>,
}

#[derive(Debug, Deserialize)]
struct FunctionChunk {
    name: Option<String>,
    arguments: Option<String>,
}

#[derive(Debug)]
struct ToolSlot {
    id: String,
    ended: bool,
}

// ============================================================================
// OpenAiParser — index-correlated tool-call state machine
// ============================================================================

/// Chat Completions frames carry no event name. Tool-call fragments are tied
/// together by `index`; the id only arrives on the first fragment.
#[derive(Debug)]
pub struct OpenAiParser {
    tools: IndexMap<i64, ToolSlot>,
    finish_reason: String,
    finished: bool,
}

impl OpenAiParser {
    pub fn new() -> Self {
        Self {
            tools: IndexMap::new(),
            finish_reason: DEFAULT_FINISH_REASON.to_string(),
            finished: false,
        }
    }

    pub fn finish_reason(&self) -> &str {
        &self.finish_reason
    }

    /// Ids in first-registration order.
    pub fn tool_ids(&self) -> impl Iterator<Item = &str> {
        self.tools.values().map(|slot| slot.id.as_str())
    }

    fn on_chunk(&mut self, chunk: ChatChunk) -> Vec<StreamEvent> {
        let Some(choice) = chunk.choices.into_iter().next() else {
            return Vec::new();
        };
        let mut events = Vec::new();

        if let Some(reason) = choice.finish_reason {
            if reason == TOOL_CALLS_FINISH_REASON {
                for slot in self.tools.values_mut().filter(|slot| !slot.ended) {
                    slot.ended = true;
                    events.push(StreamEvent::ToolCallEnd {
                        id: slot.id.clone(),
                    });
                }
            }
            self.finish_reason = reason;
        }

        let Some(delta) = choice.delta else {
            return events;
        };

        if let Some(text) = delta.content.filter(|c| !c.is_empty()) {
            events.push(StreamEvent::Text { text });
        }

        for call in delta.tool_calls.unwrap_or_default() {
            let index = call.index.unwrap_or(0);
            let (name, arguments) = match call.function {
                Some(function) => (function.name, function.arguments),
                None => (None, None),
            };

            if let (Some(id), Some(name)) = (
                call.id.filter(|id| !id.is_empty()),
                name.filter(|name| !name.is_empty()),
            ) {
                self.tools.insert(
                    index,
                    ToolSlot {
                        id: id.clone(),
                        ended: false,
                    },
                );
                events.push(StreamEvent::ToolCallStart { id, name });
            }

            if let Some(arguments) = arguments.filter(|a| !a.is_empty()) {
                let id = match self.tools.get(&index) {
                    Some(slot) => slot.id.clone(),
                    None => {
                        // Kept as an empty id; correlating it later is left to the consumer.
                        warn!(
                            "OpenAI tool-call arguments for unregistered index {}; emitting empty id",
                            index
                        );
                        String::new()
                    }
                };
                events.push(StreamEvent::ToolCallDelta {
                    id,
                    args_chunk: arguments,
                });
            }
        }

        events
    }

    fn done(&mut self) -> Vec<StreamEvent> {
        self.finished = true;
        vec![StreamEvent::Done {
            stop_reason: self.finish_reason.clone(),
        }]
    }
}

impl Default for OpenAiParser {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameParser for OpenAiParser {
    fn parse_frame(&mut self, frame: &Frame) -> Vec<StreamEvent> {
        if self.finished {
            return Vec::new();
        }
        if frame.data == DONE_SENTINEL {
            return self.done();
        }

        parse_object(&frame.data)
            .and_then(decode_payload::<ChatChunk>)
            .map(|chunk| self.on_chunk(chunk))
            .unwrap_or_default()
    }

    fn is_finished(&self) -> bool {
        self.finished
    }

    fn on_exhausted(&mut self) -> Vec<StreamEvent> {
        if self.finished {
            return Vec::new();
        }
        self.done()
    }
}
