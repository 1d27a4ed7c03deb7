//! High-level helpers over the unified event stream.
//!
//! `events_from_bytes` / `response_events` wire a byte source to the frame
//! reader and a vendor parser. `collect_events` drains the result with an idle
//! timeout and accumulates it into a `StreamResult`.

use bytes::Bytes;
use futures_util::stream::Stream;
use futures_util::StreamExt;
use serde::Serialize;
use serde_json::Value;
use tokio::time::timeout;
use tracing::{info, warn};

use super::events::{vendor_events, EventParser, EventStream};
use super::reader::FrameReader;
use super::{StreamEvent, Vendor};
use crate::config::StreamConfig;
use crate::error::{Result, StreamError};

/// Stop reasons that ask the caller to run tools and send another request.
const TOOL_STOP_REASONS: &[&str] = &["tool_use", "tool_calls"];

// ============================================================================
// Public types
// ============================================================================

#[derive(Debug, Clone, Default, Serialize)]
pub struct StreamResult {
    pub text: String,
    pub tool_calls: Vec<ToolCall>,
    /// `None` when the stream never produced `Done`.
    pub stop_reason: Option<String>,
    pub error: Option<String>,
}

impl StreamResult {
    /// Whether the model stopped to have tools executed.
    pub fn needs_follow_up(&self) -> bool {
        !self.tool_calls.is_empty()
            && self
                .stop_reason
                .as_deref()
                .is_some_and(|reason| TOOL_STOP_REASONS.contains(&reason))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    /// Concatenated argument fragments, raw JSON text.
    pub arguments: String,
    /// Set once `ToolCallEnd` arrived for this id.
    pub complete: bool,
}

impl ToolCall {
    /// Parsed arguments. A call streamed without argument fragments takes `{}`.
    pub fn input(&self) -> std::result::Result<Value, serde_json::Error> {
        if self.arguments.trim().is_empty() {
            return Ok(Value::Object(Default::default()));
        }
        serde_json::from_str(&self.arguments)
    }
}

// ============================================================================
// StreamAccumulator
// ============================================================================

/// Folds unified events into a `StreamResult`.
#[derive(Debug, Default)]
pub struct StreamAccumulator {
    text: String,
    tool_calls: Vec<ToolCall>,
    stop_reason: Option<String>,
    error: Option<String>,
}

impl StreamAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn process(&mut self, event: StreamEvent) {
        match event {
            StreamEvent::Text { text } => {
                self.text.push_str(&text);
            }
            StreamEvent::ToolCallStart { id, name } => {
                self.tool_calls.push(ToolCall {
                    id,
                    name,
                    arguments: String::new(),
                    complete: false,
                });
            }
            StreamEvent::ToolCallDelta { id, args_chunk } => match self.find_tool_call_mut(&id) {
                Some(call) => call.arguments.push_str(&args_chunk),
                None => warn!(
                    "Dropping {} bytes of tool arguments for unknown call id {:?}",
                    args_chunk.len(),
                    id
                ),
            },
            StreamEvent::ToolCallEnd { id } => {
                if let Some(call) = self.find_tool_call_mut(&id) {
                    call.complete = true;
                }
            }
            StreamEvent::Done { stop_reason } => {
                self.stop_reason = Some(stop_reason);
            }
            StreamEvent::Error { message } => {
                self.error = Some(message);
            }
        }
    }

    pub fn has_content(&self) -> bool {
        !self.text.is_empty() || !self.tool_calls.is_empty()
    }

    // Most recent call wins when a vendor reuses an id.
    fn find_tool_call_mut(&mut self, id: &str) -> Option<&mut ToolCall> {
        self.tool_calls.iter_mut().rfind(|call| call.id == id)
    }

    pub fn into_result(self) -> StreamResult {
        StreamResult {
            text: self.text,
            tool_calls: self.tool_calls,
            stop_reason: self.stop_reason,
            error: self.error,
        }
    }
}

// ============================================================================
// Byte source → events
// ============================================================================

pub type ByteEventStream<S> = EventStream<FrameReader<S>, EventParser>;

/// Unified events over any chunked byte source.
pub fn events_from_bytes<S, B, E>(vendor: Vendor, bytes: S) -> ByteEventStream<S>
where
    S: Stream<Item = std::result::Result<B, E>>,
    B: AsRef<[u8]>,
    E: Into<StreamError>,
{
    vendor_events(vendor, FrameReader::new(bytes))
}

/// Unified events over a streamed HTTP response body. Status handling stays
/// with the caller.
pub fn response_events(
    vendor: Vendor,
    response: reqwest::Response,
) -> ByteEventStream<impl Stream<Item = reqwest::Result<Bytes>>> {
    events_from_bytes(vendor, response.bytes_stream())
}

/// Drain an event stream into a `StreamResult`.
///
/// If no event arrives within the idle timeout, whatever was received so far is
/// returned; a stream that produced nothing at all fails with `IdleTimeout`.
pub async fn collect_events<S>(mut events: S, config: &StreamConfig) -> Result<StreamResult>
where
    S: Stream<Item = Result<StreamEvent>> + Unpin,
{
    let idle = config.idle_timeout();
    let mut acc = StreamAccumulator::new();

    loop {
        match timeout(idle, events.next()).await {
            Ok(Some(Ok(event))) => acc.process(event),
            Ok(Some(Err(err))) => return Err(err),
            Ok(None) => break,
            Err(_) => {
                if acc.has_content() {
                    warn!("SSE stream idle for {:?}; returning partial response", idle);
                    break;
                }
                return Err(StreamError::IdleTimeout(idle));
            }
        }
    }

    let result = acc.into_result();
    info!(
        "SSE stream finished: {} chars, {} tool calls, stop_reason={:?}",
        result.text.len(),
        result.tool_calls.len(),
        result.stop_reason
    );
    Ok(result)
}
