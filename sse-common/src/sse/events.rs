//! Pull-based driver that runs a vendor state machine over a frame stream.

use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures_util::stream::{FusedStream, Stream};
use futures_util::StreamExt;

use super::anthropic::AnthropicParser;
use super::openai::OpenAiParser;
use super::{Frame, StreamEvent, Vendor};
use crate::error::StreamError;

/// Per-vendor state machine turning frames into unified events.
pub trait FrameParser {
    /// Handle one frame. Frames that do not decode produce no events.
    fn parse_frame(&mut self, frame: &Frame) -> Vec<StreamEvent>;

    /// True once a terminal frame was handled; no further frames are read.
    fn is_finished(&self) -> bool;

    /// The frame source ended before a terminal frame.
    fn on_exhausted(&mut self) -> Vec<StreamEvent>;
}

// ============================================================================
// EventParser — runtime vendor selection
// ============================================================================

#[derive(Debug)]
pub enum EventParser {
    Anthropic(AnthropicParser),
    OpenAi(OpenAiParser),
}

impl EventParser {
    pub fn for_vendor(vendor: Vendor) -> Self {
        match vendor {
            Vendor::Anthropic => EventParser::Anthropic(AnthropicParser::new()),
            Vendor::OpenAi => EventParser::OpenAi(OpenAiParser::new()),
        }
    }
}

impl FrameParser for EventParser {
    fn parse_frame(&mut self, frame: &Frame) -> Vec<StreamEvent> {
        match self {
            EventParser::Anthropic(parser) => parser.parse_frame(frame),
            EventParser::OpenAi(parser) => parser.parse_frame(frame),
        }
    }

    fn is_finished(&self) -> bool {
        match self {
            EventParser::Anthropic(parser) => parser.is_finished(),
            EventParser::OpenAi(parser) => parser.is_finished(),
        }
    }

    fn on_exhausted(&mut self) -> Vec<StreamEvent> {
        match self {
            EventParser::Anthropic(parser) => parser.on_exhausted(),
            EventParser::OpenAi(parser) => parser.on_exhausted(),
        }
    }
}

// ============================================================================
// EventStream
// ============================================================================

/// Unified event stream. Polling it pulls frames (and, underneath, bytes) only
/// as far as needed to produce the next event.
///
/// The frame stream is dropped as soon as the parser finishes, the frames run
/// out, or a frame error is yielded. An error item is always the last item.
pub struct EventStream<S, P> {
    frames: Option<S>,
    parser: P,
    pending: VecDeque<StreamEvent>,
}

impl<S, P> EventStream<S, P> {
    pub fn new(frames: S, parser: P) -> Self {
        Self {
            frames: Some(frames),
            parser,
            pending: VecDeque::new(),
        }
    }

    pub fn parser(&self) -> &P {
        &self.parser
    }
}

impl<S, P> Stream for EventStream<S, P>
where
    S: Stream<Item = Result<Frame, StreamError>> + Unpin,
    P: FrameParser + Unpin,
{
    type Item = Result<StreamEvent, StreamError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        loop {
            if let Some(event) = this.pending.pop_front() {
                return Poll::Ready(Some(Ok(event)));
            }

            let Some(frames) = this.frames.as_mut() else {
                return Poll::Ready(None);
            };

            match frames.poll_next_unpin(cx) {
                Poll::Pending => return Poll::Pending,
                Poll::Ready(Some(Ok(frame))) => {
                    let events = this.parser.parse_frame(&frame);
                    this.pending.extend(events);
                    if this.parser.is_finished() {
                        this.frames = None;
                    }
                }
                Poll::Ready(Some(Err(err))) => {
                    this.frames = None;
                    return Poll::Ready(Some(Err(err)));
                }
                Poll::Ready(None) => {
                    this.frames = None;
                    let events = this.parser.on_exhausted();
                    this.pending.extend(events);
                }
            }
        }
    }
}

impl<S, P> FusedStream for EventStream<S, P>
where
    S: Stream<Item = Result<Frame, StreamError>> + Unpin,
    P: FrameParser + Unpin,
{
    fn is_terminated(&self) -> bool {
        self.frames.is_none() && self.pending.is_empty()
    }
}

pub fn anthropic_events<S>(frames: S) -> EventStream<S, AnthropicParser>
where
    S: Stream<Item = Result<Frame, StreamError>> + Unpin,
{
    EventStream::new(frames, AnthropicParser::new())
}

pub fn openai_events<S>(frames: S) -> EventStream<S, OpenAiParser>
where
    S: Stream<Item = Result<Frame, StreamError>> + Unpin,
{
    EventStream::new(frames, OpenAiParser::new())
}

pub fn vendor_events<S>(vendor: Vendor, frames: S) -> EventStream<S, EventParser>
where
    S: Stream<Item = Result<Frame, StreamError>> + Unpin,
{
    EventStream::new(frames, EventParser::for_vendor(vendor))
}
