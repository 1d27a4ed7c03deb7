use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures_util::stream::{FusedStream, Stream};
use futures_util::StreamExt;
use tracing::debug;

use super::decode::FrameDecoder;
use super::Frame;
use crate::error::StreamError;

/// Lazy SSE frame stream over a chunked byte source.
///
/// The source is held until it ends, fails, or the reader is dropped, and is
/// released exactly once on whichever happens first. Nothing is read from the
/// source until the consumer polls for the next frame.
pub struct FrameReader<S> {
    source: Option<Pin<Box<S>>>,
    decoder: FrameDecoder,
    ready: VecDeque<Frame>,
}

impl<S> FrameReader<S> {
    pub fn new(source: S) -> Self {
        Self::from_optional(Some(source))
    }

    /// A missing body reads as an empty frame sequence.
    pub fn from_optional(source: Option<S>) -> Self {
        Self {
            source: source.map(Box::pin),
            decoder: FrameDecoder::new(),
            ready: VecDeque::new(),
        }
    }

    /// Whether the byte source is still held.
    pub fn is_attached(&self) -> bool {
        self.source.is_some()
    }

    fn release(&mut self) {
        if self.source.take().is_some() {
            debug!("SSE byte source released");
        }
    }
}

impl<S> Drop for FrameReader<S> {
    fn drop(&mut self) {
        self.release();
    }
}

impl<S, B, E> Stream for FrameReader<S>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    E: Into<StreamError>,
{
    type Item = Result<Frame, StreamError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        loop {
            if let Some(frame) = this.ready.pop_front() {
                return Poll::Ready(Some(Ok(frame)));
            }

            let Some(source) = this.source.as_mut() else {
                return Poll::Ready(None);
            };

            match source.poll_next_unpin(cx) {
                Poll::Pending => return Poll::Pending,
                Poll::Ready(Some(Ok(chunk))) => {
                    let frames = this.decoder.feed(chunk.as_ref());
                    this.ready.extend(frames);
                }
                Poll::Ready(Some(Err(err))) => {
                    this.release();
                    return Poll::Ready(Some(Err(err.into())));
                }
                Poll::Ready(None) => {
                    this.release();
                    this.ready.extend(this.decoder.finish());
                }
            }
        }
    }
}

impl<S, B, E> FusedStream for FrameReader<S>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    E: Into<StreamError>,
{
    fn is_terminated(&self) -> bool {
        self.source.is_none() && self.ready.is_empty()
    }
}
