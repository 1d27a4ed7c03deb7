use std::time::Duration;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, StreamError>;

/// Failures surfaced by the frame reader, the event streams and their helpers.
///
/// Malformed frames are not errors: the parsers skip them.
#[derive(Debug, Error)]
pub enum StreamError {
    /// The HTTP body failed mid-stream.
    #[error("http stream error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Any other byte-source failure, carried as its display text.
    #[error("stream source error: {0}")]
    Source(String),

    #[error("stream idle for {}s without data", .0.as_secs())]
    IdleTimeout(Duration),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl StreamError {
    pub fn source_error(err: impl std::fmt::Display) -> Self {
        StreamError::Source(err.to_string())
    }
}

/// Lets byte sources with boxed errors feed a `FrameReader` directly.
impl From<Box<dyn std::error::Error + Send + Sync>> for StreamError {
    fn from(err: Box<dyn std::error::Error + Send + Sync>) -> Self {
        StreamError::source_error(err)
    }
}
