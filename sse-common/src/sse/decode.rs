//! Synchronous SSE decoding: bytes in, frames out.
//!
//! `FrameDecoder` is fed raw chunks exactly as they arrive from the network and
//! keeps whatever is incomplete (a split codepoint, a partial line, an open
//! frame) until the next chunk. The async `FrameReader` is a thin pull loop
//! around it.

use super::Frame;

// ============================================================================
// Utf8Decoder — carries a split codepoint across chunks
// ============================================================================

#[derive(Debug, Default)]
struct Utf8Decoder {
    pending: Vec<u8>,
}

impl Utf8Decoder {
    /// Decode as much of `pending + chunk` as possible. Invalid sequences become
    /// U+FFFD; an incomplete sequence at the very end is held back.
    fn decode(&mut self, chunk: &[u8]) -> String {
        let mut bytes = std::mem::take(&mut self.pending);
        bytes.extend_from_slice(chunk);

        let mut out = String::with_capacity(bytes.len());
        let mut rest = bytes.as_slice();
        loop {
            match std::str::from_utf8(rest) {
                Ok(valid) => {
                    out.push_str(valid);
                    break;
                }
                Err(err) => {
                    let (valid, after) = rest.split_at(err.valid_up_to());
                    out.push_str(&String::from_utf8_lossy(valid));
                    match err.error_len() {
                        Some(len) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            rest = &after[len..];
                        }
                        None => {
                            self.pending = after.to_vec();
                            break;
                        }
                    }
                }
            }
        }
        out
    }
}

// ============================================================================
// FrameDecoder — line splitting and field accumulation
// ============================================================================

#[derive(Debug, Default)]
pub struct FrameDecoder {
    utf8: Utf8Decoder,
    /// Text after the last `\n` seen so far.
    partial_line: String,
    event: String,
    data: String,
    has_data: bool,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a byte chunk and return every frame it completes.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<Frame> {
        let text = self.utf8.decode(chunk);
        self.partial_line.push_str(&text);

        let buffer = std::mem::take(&mut self.partial_line);
        let mut frames = Vec::new();
        let mut start = 0;
        while let Some(offset) = buffer[start..].find('\n') {
            let end = start + offset;
            if let Some(frame) = self.process_line(&buffer[start..end]) {
                frames.push(frame);
            }
            start = end + 1;
        }
        self.partial_line = buffer[start..].to_string();

        frames
    }

    /// End of input. An unterminated last line is dropped; a frame that already
    /// holds data is emitted.
    pub fn finish(&mut self) -> Option<Frame> {
        self.partial_line.clear();
        self.utf8.pending.clear();
        self.dispatch()
    }

    fn process_line(&mut self, line: &str) -> Option<Frame> {
        let line = line.strip_suffix('\r').unwrap_or(line);

        if line.is_empty() {
            return self.dispatch();
        }
        if line.starts_with(':') {
            return None;
        }

        if let Some(value) = line.strip_prefix("event:") {
            self.event = value.trim().to_string();
        } else if let Some(value) = line.strip_prefix("data:") {
            let value = value.strip_prefix(' ').unwrap_or(value);
            if self.has_data {
                self.data.push('\n');
            }
            self.data.push_str(value);
            self.has_data = true;
        }
        // id:, retry: and unknown fields are not surfaced.

        None
    }

    fn dispatch(&mut self) -> Option<Frame> {
        let event = std::mem::take(&mut self.event);
        let data = std::mem::take(&mut self.data);
        if !std::mem::take(&mut self.has_data) {
            return None;
        }
        Some(Frame { event, data })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn utf8_codepoint_split_across_chunks() {
        let mut decoder = Utf8Decoder::default();
        let bytes = "héllo".as_bytes();
        // 'é' is two bytes starting at offset 1
        assert_eq!(decoder.decode(&bytes[..2]), "h");
        assert_eq!(decoder.pending.len(), 1);
        assert_eq!(decoder.decode(&bytes[2..]), "éllo");
        assert!(decoder.pending.is_empty());
    }

    #[test]
    fn utf8_four_byte_codepoint_one_byte_at_a_time() {
        let mut decoder = Utf8Decoder::default();
        let mut out = String::new();
        for byte in "a🦀b".as_bytes() {
            out.push_str(&decoder.decode(std::slice::from_ref(byte)));
        }
        assert_eq!(out, "a🦀b");
    }

    #[test]
    fn utf8_invalid_byte_is_replaced() {
        let mut decoder = Utf8Decoder::default();
        assert_eq!(decoder.decode(b"a\xffb"), "a\u{FFFD}b");
        assert!(decoder.pending.is_empty());
    }

    #[test]
    fn event_name_without_data_is_reset_at_boundary() {
        let mut decoder = FrameDecoder::new();
        let frames = decoder.feed(b"event: ping\n\ndata: x\n\n");
        assert_eq!(frames, vec![Frame::new("", "x")]);
    }

    #[test]
    fn finish_discards_unterminated_line() {
        let mut decoder = FrameDecoder::new();
        assert!(decoder.feed(b"data: complete\ndata: partial").is_empty());
        assert_eq!(decoder.finish(), Some(Frame::new("", "complete")));
        assert_eq!(decoder.finish(), None);
    }
}
