//! Byte-chunk to event decoding.
//!
//! Chunks from the HTTP body arrive at arbitrary boundaries, including in
//! the middle of a multi-byte character, so lines are buffered as bytes and
//! only converted once complete.

use tracing::debug;

use crate::sse::events::{SseParseError, StreamEvent};
use crate::sse::parser::SseParser;

/// Longest line accepted before the stream is considered broken.
pub const MAX_LINE_BYTES: usize = 16 * 1024 * 1024;

#[derive(Debug)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    /// Prefix of `buffer` already known to hold no line break.
    scanned: usize,
    parser: SseParser,
    max_line: usize,
}

impl Default for SseDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::with_max_line(MAX_LINE_BYTES)
    }

    pub fn with_max_line(max_line: usize) -> Self {
        Self {
            buffer: Vec::new(),
            scanned: 0,
            parser: SseParser::new(),
            max_line,
        }
    }

    /// Feed one chunk, returning every event it completes.
    pub fn feed(&mut self, chunk: &[u8]) -> Result<Vec<StreamEvent>, SseParseError> {
        self.buffer.extend_from_slice(chunk);

        let mut events = Vec::new();
        let mut start = 0;
        let mut from = self.scanned;
        while let Some(pos) = self.buffer[from..].iter().position(|b| *b == b'\n') {
            let end = from + pos;
            let line = decode_line(&self.buffer[start..end])?;
            if let Some(event) = self.parser.feed_line(line) {
                events.push(event);
            }
            start = end + 1;
            from = start;
        }
        self.buffer.drain(..start);
        self.scanned = self.buffer.len();

        if self.buffer.len() > self.max_line {
            return Err(SseParseError::LineTooLong {
                limit: self.max_line,
            });
        }
        Ok(events)
    }

    /// End of stream. An event without its closing blank line is
    /// incomplete and is discarded, never dispatched. Returns how many
    /// bytes of partial input were dropped.
    pub fn finish(&mut self) -> usize {
        let dropped = self.buffer.len();
        if dropped > 0 || self.parser.has_pending() {
            debug!("Discarding unterminated event at end of stream ({} bytes)", dropped);
        }
        self.buffer.clear();
        self.scanned = 0;
        self.parser.reset();
        dropped
    }
}

fn decode_line(bytes: &[u8]) -> Result<&str, SseParseError> {
    let line = std::str::from_utf8(bytes).map_err(|e| SseParseError::InvalidUtf8(e.to_string()))?;
    Ok(line.strip_suffix('\r').unwrap_or(line))
}
