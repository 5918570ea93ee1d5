//! SSE (Server-Sent Events) decoding for the platform live stream.
//!
//! SSE format consists of:
//! - `id: <cursor>` - event id (`<timestamp>-<sequence>`)
//! - `event: <type>` - event type line
//! - `data: <json>` - data payload line
//! - Empty line - signals end of event
//! - Lines starting with `:` - comments (ignored)
//!
//! # Module structure
//! - `events` - StreamEvent, SseLine, SseParseError
//! - `parser` - line parsing and the stateful SseParser
//! - `decoder` - byte chunks to events

mod decoder;
mod events;
mod parser;

pub use decoder::{SseDecoder, MAX_LINE_BYTES};
pub use events::{SseLine, SseParseError, StreamEvent, CONTROL_EVENT_TYPES, DEFAULT_EVENT_TYPE};
pub use parser::{parse_sse_line, SseParser};
