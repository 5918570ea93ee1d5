//! SSE line parsing and the stateful event accumulator.

use crate::sse::events::{SseLine, StreamEvent, DEFAULT_EVENT_TYPE};

/// Split `field: value`, dropping a single leading space from the value.
fn field_value<'a>(line: &'a str, field: &str) -> Option<&'a str> {
    let rest = line.strip_prefix(field)?.strip_prefix(':')?;
    Some(rest.strip_prefix(' ').unwrap_or(rest))
}

/// Parse a single SSE line into its component type
pub fn parse_sse_line(line: &str) -> SseLine {
    if line.is_empty() {
        return SseLine::Empty;
    }

    if let Some(stripped) = line.strip_prefix(':') {
        return SseLine::Comment(stripped.trim().to_string());
    }

    if let Some(value) = field_value(line, "id") {
        return SseLine::Id(value.to_string());
    }

    if let Some(value) = field_value(line, "event") {
        return SseLine::Event(value.to_string());
    }

    if let Some(value) = field_value(line, "data") {
        return SseLine::Data(value.to_string());
    }

    // retry and unknown fields
    SseLine::Comment(line.to_string())
}

/// Stateful SSE parser that accumulates lines and emits complete events
#[derive(Debug, Default)]
pub struct SseParser {
    current_id: Option<String>,
    current_event_type: Option<String>,
    /// SSE allows multiple data: lines
    data_buffer: Vec<String>,
}

impl SseParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a line to the parser, returning an event when a blank line
    /// completes one.
    pub fn feed_line(&mut self, line: &str) -> Option<StreamEvent> {
        match parse_sse_line(line) {
            SseLine::Id(id) => {
                self.current_id = Some(id);
                None
            }
            SseLine::Event(event_type) => {
                self.current_event_type = Some(event_type);
                None
            }
            SseLine::Data(data) => {
                self.data_buffer.push(data);
                None
            }
            SseLine::Empty => self.try_emit_event(),
            SseLine::Comment(_) => None,
        }
    }

    fn try_emit_event(&mut self) -> Option<StreamEvent> {
        if self.current_id.is_none()
            && self.current_event_type.is_none()
            && self.data_buffer.is_empty()
        {
            return None;
        }

        let event = StreamEvent {
            id: self.current_id.take(),
            event_type: self
                .current_event_type
                .take()
                .unwrap_or_else(|| DEFAULT_EVENT_TYPE.to_string()),
            data: self.data_buffer.join("\n"),
        };
        self.data_buffer.clear();
        Some(event)
    }

    /// Whether a partial event is pending.
    pub fn has_pending(&self) -> bool {
        self.current_id.is_some() || self.current_event_type.is_some() || !self.data_buffer.is_empty()
    }

    pub fn reset(&mut self) {
        self.current_id = None;
        self.current_event_type = None;
        self.data_buffer.clear();
    }
}
