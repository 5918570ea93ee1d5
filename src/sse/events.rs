//! SSE line and event types for the platform live stream.

/// Event types that carry no user payload.
pub const CONTROL_EVENT_TYPES: [&str; 2] = ["heartbeat", "connected"];

/// Event type used when the server sends none.
pub const DEFAULT_EVENT_TYPE: &str = "message";

/// Represents a parsed SSE line
#[derive(Debug, Clone, PartialEq)]
pub enum SseLine {
    /// Cursor token (e.g., "id: 1690000000000-0")
    Id(String),
    /// Event type declaration (e.g., "event: create")
    Event(String),
    /// Data payload (e.g., "data: {\"data\": {...}}")
    Data(String),
    /// Empty line - signals end of event
    Empty,
    /// Comment line (starts with ':') or an ignored field such as `retry`
    Comment(String),
}

/// One event received from the live stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamEvent {
    /// Server-assigned cursor token, `<timestamp>-<sequence>`.
    pub id: Option<String>,
    pub event_type: String,
    /// Raw payload, multiple `data:` lines joined by `\n`.
    pub data: String,
}

impl StreamEvent {
    pub fn new(
        id: impl Into<String>,
        event_type: impl Into<String>,
        data: impl Into<String>,
    ) -> Self {
        Self {
            id: Some(id.into()),
            event_type: event_type.into(),
            data: data.into(),
        }
    }

    /// Heartbeats and connection notices.
    pub fn is_control(&self) -> bool {
        CONTROL_EVENT_TYPES.contains(&self.event_type.as_str())
    }

    /// Payload parsed as JSON.
    pub fn json(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::from_str(&self.data)
    }
}

/// Errors that can occur while decoding the byte stream
#[derive(Debug, Clone, PartialEq)]
pub enum SseParseError {
    /// A complete line was not valid UTF-8
    InvalidUtf8(String),
    /// A line grew past the decoder limit without a newline
    LineTooLong { limit: usize },
}

impl std::fmt::Display for SseParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SseParseError::InvalidUtf8(msg) => write!(f, "Invalid UTF-8 in SSE line: {}", msg),
            SseParseError::LineTooLong { limit } => {
                write!(f, "SSE line exceeds {} bytes", limit)
            }
        }
    }
}

impl std::error::Error for SseParseError {}
