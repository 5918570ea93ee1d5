//! Error context for enriched error information.
//!
//! Context identifies where in a connector cycle a failure happened: the
//! operation, the connector, and the work unit or stream event involved.

use chrono::{DateTime, Utc};

/// Context information attached to errors for debugging.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorContext {
    /// Human-readable description of the operation that failed.
    pub operation: String,

    /// Connector instance the failure belongs to.
    pub connector_id: Option<String>,

    /// Work unit being processed, if any.
    pub work_id: Option<String>,

    /// Stream event being processed, if any.
    pub event_id: Option<String>,

    /// Timestamp when the error occurred.
    pub timestamp: DateTime<Utc>,
}

impl ErrorContext {
    /// Create a new ErrorContext for an operation.
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            connector_id: None,
            work_id: None,
            event_id: None,
            timestamp: Utc::now(),
        }
    }

    pub fn with_connector_id(mut self, connector_id: impl Into<String>) -> Self {
        self.connector_id = Some(connector_id.into());
        self
    }

    pub fn with_work_id(mut self, work_id: impl Into<String>) -> Self {
        self.work_id = Some(work_id.into());
        self
    }

    pub fn with_event_id(mut self, event_id: impl Into<String>) -> Self {
        self.event_id = Some(event_id.into());
        self
    }

    /// Get a formatted context string suitable for logging.
    pub fn to_log_string(&self) -> String {
        let mut parts = vec![format!("operation={}", self.operation)];

        if let Some(ref connector_id) = self.connector_id {
            parts.push(format!("connector_id={}", connector_id));
        }

        if let Some(ref work_id) = self.work_id {
            parts.push(format!("work_id={}", work_id));
        }

        if let Some(ref event_id) = self.event_id {
            parts.push(format!("event_id={}", event_id));
        }

        parts.push(format!("timestamp={}", self.timestamp.to_rfc3339()));

        parts.join(" ")
    }
}

impl Default for ErrorContext {
    fn default() -> Self {
        Self::new("unknown")
    }
}

impl std::fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.operation)?;

        if let Some(ref work_id) = self.work_id {
            write!(f, " work={}", work_id)?;
        }

        if let Some(ref event_id) = self.event_id {
            write!(f, " event={}", event_id)?;
        }

        Ok(())
    }
}
