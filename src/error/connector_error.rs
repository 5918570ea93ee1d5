//! Unified error type for connector runtimes.

use thiserror::Error;

use super::category::ErrorCategory;
use super::context::ErrorContext;
use crate::sse::SseParseError;
use crate::traits::{HttpError, PlatformError, StateError};

/// Boxed error returned by user-supplied connector logic.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Unified error type for the connector runtime.
///
/// Nothing in the lifecycle layer propagates these past `issue_call`,
/// `process_broker_message` or the stream loop; they are logged, recorded in
/// state and reported to the work API instead.
#[derive(Debug, Error)]
pub enum ConnectorError {
    /// Inbound broker message did not match the expected shape.
    #[error("Received malformed {kind} message: {message}")]
    InvalidMessage { kind: &'static str, message: String },

    /// Referenced entity is absent.
    #[error("No object found with id '{0}'")]
    EntityNotFound(String),

    /// An entity marking exceeds the configured TLP ceiling.
    #[error("Do not send any data, TLP of the observable is greater than MAX TLP ({entity_id} -> {tlp})")]
    TlpExceeded { entity_id: String, tlp: String },

    /// User logic raised an error.
    #[error("{0}")]
    UserLogic(String),

    #[error("Platform API error: {0}")]
    Platform(#[from] PlatformError),

    #[error("State store error: {0}")]
    State(#[from] StateError),

    #[error("Stream transport error: {0}")]
    Transport(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Wrapped error with additional context.
    #[error("{error} ({context})")]
    WithContext {
        error: Box<ConnectorError>,
        context: ErrorContext,
    },
}

impl ConnectorError {
    /// Wrap a user logic failure.
    pub fn user_logic(err: BoxError) -> Self {
        ConnectorError::UserLogic(err.to_string())
    }

    /// Get the category of this error.
    pub fn category(&self) -> ErrorCategory {
        match self {
            ConnectorError::InvalidMessage { .. } => ErrorCategory::Validation,
            ConnectorError::EntityNotFound(_) => ErrorCategory::Lookup,
            ConnectorError::TlpExceeded { .. } => ErrorCategory::Policy,
            ConnectorError::UserLogic(_) => ErrorCategory::UserLogic,
            ConnectorError::Platform(_) => ErrorCategory::Platform,
            ConnectorError::State(_) => ErrorCategory::State,
            ConnectorError::Transport(_) => ErrorCategory::Transport,
            ConnectorError::Configuration(_) => ErrorCategory::Configuration,
            ConnectorError::Io(_) => ErrorCategory::System,
            ConnectorError::Json(_) => ErrorCategory::Validation,
            ConnectorError::WithContext { error, .. } => error.category(),
        }
    }

    /// Attach context to this error.
    pub fn with_context(self, ctx: ErrorContext) -> Self {
        ConnectorError::WithContext {
            error: Box::new(self),
            context: ctx,
        }
    }

    /// Get the context if this error has one attached.
    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            ConnectorError::WithContext { context, .. } => Some(context),
            _ => None,
        }
    }

    /// Get the inner error without context.
    pub fn inner(&self) -> &ConnectorError {
        match self {
            ConnectorError::WithContext { error, .. } => error.inner(),
            _ => self,
        }
    }

    /// Message reported to the work API: the inner error without context
    /// decoration.
    pub fn report_message(&self) -> String {
        self.inner().to_string()
    }
}

impl From<HttpError> for ConnectorError {
    fn from(err: HttpError) -> Self {
        ConnectorError::Transport(err.to_string())
    }
}

impl From<SseParseError> for ConnectorError {
    fn from(err: SseParseError) -> Self {
        ConnectorError::Transport(err.to_string())
    }
}
