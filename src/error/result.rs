//! Result type alias for connector operations.

use super::connector_error::ConnectorError;
use super::context::ErrorContext;

/// Type alias for Results using ConnectorError.
pub type ConnectorResult<T> = Result<T, ConnectorError>;

/// Extension trait for Result types to add context to errors.
pub trait ResultExt<T> {
    /// Add context to an error if the result is Err.
    fn context(self, ctx: ErrorContext) -> ConnectorResult<T>;

    /// Add context using a closure (only called on error).
    fn with_context<F>(self, f: F) -> ConnectorResult<T>
    where
        F: FnOnce() -> ErrorContext;
}

impl<T, E> ResultExt<T> for Result<T, E>
where
    E: Into<ConnectorError>,
{
    fn context(self, ctx: ErrorContext) -> ConnectorResult<T> {
        self.map_err(|e| e.into().with_context(ctx))
    }

    fn with_context<F>(self, f: F) -> ConnectorResult<T>
    where
        F: FnOnce() -> ErrorContext,
    {
        self.map_err(|e| e.into().with_context(f()))
    }
}
