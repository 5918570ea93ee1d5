//! HTTP seam used by the live stream and file downloads.

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use std::collections::HashMap;
use std::pin::Pin;

/// Request or response headers. Names are stored lower-case.
pub type Headers = HashMap<String, String>;

/// Body of a response that is consumed incrementally.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, HttpError>> + Send>>;

/// Fully buffered response.
#[derive(Debug, Clone)]
pub struct Response {
    pub status: u16,
    pub headers: Headers,
    pub body: Bytes,
}

impl Response {
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers: Headers::new(),
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn text(&self) -> Result<String, std::string::FromUtf8Error> {
        String::from_utf8(self.body.to_vec())
    }
}

/// Transport-level failure.
#[derive(Debug, Clone, thiserror::Error)]
pub enum HttpError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),
    #[error("Request timeout: {0}")]
    Timeout(String),
    /// Non-2xx status on a request that expects success.
    #[error("Server error ({status}): {message}")]
    ServerError { status: u16, message: String },
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
    #[error("TLS error: {0}")]
    Tls(String),
    #[error("HTTP error: {0}")]
    Other(String),
}

/// GET-only client; the platform live stream and file store need nothing else.
///
/// Implemented by [`ReqwestHttpClient`](crate::adapters::ReqwestHttpClient)
/// and [`MockHttpClient`](crate::adapters::mock::MockHttpClient).
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// GET with the whole body buffered. Any status is returned as a
    /// [`Response`].
    async fn get(&self, url: &str, headers: &Headers) -> Result<Response, HttpError>;

    /// GET returning the body as it arrives, for feeds that never complete.
    /// A non-2xx status is returned as [`HttpError::ServerError`].
    async fn get_stream(&self, url: &str, headers: &Headers) -> Result<ByteStream, HttpError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_range() {
        assert!(Response::new(204, Bytes::new()).is_success());
        assert!(!Response::new(304, Bytes::new()).is_success());
        assert!(!Response::new(404, Bytes::new()).is_success());
    }

    #[test]
    fn test_error_messages_carry_status() {
        let err = HttpError::ServerError {
            status: 401,
            message: "Unauthorized".to_string(),
        };
        assert_eq!(err.to_string(), "Server error (401): Unauthorized");
        assert_eq!(
            HttpError::Tls("no roots".to_string()).to_string(),
            "TLS error: no roots"
        );
    }
}
