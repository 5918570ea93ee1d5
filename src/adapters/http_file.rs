//! File download over HTTP.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tracing::debug;

use crate::traits::{FileApi, Headers, HttpClient, HttpError, PlatformError};

/// [`FileApi`] backed by an [`HttpClient`] with bearer authentication.
#[derive(Clone)]
pub struct HttpFileFetcher {
    http: Arc<dyn HttpClient>,
    token: String,
}

impl HttpFileFetcher {
    pub fn new(http: Arc<dyn HttpClient>, token: impl Into<String>) -> Self {
        Self {
            http,
            token: token.into(),
        }
    }

    fn headers(&self, binary: bool) -> Headers {
        let mut headers = Headers::new();
        headers.insert(
            "authorization".to_string(),
            format!("Bearer {}", self.token),
        );
        let accept = if binary {
            "application/octet-stream"
        } else {
            "text/plain"
        };
        headers.insert("accept".to_string(), accept.to_string());
        headers
    }
}

impl std::fmt::Debug for HttpFileFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpFileFetcher").finish_non_exhaustive()
    }
}

fn to_platform_error(err: HttpError) -> PlatformError {
    match err {
        HttpError::ServerError { status, message } => PlatformError::Rejected { status, message },
        other => PlatformError::Request(other.to_string()),
    }
}

#[async_trait]
impl FileApi for HttpFileFetcher {
    async fn fetch_file(&self, uri: &str, binary: bool) -> Result<Bytes, PlatformError> {
        let response = self
            .http
            .get(uri, &self.headers(binary))
            .await
            .map_err(to_platform_error)?;

        if !response.is_success() {
            return Err(PlatformError::Rejected {
                status: response.status,
                message: response.text().unwrap_or_default(),
            });
        }
        if !binary && std::str::from_utf8(&response.body).is_err() {
            return Err(PlatformError::Decode(format!(
                "{} is not valid UTF-8 text",
                uri
            )));
        }

        debug!("Fetched {} ({} bytes)", uri, response.body.len());
        Ok(response.body)
    }
}
