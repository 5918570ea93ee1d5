//! Scripted [`HttpClient`] for stream and download tests.

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream;
use std::sync::{Arc, Mutex};

use crate::traits::{ByteStream, Headers, HttpClient, HttpError, Response};

/// One request seen by the mock.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    /// `GET` or `GET_STREAM`
    pub method: String,
    pub url: String,
    pub headers: Headers,
}

/// What the mock answers with.
#[derive(Debug, Clone)]
pub enum MockResponse {
    Success(Response),
    /// Fails before any body is produced.
    Error(HttpError),
    /// Body items yielded in order, then end of stream.
    Stream(Vec<Result<Bytes, HttpError>>),
}

impl MockResponse {
    /// Stream body made of successful chunks, e.g. SSE frames.
    pub fn chunks<I, B>(chunks: I) -> Self
    where
        I: IntoIterator<Item = B>,
        B: Into<Bytes>,
    {
        MockResponse::Stream(chunks.into_iter().map(|c| Ok(c.into())).collect())
    }

    fn into_stream(self) -> Result<ByteStream, HttpError> {
        match self {
            MockResponse::Stream(items) => Ok(Box::pin(stream::iter(items))),
            MockResponse::Success(response) if response.is_success() => {
                Ok(Box::pin(stream::iter(vec![Ok(response.body)])))
            }
            MockResponse::Success(response) => Err(HttpError::ServerError {
                status: response.status,
                message: response.text().unwrap_or_default(),
            }),
            MockResponse::Error(err) => Err(err),
        }
    }

    fn into_buffered(self) -> Result<Response, HttpError> {
        match self {
            MockResponse::Success(response) => Ok(response),
            MockResponse::Error(err) => Err(err),
            MockResponse::Stream(_) => Err(HttpError::Other(
                "streamed mock response requested as buffered".to_string(),
            )),
        }
    }
}

/// Answers by URL (exact match, then prefix, then the default) and records
/// every request.
///
/// ```ignore
/// let http = Arc::new(MockHttpClient::new());
/// http.set_default_response(MockResponse::chunks(["id: 1-0\nevent: heartbeat\n\n"]));
/// // ... run a StreamConnector over it ...
/// assert!(http.get_requests()[0].url.contains("from=0-0"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct MockHttpClient {
    routes: Arc<Mutex<Vec<(String, MockResponse)>>>,
    fallback: Arc<Mutex<Option<MockResponse>>>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl MockHttpClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `url`, or any URL it prefixes. Replaces an earlier route for
    /// the same URL.
    pub fn set_response(&self, url: &str, response: MockResponse) {
        let mut routes = self.routes.lock().unwrap();
        routes.retain(|(route, _)| route != url);
        routes.push((url.to_string(), response));
    }

    pub fn set_default_response(&self, response: MockResponse) {
        *self.fallback.lock().unwrap() = Some(response);
    }

    pub fn get_requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn clear_requests(&self) {
        self.requests.lock().unwrap().clear();
    }

    fn answer(&self, method: &str, url: &str, headers: &Headers) -> Result<MockResponse, HttpError> {
        self.requests.lock().unwrap().push(RecordedRequest {
            method: method.to_string(),
            url: url.to_string(),
            headers: headers.clone(),
        });

        let routes = self.routes.lock().unwrap();
        let routed = routes
            .iter()
            .find(|(route, _)| route == url)
            .or_else(|| routes.iter().find(|(route, _)| url.starts_with(route.as_str())))
            .map(|(_, response)| response.clone());

        routed
            .or_else(|| self.fallback.lock().unwrap().clone())
            .ok_or_else(|| HttpError::Other(format!("no mock response for {}", url)))
    }
}

#[async_trait]
impl HttpClient for MockHttpClient {
    async fn get(&self, url: &str, headers: &Headers) -> Result<Response, HttpError> {
        self.answer("GET", url, headers)?.into_buffered()
    }

    async fn get_stream(&self, url: &str, headers: &Headers) -> Result<ByteStream, HttpError> {
        self.answer("GET_STREAM", url, headers)?.into_stream()
    }
}
