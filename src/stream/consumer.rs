//! Live stream connection.
//!
//! Builds the stream URL and headers from the cursor and settings, opens
//! the byte stream through [`HttpClient`] and decodes it into events.

use std::collections::VecDeque;
use std::sync::Arc;

use futures_util::StreamExt;
use tracing::{info, warn};

use crate::config::{ConnectorConfig, StreamSettings};
use crate::error::{ConnectorError, ConnectorResult};
use crate::sse::{SseDecoder, StreamEvent};
use crate::stream::cursor::StreamCursor;
use crate::traits::{ByteStream, Headers, HttpClient};

/// Opens the platform live stream.
pub struct EventStreamConsumer {
    http: Arc<dyn HttpClient>,
    base_url: String,
    token: String,
    settings: StreamSettings,
}

impl EventStreamConsumer {
    pub fn new(
        http: Arc<dyn HttpClient>,
        base_url: impl Into<String>,
        token: impl Into<String>,
        settings: StreamSettings,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
            settings,
        }
    }

    pub fn from_config(http: Arc<dyn HttpClient>, config: &ConnectorConfig) -> Self {
        Self::new(http, config.base_url(), config.token.clone(), config.stream.clone())
    }

    /// `<base>/stream[/<id>]?from=<start_from>&recover=<recover_until>`
    pub fn stream_url(&self, cursor: &StreamCursor) -> String {
        let mut url = format!("{}/stream", self.base_url);
        if let Some(id) = self.settings.live_stream_id.as_deref().filter(|s| !s.is_empty()) {
            url.push('/');
            url.push_str(&urlencoding::encode(id));
        }
        format!(
            "{}?from={}&recover={}",
            url,
            urlencoding::encode(cursor.start_from()),
            urlencoding::encode(cursor.recover_until())
        )
    }

    pub fn headers(&self) -> Headers {
        let mut headers = Headers::new();
        headers.insert(
            "authorization".to_string(),
            format!("Bearer {}", self.token),
        );
        headers.insert(
            "listen-delete".to_string(),
            self.settings.listen_delete.to_string(),
        );
        headers.insert(
            "no-dependencies".to_string(),
            self.settings.no_dependencies.to_string(),
        );
        headers.insert(
            "with-inferences".to_string(),
            self.settings.with_inferences.to_string(),
        );
        headers.insert("accept".to_string(), "text/event-stream".to_string());
        headers
    }

    /// Connect at the cursor position.
    pub async fn open(&self, cursor: &StreamCursor) -> ConnectorResult<EventFeed> {
        let url = self.stream_url(cursor);
        info!(
            "Starting to listen stream events on \"{}\" (listen-delete: {}, no-dependencies: {}, with-inferences: {})",
            url,
            self.settings.listen_delete,
            self.settings.no_dependencies,
            self.settings.with_inferences
        );

        let body = self.http.get_stream(&url, &self.headers()).await?;
        Ok(EventFeed::new(body))
    }
}

/// Decoded events from one open connection.
pub struct EventFeed {
    body: ByteStream,
    decoder: SseDecoder,
    pending: VecDeque<StreamEvent>,
    ended: bool,
}

impl EventFeed {
    pub fn new(body: ByteStream) -> Self {
        Self {
            body,
            decoder: SseDecoder::new(),
            pending: VecDeque::new(),
            ended: false,
        }
    }

    /// Next event, suspending until the server pushes one.
    ///
    /// `None` once the server closed the connection. An event cut off by the
    /// close is never returned.
    pub async fn next_event(&mut self) -> Option<ConnectorResult<StreamEvent>> {
        loop {
            if let Some(event) = self.pending.pop_front() {
                return Some(Ok(event));
            }
            if self.ended {
                return None;
            }

            match self.body.next().await {
                Some(Ok(chunk)) => match self.decoder.feed(&chunk) {
                    Ok(events) => self.pending.extend(events),
                    Err(e) => {
                        self.ended = true;
                        return Some(Err(ConnectorError::from(e)));
                    }
                },
                Some(Err(e)) => {
                    self.ended = true;
                    return Some(Err(ConnectorError::from(e)));
                }
                None => {
                    self.ended = true;
                    let dropped = self.decoder.finish();
                    if dropped > 0 {
                        warn!("Stream closed in the middle of an event, {} bytes dropped", dropped);
                    }
                    return None;
                }
            }
        }
    }
}
