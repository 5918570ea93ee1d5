//! Live stream connector.
//!
//! One task reads the feed and runs user logic per event, strictly in
//! order. A [`LivenessMonitor`] task watches the event flow through a
//! capacity-1 queue. There is no reconnection: when the connection drops
//! the connector returns and the host process is expected to restart it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, error, info, warn, Instrument};

use super::lifecycle::{BundleTarget, Lifecycle, Platform};
use super::{Connector, StreamRunner};
use crate::config::ConnectorConfig;
use crate::context::RuntimeContext;
use crate::error::{ConnectorError, ErrorContext};
use crate::models::ConnectorType;
use crate::state::ConnectorState;
use crate::stream::liveness::DEFAULT_CHECK_INTERVAL;
use crate::stream::{EventStreamConsumer, LivenessMonitor, LivenessSender, StreamCursor};
use crate::traits::HttpClient;

/// Why the stream loop returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamExit {
    /// The stop signal was observed.
    Stopped,
    /// The server closed the connection.
    Ended,
    /// User logic failed on an event.
    UserError(String),
    /// Connecting or reading the feed failed.
    Transport(String),
    /// Cursor state could not be read or written.
    State(String),
}

impl StreamExit {
    /// `Stopped` is the only exit a host should not restart from.
    pub fn is_clean(&self) -> bool {
        matches!(self, StreamExit::Stopped)
    }
}

pub struct StreamConnector<R> {
    lifecycle: Lifecycle,
    runner: R,
    consumer: EventStreamConsumer,
    alive: Arc<AtomicBool>,
    liveness_check: Duration,
}

impl<R: StreamRunner> StreamConnector<R> {
    pub fn new(
        config: ConnectorConfig,
        platform: Platform,
        http: Arc<dyn HttpClient>,
        runner: R,
    ) -> Self {
        let ctx = RuntimeContext::new(config.id.clone(), ConnectorType::Stream);
        let consumer = EventStreamConsumer::from_config(http, &config);
        Self {
            lifecycle: Lifecycle::new(ctx, Arc::new(config), platform),
            runner,
            consumer,
            alive: Arc::new(AtomicBool::new(false)),
            liveness_check: DEFAULT_CHECK_INTERVAL,
        }
    }

    pub fn with_liveness_check(mut self, interval: Duration) -> Self {
        self.liveness_check = interval;
        self
    }

    /// Health indicator for external checks: traffic was seen within the
    /// liveness timeout of a running stream.
    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    async fn run_stream(&self) -> StreamExit {
        let stop = self.lifecycle.context().stop.clone();
        let config = self.lifecycle.config();
        self.lifecycle.begin_cycle().await;

        let mut cursor =
            match StreamCursor::load(self.lifecycle.platform().state.as_ref(), &config.stream)
                .await
            {
                Ok(cursor) => cursor,
                Err(e) => {
                    error!("Unable to load the stream cursor: {}", e);
                    return StreamExit::State(e.to_string());
                }
            };

        let monitor = LivenessMonitor::new(config.liveness_timeout_duration(), stop.clone())
            .with_check_interval(self.liveness_check)
            .with_alive_flag(Arc::clone(&self.alive));
        let (liveness, handle) = monitor.spawn();

        let exit = self.consume(&mut cursor, &liveness).await;

        drop(liveness);
        handle.join().await;
        self.alive.store(false, Ordering::SeqCst);
        info!("Stream consumer exited: {:?}", exit);
        exit
    }

    async fn consume(&self, cursor: &mut StreamCursor, liveness: &LivenessSender) -> StreamExit {
        let stop = &self.lifecycle.context().stop;
        if stop.is_raised() {
            return StreamExit::Stopped;
        }

        let mut feed = match self.consumer.open(cursor).await {
            Ok(feed) => feed,
            Err(e) => {
                self.record_error(&e).await;
                return StreamExit::Transport(e.report_message());
            }
        };

        while let Some(next) = feed.next_event().await {
            if stop.is_raised() {
                return StreamExit::Stopped;
            }

            let event = match next {
                Ok(event) => event,
                Err(e) => {
                    let e = e.with_context(
                        ErrorContext::new("read_stream")
                            .with_connector_id(self.lifecycle.config().id.as_str())
                            .with_event_id(cursor.start_from()),
                    );
                    self.record_error(&e).await;
                    return StreamExit::Transport(e.report_message());
                }
            };
            let Some(event_id) = event.id.clone() else {
                debug!("Skipping {} event without id", event.event_type);
                continue;
            };
            liveness.signal(&event.event_type);

            if !event.is_control() {
                let output = match self.runner.run(self.lifecycle.config(), &event).await {
                    Ok(output) => output,
                    Err(e) => {
                        let e = ConnectorError::user_logic(e);
                        self.record_error(&e).await;
                        return StreamExit::UserError(e.report_message());
                    }
                };
                if let Some(work_id) = output.work_id.as_deref() {
                    if !output.bundles.is_empty() {
                        self.lifecycle
                            .send_bundles(
                                &output.bundles,
                                BundleTarget::Import {
                                    work_id,
                                    applicant_id: None,
                                    scope: self.lifecycle.config().scope_filter(),
                                },
                            )
                            .await;
                    }
                }
            }

            cursor.advance(&event_id);
            if let Err(e) = self
                .lifecycle
                .platform()
                .state
                .set_state(cursor.checkpoint(Utc::now()))
                .await
            {
                error!("Unable to persist stream position {}: {}", event_id, e);
                return StreamExit::State(e.to_string());
            }
        }

        warn!("Stream connection closed by the server");
        StreamExit::Ended
    }

    async fn record_error(&self, err: &ConnectorError) {
        error!("Stream processing failed: {}", err);
        let entry = ConnectorState::error_entry(err.report_message());
        if let Err(e) = self.lifecycle.platform().state.set_state(entry).await {
            error!("Failing recording the error in state: {}", e);
        }
    }
}

#[async_trait]
impl<R: StreamRunner> Connector for StreamConnector<R> {
    type Exit = StreamExit;

    fn connector_type(&self) -> ConnectorType {
        ConnectorType::Stream
    }

    fn context(&self) -> &RuntimeContext {
        self.lifecycle.context()
    }

    async fn start(&self) -> StreamExit {
        let span = self.lifecycle.context().span();
        self.run_stream().instrument(span).await
    }
}
