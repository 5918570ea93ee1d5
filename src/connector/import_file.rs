//! Import of files uploaded to the platform.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, error, info, warn, Instrument};

use super::enrichment::RECEIVED_MESSAGE;
use super::lifecycle::{BundleTarget, CycleOutcome, Lifecycle, Platform, WorkUnit};
use super::listener::{listen, DEFAULT_LISTEN_TICK};
use super::{Connector, ImportFileRunner, MessageConnector};
use crate::config::ConnectorConfig;
use crate::context::RuntimeContext;
use crate::error::{ConnectorError, ConnectorResult, ErrorContext, ResultExt};
use crate::models::{ConnectorType, ImportFileMessage};

/// Mime type of bundles parked for validation.
pub const PENDING_BUNDLE_MIME: &str = "application/json";

pub struct ImportFileConnector<R> {
    lifecycle: Lifecycle,
    runner: R,
    inbox: Mutex<Option<mpsc::Receiver<Value>>>,
    tick: Duration,
}

impl<R: ImportFileRunner> ImportFileConnector<R> {
    pub fn new(config: ConnectorConfig, platform: Platform, runner: R) -> Self {
        let ctx = RuntimeContext::new(config.id.clone(), ConnectorType::InternalImportFile);
        Self {
            lifecycle: Lifecycle::new(ctx, Arc::new(config), platform),
            runner,
            inbox: Mutex::new(None),
            tick: DEFAULT_LISTEN_TICK,
        }
    }

    pub fn with_inbox(self, inbox: mpsc::Receiver<Value>) -> Self {
        Self {
            inbox: Mutex::new(Some(inbox)),
            ..self
        }
    }

    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = tick;
        self
    }

    async fn handle(&self, message: Value) -> CycleOutcome {
        let msg: ImportFileMessage = match serde_json::from_value(message.clone()) {
            Ok(msg) => msg,
            Err(e) => {
                let err = ConnectorError::InvalidMessage {
                    kind: "InternalImportFile",
                    message: format!("{} -> {}", message, e),
                };
                error!("{}", err);
                return CycleOutcome::Dropped(err.to_string());
            }
        };

        self.lifecycle.begin_cycle().await;
        let started_at = Utc::now();
        let mut unit = WorkUnit::new(msg.internal.work_id.clone());
        if let Err(e) = self.lifecycle.receive(&mut unit, RECEIVED_MESSAGE).await {
            return self.lifecycle.fail(Some(&mut unit), &e).await;
        }

        let file_path = match self.download(&msg.event.file_fetch, &unit.id).await {
            Ok(path) => path,
            Err(e) => return self.lifecycle.fail(Some(&mut unit), &e).await,
        };
        let entity_id = msg.event.entity_id.as_deref();

        let output = match self
            .runner
            .run(
                &file_path,
                &msg.event.file_mime,
                entity_id,
                self.lifecycle.config(),
            )
            .await
        {
            Ok(output) => output,
            Err(e) => {
                // The downloaded file stays on disk for inspection.
                let err = ConnectorError::user_logic(e);
                return self.lifecycle.fail(Some(&mut unit), &err).await;
            }
        };
        if let Err(e) = self.lifecycle.complete(&mut unit, &output.summary).await {
            return self.lifecycle.fail(Some(&mut unit), &e).await;
        }
        if let Err(e) = tokio::fs::remove_file(&file_path).await {
            warn!("Unable to remove {}: {}", file_path.display(), e);
        }

        let file_name = file_name_of(&file_path);
        let target = if self.lifecycle.config().validate_before_import {
            BundleTarget::Pending {
                file_name: &file_name,
                mime_type: PENDING_BUNDLE_MIME,
                entity_id,
            }
        } else {
            BundleTarget::Import {
                work_id: &unit.id,
                applicant_id: msg.internal.applicant_id.as_deref(),
                scope: None,
            }
        };
        let bundles_sent = self.lifecycle.send_bundles(&output.bundles, target).await;

        self.lifecycle.mark_last_run(started_at).await;
        CycleOutcome::Completed { bundles_sent }
    }

    /// Fetch `<url><file_fetch>` into the download directory, named after
    /// the URI's basename.
    async fn download(&self, file_fetch: &str, work_id: &str) -> ConnectorResult<PathBuf> {
        let config = self.lifecycle.config();
        let name = basename(file_fetch).ok_or_else(|| ConnectorError::InvalidMessage {
            kind: "InternalImportFile",
            message: format!("file reference has no file name: {}", file_fetch),
        })?;
        let uri = format!("{}{}", config.base_url(), file_fetch);
        debug!("Importing the file {}", uri);

        let content = self
            .lifecycle
            .platform()
            .files
            .fetch_file(&uri, true)
            .await
            .with_context(|| ErrorContext::new("fetch_file").with_work_id(work_id))?;

        let dir = config.download_dir();
        let path = dir.join(name);
        let write = async {
            tokio::fs::create_dir_all(&dir).await?;
            tokio::fs::write(&path, &content).await
        };
        write.await.with_context(|| {
            ErrorContext::new(format!("write {}", path.display())).with_work_id(work_id)
        })?;
        info!("Downloaded {} ({} bytes)", path.display(), content.len());
        Ok(path)
    }
}

/// Last path segment of a URI, ignoring any query string.
fn basename(uri: &str) -> Option<&str> {
    let path = uri.split(['?', '#']).next().unwrap_or(uri);
    path.rsplit('/')
        .next()
        .filter(|name| !name.is_empty() && *name != "." && *name != "..")
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[async_trait]
impl<R: ImportFileRunner> Connector for ImportFileConnector<R> {
    /// Messages dispatched.
    type Exit = usize;

    fn connector_type(&self) -> ConnectorType {
        ConnectorType::InternalImportFile
    }

    fn context(&self) -> &RuntimeContext {
        self.lifecycle.context()
    }

    async fn start(&self) -> usize {
        let Some(inbox) = self.inbox.lock().await.take() else {
            warn!("No broker queue attached, nothing to listen to");
            return 0;
        };
        info!("Listening for file import requests");
        listen(self, inbox, self.tick).await
    }
}

#[async_trait]
impl<R: ImportFileRunner> MessageConnector for ImportFileConnector<R> {
    async fn process_broker_message(&self, message: Value) -> CycleOutcome {
        let span = self.lifecycle.context().span();
        self.handle(message).instrument(span).await
    }
}
