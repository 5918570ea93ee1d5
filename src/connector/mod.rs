//! Connector kinds and the traits user logic implements.
//!
//! | kind | trigger | user trait |
//! |------|---------|------------|
//! | [`ExternalImportConnector`] | [`Scheduler`](crate::scheduler::Scheduler) | [`ExternalImportRunner`] |
//! | [`EnrichmentConnector`] | broker message | [`EnrichmentRunner`] |
//! | [`ImportFileConnector`] | broker message | [`ImportFileRunner`] |
//! | [`StreamConnector`] | live stream event | [`StreamRunner`] |
//!
//! Each variant composes a [`Lifecycle`] for work reporting and state
//! bookkeeping. No variant lets an error escape a cycle.

pub mod enrichment;
pub mod external_import;
pub mod import_file;
pub mod lifecycle;
pub mod listener;
pub mod stream;

use std::path::Path;

use async_trait::async_trait;
use tracing::info;

use crate::config::ConnectorConfig;
use crate::context::RuntimeContext;
use crate::error::BoxError;
use crate::models::{ConnectorType, RunOutput, StreamOutput};
use crate::sse::StreamEvent;

pub use enrichment::EnrichmentConnector;
pub use external_import::{ExternalImportConnector, ImportPhase};
pub use import_file::ImportFileConnector;
pub use lifecycle::{BundleTarget, CycleOutcome, Lifecycle, Platform, WorkStatus, WorkUnit};
pub use listener::listen;
pub use stream::{StreamConnector, StreamExit};

/// Shared surface of every connector kind.
#[async_trait]
pub trait Connector: Send + Sync {
    /// What `start` returns when the connector finishes.
    type Exit: Send;

    fn connector_type(&self) -> ConnectorType;

    fn context(&self) -> &RuntimeContext;

    /// Run until stopped or, for streams, until the connection ends.
    async fn start(&self) -> Self::Exit;

    /// Raise the stop signal.
    fn stop(&self) {
        self.context().stop.raise();
        info!("Ending");
    }
}

/// Connectors driven by broker messages.
#[async_trait]
pub trait MessageConnector: Connector {
    /// Handle one inbound message. Never raises.
    async fn process_broker_message(&self, message: serde_json::Value) -> CycleOutcome;
}

/// Poll-style import logic.
#[async_trait]
pub trait ExternalImportRunner: Send + Sync {
    async fn run(&self, config: &ConnectorConfig) -> Result<RunOutput, BoxError>;
}

/// Enrichment logic for one platform entity.
#[async_trait]
pub trait EnrichmentRunner: Send + Sync {
    async fn run(&self, entity_id: &str, config: &ConnectorConfig) -> Result<RunOutput, BoxError>;
}

/// Import logic for one downloaded file.
#[async_trait]
pub trait ImportFileRunner: Send + Sync {
    async fn run(
        &self,
        file_path: &Path,
        file_mime: &str,
        entity_id: Option<&str>,
        config: &ConnectorConfig,
    ) -> Result<RunOutput, BoxError>;
}

/// Per-event stream logic.
#[async_trait]
pub trait StreamRunner: Send + Sync {
    async fn run(
        &self,
        config: &ConnectorConfig,
        event: &StreamEvent,
    ) -> Result<StreamOutput, BoxError>;
}
