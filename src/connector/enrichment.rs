//! Enrichment of platform entities on request.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use tokio::sync::{mpsc, Mutex};
use tracing::{error, info, warn, Instrument};

use super::lifecycle::{BundleTarget, CycleOutcome, Lifecycle, Platform, WorkUnit};
use super::listener::{listen, DEFAULT_LISTEN_TICK};
use super::{Connector, EnrichmentRunner, MessageConnector};
use crate::config::ConnectorConfig;
use crate::context::RuntimeContext;
use crate::error::{ConnectorError, ConnectorResult};
use crate::models::{ConnectorType, EnrichmentMessage, Entity};
use crate::tlp;

pub(crate) const RECEIVED_MESSAGE: &str = "Connector ready to process the operation";

pub struct EnrichmentConnector<R> {
    lifecycle: Lifecycle,
    runner: R,
    inbox: Mutex<Option<mpsc::Receiver<Value>>>,
    tick: Duration,
}

impl<R: EnrichmentRunner> EnrichmentConnector<R> {
    pub fn new(config: ConnectorConfig, platform: Platform, runner: R) -> Self {
        let ctx = RuntimeContext::new(config.id.clone(), ConnectorType::InternalEnrichment);
        Self {
            lifecycle: Lifecycle::new(ctx, Arc::new(config), platform),
            runner,
            inbox: Mutex::new(None),
            tick: DEFAULT_LISTEN_TICK,
        }
    }

    /// Broker queue consumed by `start`.
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
        let msg: EnrichmentMessage = match serde_json::from_value(message.clone()) {
            Ok(msg) => msg,
            Err(e) => {
                let err = ConnectorError::InvalidMessage {
                    kind: "InternalEnrichment",
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

        let entity_id = msg.event.entity_id.as_str();
        if let Err(e) = self.check_entity(entity_id).await {
            return self.lifecycle.fail(Some(&mut unit), &e).await;
        }

        let output = match self.runner.run(entity_id, self.lifecycle.config()).await {
            Ok(output) => output,
            Err(e) => {
                let err = ConnectorError::user_logic(e);
                return self.lifecycle.fail(Some(&mut unit), &err).await;
            }
        };
        if let Err(e) = self.lifecycle.complete(&mut unit, &output.summary).await {
            return self.lifecycle.fail(Some(&mut unit), &e).await;
        }

        let bundles_sent = self
            .lifecycle
            .send_bundles(
                &output.bundles,
                BundleTarget::Import {
                    work_id: &unit.id,
                    applicant_id: msg.internal.applicant_id.as_deref(),
                    scope: None,
                },
            )
            .await;
        self.lifecycle.mark_last_run(started_at).await;
        CycleOutcome::Completed { bundles_sent }
    }

    /// Entity must exist and none of its TLP markings may exceed the
    /// ceiling. Entities without TLP marking count as `TLP:CLEAR`.
    async fn check_entity(&self, entity_id: &str) -> ConnectorResult<Entity> {
        let entity = self
            .lifecycle
            .platform()
            .entities
            .read_entity(entity_id)
            .await?
            .ok_or_else(|| ConnectorError::EntityNotFound(entity_id.to_string()))?;

        if let Some(ceiling) = self.lifecycle.config().max_tlp {
            let tlps = tlp::entity_tlps(&entity.object_marking);
            if let Some(exceeding) = tlp::first_exceeding(&tlps, ceiling) {
                return Err(ConnectorError::TlpExceeded {
                    entity_id: entity.id.clone(),
                    tlp: exceeding.to_string(),
                });
            }
        }
        Ok(entity)
    }
}

#[async_trait]
impl<R: EnrichmentRunner> Connector for EnrichmentConnector<R> {
    /// Messages dispatched.
    type Exit = usize;

    fn connector_type(&self) -> ConnectorType {
        ConnectorType::InternalEnrichment
    }

    fn context(&self) -> &RuntimeContext {
        self.lifecycle.context()
    }

    async fn start(&self) -> usize {
        let Some(inbox) = self.inbox.lock().await.take() else {
            warn!("No broker queue attached, nothing to listen to");
            return 0;
        };
        info!("Listening for enrichment requests");
        listen(self, inbox, self.tick).await
    }
}

#[async_trait]
impl<R: EnrichmentRunner> MessageConnector for EnrichmentConnector<R> {
    async fn process_broker_message(&self, message: Value) -> CycleOutcome {
        let span = self.lifecycle.context().span();
        self.handle(message).instrument(span).await
    }
}
