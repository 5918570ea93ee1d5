//! Lifecycle helper shared by all connector kinds.
//!
//! Work reporting, error recording, last-run bookkeeping and filtered bundle
//! submission. Every connector variant composes one [`Lifecycle`].

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, error, info, warn};

use crate::config::ConnectorConfig;
use crate::context::{RuntimeContext, StopSignal};
use crate::error::{ConnectorError, ConnectorResult};
use crate::models::Bundle;
use crate::state::ConnectorState;
use crate::tlp;
use crate::traits::{BundleApi, EntityApi, FileApi, StateStore, WorkApi};

/// Handles on the platform collaborators.
#[derive(Clone)]
pub struct Platform {
    pub work: Arc<dyn WorkApi>,
    pub files: Arc<dyn FileApi>,
    pub bundles: Arc<dyn BundleApi>,
    pub entities: Arc<dyn EntityApi>,
    pub state: Arc<dyn StateStore>,
}

impl Platform {
    pub fn new(
        work: Arc<dyn WorkApi>,
        files: Arc<dyn FileApi>,
        bundles: Arc<dyn BundleApi>,
        entities: Arc<dyn EntityApi>,
        state: Arc<dyn StateStore>,
    ) -> Self {
        Self {
            work,
            files,
            bundles,
            entities,
            state,
        }
    }

    /// One client serving all four platform APIs.
    pub fn from_client<C>(client: Arc<C>, state: Arc<dyn StateStore>) -> Self
    where
        C: WorkApi + FileApi + BundleApi + EntityApi + 'static,
    {
        Self {
            work: client.clone(),
            files: client.clone(),
            bundles: client.clone(),
            entities: client,
            state,
        }
    }
}

impl std::fmt::Debug for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Platform").finish_non_exhaustive()
    }
}

/// Progress of a work unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkStatus {
    Created,
    Received,
    Processed { message: String, is_error: bool },
}

/// One unit of reportable progress.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkUnit {
    pub id: String,
    pub status: WorkStatus,
}

impl WorkUnit {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            status: WorkStatus::Created,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.status, WorkStatus::Processed { .. })
    }
}

/// Result of one cycle, returned instead of raising.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// User logic succeeded; `bundles_sent` bundles were submitted.
    Completed { bundles_sent: usize },
    /// Handled lookup or policy failure, reported against the work unit.
    Rejected(String),
    /// User logic or platform failure.
    Failed(String),
    /// Malformed input; no work unit was touched.
    Dropped(String),
}

impl CycleOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, CycleOutcome::Completed { .. })
    }
}

/// Where a bundle goes.
#[derive(Debug, Clone, Copy)]
pub enum BundleTarget<'a> {
    /// Direct import under a work unit.
    Import {
        work_id: &'a str,
        applicant_id: Option<&'a str>,
        scope: Option<&'a [String]>,
    },
    /// Pending-validation queue.
    Pending {
        file_name: &'a str,
        mime_type: &'a str,
        entity_id: Option<&'a str>,
    },
}

/// Work reporting and state bookkeeping for one connector.
#[derive(Debug, Clone)]
pub struct Lifecycle {
    ctx: RuntimeContext,
    config: Arc<ConnectorConfig>,
    platform: Platform,
}

impl Lifecycle {
    pub fn new(ctx: RuntimeContext, config: Arc<ConnectorConfig>, platform: Platform) -> Self {
        Self {
            ctx,
            config,
            platform,
        }
    }

    /// Share another stop signal.
    pub fn with_stop(mut self, stop: StopSignal) -> Self {
        self.ctx = self.ctx.with_stop(stop);
        self
    }

    pub fn context(&self) -> &RuntimeContext {
        &self.ctx
    }

    pub fn config(&self) -> &ConnectorConfig {
        &self.config
    }

    pub fn platform(&self) -> &Platform {
        &self.platform
    }

    /// Read state at cycle start and log the previous run.
    ///
    /// A failing store is logged and treated as empty state.
    pub async fn begin_cycle(&self) -> ConnectorState {
        let state = match self.platform.state.get_state().await {
            Ok(state) => state,
            Err(e) => {
                warn!("Unable to read connector state: {}", e);
                ConnectorState::new()
            }
        };
        match state.last_run() {
            Some(at) => info!("Connector last run: {}", at.format("%Y-%m-%d %H:%M:%S")),
            None => info!("Connector has never run"),
        }
        state
    }

    /// Create a work unit for a poll run.
    pub async fn initiate(&self, label: &str) -> ConnectorResult<WorkUnit> {
        let id = self
            .platform
            .work
            .initiate_work(&self.ctx.connector_id, label)
            .await?;
        debug!("Initiated work {} ({})", id, label);
        Ok(WorkUnit::new(id))
    }

    pub async fn receive(&self, unit: &mut WorkUnit, message: &str) -> ConnectorResult<()> {
        self.platform
            .work
            .report_received(&unit.id, message)
            .await?;
        unit.status = WorkStatus::Received;
        info!("Received work {}", unit.id);
        Ok(())
    }

    /// Terminal success report. A unit is reported terminal at most once.
    pub async fn complete(&self, unit: &mut WorkUnit, message: &str) -> ConnectorResult<()> {
        if unit.is_terminal() {
            warn!("Work {} already processed, not reporting again", unit.id);
            return Ok(());
        }
        self.platform
            .work
            .report_processed(&unit.id, message, false)
            .await?;
        unit.status = WorkStatus::Processed {
            message: message.to_string(),
            is_error: false,
        };
        Ok(())
    }

    /// Failure path: log, record the error in state and best-effort report
    /// it against `unit`. Never fails.
    ///
    /// Handled failures (lookup, policy) also advance the last-run marker.
    pub async fn fail(&self, unit: Option<&mut WorkUnit>, err: &ConnectorError) -> CycleOutcome {
        let message = err.report_message();
        let handled = err.category().is_handled();
        match (handled, err.context()) {
            (true, _) => warn!("{}", message),
            (false, Some(ctx)) => error!("Running Error: {} {}", message, ctx.to_log_string()),
            (false, None) => error!("Running Error: {}", message),
        }

        let mut entry = ConnectorState::error_entry(message.clone());
        if handled {
            entry.merge(ConnectorState::last_run_entry(Utc::now()));
        }
        if let Err(e) = self.platform.state.set_state(entry).await {
            error!("Failing recording the error in state: {}", e);
        }

        if let Some(unit) = unit {
            if unit.is_terminal() {
                warn!("Work {} already processed, not reporting error", unit.id);
            } else {
                match self
                    .platform
                    .work
                    .report_processed(&unit.id, &message, true)
                    .await
                {
                    Ok(()) => {
                        unit.status = WorkStatus::Processed {
                            message: message.clone(),
                            is_error: true,
                        };
                    }
                    Err(e) => error!("Failing reporting the processing: {}", e),
                }
            }
        }

        if handled {
            CycleOutcome::Rejected(message)
        } else {
            CycleOutcome::Failed(message)
        }
    }

    /// Persist the last-run marker for a run that started at `run_at`.
    pub async fn mark_last_run(&self, run_at: DateTime<Utc>) {
        match self
            .platform
            .state
            .set_state(ConnectorState::last_run_entry(run_at))
            .await
        {
            Ok(()) => debug!("Last run stored as {}", run_at.timestamp()),
            Err(e) => error!("Failing storing last run: {}", e),
        }
    }

    /// Apply the TLP ceiling and scope. `None` when nothing is left.
    pub fn prepare_bundle(&self, bundle: &Bundle, scope: Option<&[String]>) -> Option<Bundle> {
        let mut prepared = match self.config.max_tlp {
            Some(ceiling) => tlp::filter_bundle(bundle, ceiling),
            None => bundle.clone(),
        };
        if let Some(scope) = scope {
            prepared = prepared.retain_scope(scope);
        }
        let dropped = bundle.len() - prepared.len();
        if dropped > 0 {
            debug!("Filtered {} object(s) out of bundle {}", dropped, bundle.id);
        }
        if prepared.is_empty() {
            info!("Bundle {} is empty after filtering, not sending", bundle.id);
            return None;
        }
        Some(prepared)
    }

    /// Filter and submit bundles. Submission failures are logged and do not
    /// fail the cycle. Returns how many bundles were accepted.
    pub async fn send_bundles(&self, bundles: &[Bundle], target: BundleTarget<'_>) -> usize {
        let scope = match target {
            BundleTarget::Import { scope, .. } => scope,
            BundleTarget::Pending { .. } => None,
        };

        let mut sent = 0;
        for bundle in bundles {
            let Some(prepared) = self.prepare_bundle(bundle, scope) else {
                continue;
            };
            let result = match target {
                BundleTarget::Import {
                    work_id,
                    applicant_id,
                    scope,
                } => {
                    self.platform
                        .bundles
                        .submit_bundle(&prepared, work_id, applicant_id, scope)
                        .await
                }
                BundleTarget::Pending {
                    file_name,
                    mime_type,
                    entity_id,
                } => {
                    self.platform
                        .bundles
                        .submit_pending_bundle(file_name, &prepared, mime_type, entity_id)
                        .await
                }
            };
            match result {
                Ok(()) => {
                    sent += 1;
                    debug!("Sent bundle {} ({} objects)", prepared.id, prepared.len());
                }
                Err(e) => error!("Failing sending bundle {}: {}", prepared.id, e),
            }
        }
        sent
    }
}
