//! Scheduled import from external sources.
//!
//! Phases: `Idle → Running → Reporting → Idle`, or
//! `Running → ErrorReported → Idle` on failure.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::watch;
use tracing::{info, Instrument};

use super::lifecycle::{BundleTarget, CycleOutcome, Lifecycle, Platform};
use super::{Connector, ExternalImportRunner};
use crate::config::ConnectorConfig;
use crate::context::{RuntimeContext, StopSignal};
use crate::error::ConnectorError;
use crate::models::ConnectorType;
use crate::scheduler::Scheduler;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportPhase {
    Idle,
    Running,
    Reporting,
    ErrorReported,
}

pub struct ExternalImportConnector<R> {
    lifecycle: Lifecycle,
    runner: R,
    phase: watch::Sender<ImportPhase>,
    scheduler: Scheduler,
}

impl<R: ExternalImportRunner> ExternalImportConnector<R> {
    /// With `run_and_terminate`, the stop signal is raised up front so
    /// `start` returns after the first run.
    pub fn new(config: ConnectorConfig, platform: Platform, runner: R) -> Self {
        let stop = if config.run_and_terminate {
            StopSignal::raised()
        } else {
            StopSignal::new()
        };
        let ctx = RuntimeContext::new(config.id.clone(), ConnectorType::ExternalImport)
            .with_stop(stop.clone());
        let scheduler = Scheduler::new(config.interval_duration(), stop);
        let (phase, _) = watch::channel(ImportPhase::Idle);

        Self {
            lifecycle: Lifecycle::new(ctx, Arc::new(config), platform),
            runner,
            phase,
            scheduler,
        }
    }

    /// Replace the scheduler (tick granularity, shared stop signal).
    pub fn with_scheduler(mut self, scheduler: Scheduler) -> Self {
        self.lifecycle = self.lifecycle.with_stop(scheduler.stop_signal().clone());
        self.scheduler = scheduler;
        self
    }

    pub fn phase(&self) -> watch::Receiver<ImportPhase> {
        self.phase.subscribe()
    }

    fn set_phase(&self, phase: ImportPhase) {
        self.phase.send_replace(phase);
    }

    /// One import run. Never raises.
    pub async fn issue_call(&self) -> CycleOutcome {
        let span = self.lifecycle.context().span();
        self.cycle().instrument(span).await
    }

    async fn cycle(&self) -> CycleOutcome {
        self.set_phase(ImportPhase::Running);
        self.lifecycle.begin_cycle().await;

        let now = Utc::now();
        let label = format!("Connector run @ {}", now.format("%Y-%m-%d %H:%M:%S"));
        let mut unit = match self.lifecycle.initiate(&label).await {
            Ok(unit) => unit,
            Err(e) => {
                let outcome = self.lifecycle.fail(None, &e).await;
                return self.end_with_error(outcome);
            }
        };

        info!("Connector will run");
        let output = match self.runner.run(self.lifecycle.config()).await {
            Ok(output) => output,
            Err(e) => {
                let err = ConnectorError::user_logic(e);
                let outcome = self.lifecycle.fail(Some(&mut unit), &err).await;
                return self.end_with_error(outcome);
            }
        };

        self.set_phase(ImportPhase::Reporting);
        let message = if output.summary.is_empty() {
            self.next_run_message()
        } else {
            output.summary.clone()
        };
        if let Err(e) = self.lifecycle.complete(&mut unit, &message).await {
            let outcome = self.lifecycle.fail(Some(&mut unit), &e).await;
            return self.end_with_error(outcome);
        }
        info!("Connector successfully run, storing last_run as {}", now.timestamp());

        let config = self.lifecycle.config();
        let bundles_sent = self
            .lifecycle
            .send_bundles(
                &output.bundles,
                BundleTarget::Import {
                    work_id: &unit.id,
                    applicant_id: None,
                    scope: config.scope_filter(),
                },
            )
            .await;

        self.lifecycle.mark_last_run(now).await;
        self.set_phase(ImportPhase::Idle);
        CycleOutcome::Completed { bundles_sent }
    }

    fn end_with_error(&self, outcome: CycleOutcome) -> CycleOutcome {
        self.set_phase(ImportPhase::ErrorReported);
        self.set_phase(ImportPhase::Idle);
        outcome
    }

    fn next_run_message(&self) -> String {
        let days = self.lifecycle.config().interval as f64 / 86_400.0;
        format!("Last_run stored, next run in: {:.2} days", days)
    }
}

#[async_trait]
impl<R: ExternalImportRunner> Connector for ExternalImportConnector<R> {
    /// Number of runs performed.
    type Exit = usize;

    fn connector_type(&self) -> ConnectorType {
        ConnectorType::ExternalImport
    }

    fn context(&self) -> &RuntimeContext {
        self.lifecycle.context()
    }

    async fn start(&self) -> usize {
        self.scheduler
            .schedule(|| async {
                self.issue_call().await;
            })
            .await
    }
}
