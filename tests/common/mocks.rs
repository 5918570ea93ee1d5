//! Canned user logic for connector tests.
//!
//! Each runner records how often it ran and what it saw, and returns a
//! configured result.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use cti_connector::config::ConnectorConfig;
use cti_connector::connector::{
    EnrichmentRunner, ExternalImportRunner, ImportFileRunner, StreamRunner,
};
use cti_connector::error::BoxError;
use cti_connector::models::{Bundle, RunOutput, StreamOutput};
use cti_connector::sse::StreamEvent;

/// What a runner returns on every call.
#[derive(Clone)]
pub enum Scripted {
    Ok(RunOutput),
    Fail(String),
}

impl Scripted {
    pub fn ok(summary: &str, bundles: Vec<Bundle>) -> Self {
        Scripted::Ok(RunOutput::new(summary, bundles))
    }

    pub fn fail(message: &str) -> Self {
        Scripted::Fail(message.to_string())
    }

    fn result(&self) -> Result<RunOutput, BoxError> {
        match self {
            Scripted::Ok(output) => Ok(output.clone()),
            Scripted::Fail(message) => Err(message.clone().into()),
        }
    }
}

/// Runner usable for import, enrichment and file import.
#[derive(Clone)]
pub struct ScriptedRunner {
    script: Scripted,
    pub calls: Arc<Mutex<Vec<String>>>,
    /// Files seen by the file import runner, with whether they existed.
    pub files: Arc<Mutex<Vec<(PathBuf, bool)>>>,
}

impl ScriptedRunner {
    pub fn new(script: Scripted) -> Self {
        Self {
            script,
            calls: Arc::new(Mutex::new(Vec::new())),
            files: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl ExternalImportRunner for ScriptedRunner {
    async fn run(&self, config: &ConnectorConfig) -> Result<RunOutput, BoxError> {
        self.calls.lock().unwrap().push(config.id.clone());
        self.script.result()
    }
}

#[async_trait]
impl EnrichmentRunner for ScriptedRunner {
    async fn run(&self, entity_id: &str, _config: &ConnectorConfig) -> Result<RunOutput, BoxError> {
        self.calls.lock().unwrap().push(entity_id.to_string());
        self.script.result()
    }
}

#[async_trait]
impl ImportFileRunner for ScriptedRunner {
    async fn run(
        &self,
        file_path: &Path,
        file_mime: &str,
        _entity_id: Option<&str>,
        _config: &ConnectorConfig,
    ) -> Result<RunOutput, BoxError> {
        self.calls.lock().unwrap().push(file_mime.to_string());
        self.files
            .lock()
            .unwrap()
            .push((file_path.to_path_buf(), file_path.exists()));
        self.script.result()
    }
}

/// Stream runner: fails on a given event id, otherwise imports one bundle
/// for events whose data is non-empty.
#[derive(Clone, Default)]
pub struct RecordingStreamRunner {
    pub seen: Arc<Mutex<Vec<StreamEvent>>>,
    fail_on: Option<String>,
}

impl RecordingStreamRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on(event_id: &str) -> Self {
        Self {
            fail_on: Some(event_id.to_string()),
            ..Self::default()
        }
    }

    pub fn seen_ids(&self) -> Vec<String> {
        self.seen
            .lock()
            .unwrap()
            .iter()
            .filter_map(|e| e.id.clone())
            .collect()
    }
}

#[async_trait]
impl StreamRunner for RecordingStreamRunner {
    async fn run(
        &self,
        _config: &ConnectorConfig,
        event: &StreamEvent,
    ) -> Result<StreamOutput, BoxError> {
        self.seen.lock().unwrap().push(event.clone());
        if event.id.is_some() && event.id == self.fail_on {
            return Err(format!("cannot handle {}", event.data).into());
        }
        if event.data.is_empty() {
            return Ok(StreamOutput::none());
        }
        let bundle = Bundle::new(vec![serde_json::json!({
            "type": "indicator",
            "id": format!("indicator--{}", event.id.clone().unwrap_or_default()),
        })]);
        Ok(StreamOutput::with_bundles("stream-work", vec![bundle]))
    }
}
