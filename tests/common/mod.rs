//! Common test utilities for integration tests.
//!
//! Fixtures for configuration, platform wiring and canned user logic.
//!
//! # Example
//!
//! ```ignore
//! let fixture = PlatformFixture::new();
//! let connector = ExternalImportConnector::new(test_config(), fixture.platform(), runner);
//! ```

#![allow(dead_code)]

pub mod mocks;

pub use mocks::*;

use std::sync::Arc;

use cti_connector::adapters::mock::{MockPlatform, RecordingStateStore};
use cti_connector::config::ConnectorConfig;
use cti_connector::connector::Platform;
use cti_connector::models::Bundle;
use cti_connector::state::ConnectorState;
use serde_json::json;

pub const TEST_URL: &str = "https://platform.example";

/// Config with a short interval, pointed at a fake platform.
pub fn test_config() -> ConnectorConfig {
    ConnectorConfig::new("connector-test", TEST_URL)
        .with_name("Test connector")
        .with_token("test-token")
        .with_interval_secs(3600)
}

/// Mock platform plus recording state store, wired into a [`Platform`].
pub struct PlatformFixture {
    pub api: Arc<MockPlatform>,
    pub store: Arc<RecordingStateStore>,
}

impl PlatformFixture {
    pub fn new() -> Self {
        Self::with_state(ConnectorState::new())
    }

    pub fn with_state(state: ConnectorState) -> Self {
        Self {
            api: Arc::new(MockPlatform::new()),
            store: Arc::new(RecordingStateStore::with_state(state)),
        }
    }

    pub fn platform(&self) -> Platform {
        Platform::from_client(self.api.clone(), self.store.clone())
    }
}

/// Single-indicator bundle.
pub fn indicator_bundle(id: &str) -> Bundle {
    Bundle::new(vec![json!({
        "type": "indicator",
        "id": id,
        "pattern": "[ipv4-addr:value = '198.51.100.1']"
    })])
}

/// Enrichment broker message.
pub fn enrichment_message(entity_id: &str, work_id: &str) -> serde_json::Value {
    json!({
        "event": {"entity_id": entity_id},
        "internal": {"work_id": work_id, "applicant_id": "user-1"}
    })
}

/// File import broker message.
pub fn import_file_message(file_fetch: &str, work_id: &str) -> serde_json::Value {
    json!({
        "event": {
            "file_fetch": file_fetch,
            "file_mime": "application/json",
            "entity_id": "report--1"
        },
        "internal": {"work_id": work_id, "applicant_id": "user-1"}
    })
}
