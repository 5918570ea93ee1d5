//! File-backed state store.
//!
//! State is one pretty-printed JSON document per connector, stored under
//! `<data_local_dir>/cti-connector/<connector_id>.json` by default. Writes
//! go to a sibling temp file that is then renamed over the document, so a
//! crash never leaves a half-written state file.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;

use crate::state::ConnectorState;
use crate::traits::{StateError, StateStore};

const STATE_DIR: &str = "cti-connector";

/// JSON document on disk.
#[derive(Debug)]
pub struct FileStateStore {
    path: PathBuf,
    /// Serializes read-merge-write cycles within the process.
    lock: Mutex<()>,
}

impl FileStateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Store under the platform's local data directory.
    ///
    /// Returns `None` if that directory cannot be determined.
    pub fn for_connector(connector_id: &str) -> Option<Self> {
        let dir = dirs::data_local_dir()?.join(STATE_DIR);
        Some(Self::new(dir.join(format!("{}.json", connector_id))))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read(&self) -> Result<ConnectorState, StateError> {
        let raw = match tokio::fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(ConnectorState::new())
            }
            Err(e) => return Err(StateError::Io(e.to_string())),
        };
        if raw.iter().all(u8::is_ascii_whitespace) {
            return Ok(ConnectorState::new());
        }
        serde_json::from_slice(&raw).map_err(|e| StateError::Serialization(e.to_string()))
    }

    async fn write(&self, state: &ConnectorState) -> Result<(), StateError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StateError::Io(e.to_string()))?;
        }
        let body = serde_json::to_vec_pretty(state)
            .map_err(|e| StateError::Serialization(e.to_string()))?;

        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &body)
            .await
            .map_err(|e| StateError::Io(e.to_string()))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| StateError::Io(e.to_string()))?;
        debug!("State written to {}", self.path.display());
        Ok(())
    }
}

#[async_trait]
impl StateStore for FileStateStore {
    async fn get_state(&self) -> Result<ConnectorState, StateError> {
        let _guard = self.lock.lock().await;
        self.read().await
    }

    async fn set_state(&self, partial: ConnectorState) -> Result<(), StateError> {
        let _guard = self.lock.lock().await;
        let mut state = self.read().await?;
        state.merge(partial);
        self.write(&state).await
    }
}
