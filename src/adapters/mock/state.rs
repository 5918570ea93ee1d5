//! Recording state store for testing.

use async_trait::async_trait;
use std::sync::{Arc, Mutex};

use crate::state::ConnectorState;
use crate::traits::{StateError, StateStore};

/// In-memory store that records every `set_state` partial.
///
/// Writes are recorded even when configured to fail, so tests can assert
/// what the runtime tried to persist.
#[derive(Debug, Clone, Default)]
pub struct RecordingStateStore {
    state: Arc<Mutex<ConnectorState>>,
    writes: Arc<Mutex<Vec<ConnectorState>>>,
    fail_reads: Arc<Mutex<bool>>,
    fail_writes: Arc<Mutex<bool>>,
}

impl RecordingStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_state(state: ConnectorState) -> Self {
        Self {
            state: Arc::new(Mutex::new(state)),
            ..Self::default()
        }
    }

    pub fn fail_reads(&self, fail: bool) {
        *self.fail_reads.lock().unwrap() = fail;
    }

    pub fn fail_writes(&self, fail: bool) {
        *self.fail_writes.lock().unwrap() = fail;
    }

    /// Every partial passed to `set_state`, in order.
    pub fn writes(&self) -> Vec<ConnectorState> {
        self.writes.lock().unwrap().clone()
    }

    /// Merged state as it stands.
    pub fn current(&self) -> ConnectorState {
        self.state.lock().unwrap().clone()
    }
}

#[async_trait]
impl StateStore for RecordingStateStore {
    async fn get_state(&self) -> Result<ConnectorState, StateError> {
        if *self.fail_reads.lock().unwrap() {
            return Err(StateError::Io("Mock read failure".to_string()));
        }
        Ok(self.current())
    }

    async fn set_state(&self, partial: ConnectorState) -> Result<(), StateError> {
        self.writes.lock().unwrap().push(partial.clone());
        if *self.fail_writes.lock().unwrap() {
            return Err(StateError::Io("Mock write failure".to_string()));
        }
        self.state.lock().unwrap().merge(partial);
        Ok(())
    }
}
