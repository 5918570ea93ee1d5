//! Process-local state store.

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::state::ConnectorState;
use crate::traits::{StateError, StateStore};

/// State kept in memory for the lifetime of the process.
#[derive(Debug, Default)]
pub struct InMemoryStateStore {
    state: RwLock<ConnectorState>,
}

impl InMemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_state(state: ConnectorState) -> Self {
        Self {
            state: RwLock::new(state),
        }
    }
}

#[async_trait]
impl StateStore for InMemoryStateStore {
    async fn get_state(&self) -> Result<ConnectorState, StateError> {
        Ok(self.state.read().await.clone())
    }

    async fn set_state(&self, partial: ConnectorState) -> Result<(), StateError> {
        self.state.write().await.merge(partial);
        Ok(())
    }
}
