//! Connector state store trait abstraction.

use async_trait::async_trait;

use crate::state::ConnectorState;

/// State store errors.
#[derive(Debug, Clone, PartialEq)]
pub enum StateError {
    /// Failed to read or write the backing storage
    Io(String),
    /// Stored document could not be (de)serialized
    Serialization(String),
    /// Other error
    Other(String),
}

impl std::fmt::Display for StateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StateError::Io(msg) => write!(f, "IO error: {}", msg),
            StateError::Serialization(msg) => write!(f, "Serialization error: {}", msg),
            StateError::Other(msg) => write!(f, "State error: {}", msg),
        }
    }
}

impl std::error::Error for StateError {}

/// Durable key/value state for one connector instance.
///
/// `set_state` merges: keys present in `partial` overwrite stored keys,
/// other stored keys are kept. Nothing is transactional across calls.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Load the full state document. Empty state when nothing was stored.
    async fn get_state(&self) -> Result<ConnectorState, StateError>;

    /// Merge `partial` into the stored state.
    async fn set_state(&self, partial: ConnectorState) -> Result<(), StateError>;
}
