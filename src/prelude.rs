//! Prelude module for convenient imports.
//!
//! # Usage
//!
//! ```ignore
//! use cti_connector::prelude::*;
//! ```
//!
//! This will import:
//! - Connector kinds and the user logic traits
//! - Configuration and runtime context
//! - Model types (Bundle, RunOutput, StreamOutput, StreamEvent)
//! - Error types

// Connector kinds
pub use crate::connector::{
    Connector, CycleOutcome, EnrichmentConnector, EnrichmentRunner, ExternalImportConnector,
    ExternalImportRunner, ImportFileConnector, ImportFileRunner, MessageConnector, Platform,
    StreamConnector, StreamExit, StreamRunner,
};

// Configuration and context
pub use crate::config::{ConnectorConfig, StreamSettings};
pub use crate::context::{RuntimeContext, StopSignal};

// Model types
pub use crate::models::{Bundle, ConnectorType, RunOutput, StreamOutput};
pub use crate::sse::StreamEvent;
pub use crate::tlp::TlpLevel;

// Errors
pub use crate::error::{BoxError, ConnectorError, ConnectorResult};
