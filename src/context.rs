//! Explicit runtime context handed to every component.
//!
//! Holds the connector identity and the process-wide stop signal so nothing
//! relies on module-level singletons.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::Span;

use crate::models::ConnectorType;

/// Idempotent, cloneable stop flag observed by every loop.
#[derive(Debug, Clone, Default)]
pub struct StopSignal {
    raised: Arc<AtomicBool>,
}

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// A signal that is already raised ("run once and stop" mode).
    pub fn raised() -> Self {
        let signal = Self::new();
        signal.raise();
        signal
    }

    pub fn raise(&self) {
        self.raised.store(true, Ordering::SeqCst);
    }

    pub fn is_raised(&self) -> bool {
        self.raised.load(Ordering::SeqCst)
    }

    /// Raise this signal on Ctrl+C.
    ///
    /// Only one handler can exist per process; a second install returns the
    /// `ctrlc` error.
    pub fn install_ctrlc_handler(&self) -> Result<(), ctrlc::Error> {
        let signal = self.clone();
        ctrlc::set_handler(move || {
            signal.raise();
        })
    }
}

/// Identity and cancellation shared by one connector's components.
#[derive(Debug, Clone)]
pub struct RuntimeContext {
    pub connector_id: String,
    pub connector_type: ConnectorType,
    pub stop: StopSignal,
}

impl RuntimeContext {
    pub fn new(connector_id: impl Into<String>, connector_type: ConnectorType) -> Self {
        Self {
            connector_id: connector_id.into(),
            connector_type,
            stop: StopSignal::new(),
        }
    }

    pub fn with_stop(mut self, stop: StopSignal) -> Self {
        self.stop = stop;
        self
    }

    /// Span wrapping everything a connector logs.
    pub fn span(&self) -> Span {
        tracing::info_span!(
            "connector",
            connector_id = %self.connector_id,
            kind = %self.connector_type
        )
    }
}
