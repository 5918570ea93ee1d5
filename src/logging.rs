//! Logging setup.
//!
//! Logs go to stderr through `tracing-subscriber`. `RUST_LOG` takes
//! precedence over the configured level.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::error::{ConnectorError, ConnectorResult};

/// Build the filter for `level`, letting `RUST_LOG` override it.
pub fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}

/// Install the global subscriber.
///
/// Returns an error (and installs nothing) when a subscriber is already set.
pub fn init_logging(level: &str) -> ConnectorResult<()> {
    tracing_subscriber::registry()
        .with(env_filter(level))
        .with(fmt::layer().with_writer(std::io::stderr).with_target(true))
        .try_init()
        .map_err(|e| ConnectorError::Configuration(format!("logging already initialised: {}", e)))?;

    tracing::debug!("Logging initialized at level {}", level);
    Ok(())
}
