//! cti-connector - connector runtime for threat-intelligence platforms
//!
//! Drives user-supplied connector logic through one of four lifecycles:
//! scheduled external import, entity enrichment, file import and live
//! stream consumption. Work reporting, state bookkeeping, TLP filtering and
//! the resumable stream cursor are handled here; platform APIs and state
//! storage plug in through the traits in [`traits`].

pub mod adapters;
pub mod config;
pub mod connector;
pub mod context;
pub mod error;
pub mod logging;
pub mod models;
pub mod prelude;
pub mod scheduler;
pub mod sse;
pub mod state;
pub mod stream;
pub mod tlp;
pub mod traits;
