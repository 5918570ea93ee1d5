//! Live stream plumbing: cursor, connection and liveness watchdog.

pub mod consumer;
pub mod cursor;
pub mod liveness;

pub use consumer::{EventFeed, EventStreamConsumer};
pub use cursor::{EventId, StreamCursor, ORIGIN};
pub use liveness::{LivenessHandle, LivenessMonitor, LivenessSender};
