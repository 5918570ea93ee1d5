//! Mock implementations for testing.
//!
//! Test doubles for every trait seam, usable without network or disk.
//!
//! # Available Mocks
//!
//! - [`MockHttpClient`] - HTTP client with configurable responses and streams
//! - [`MockPlatform`] - work, file, bundle and entity APIs with call recording
//! - [`RecordingStateStore`] - state store that records every write

pub mod http;
pub mod platform;
pub mod state;

pub use http::{MockHttpClient, MockResponse, RecordedRequest};
pub use platform::{MockPlatform, PlatformCall};
pub use state::RecordingStateStore;
