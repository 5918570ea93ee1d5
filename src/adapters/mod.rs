//! Concrete implementations of trait abstractions.
//!
//! # Adapters
//!
//! - [`ReqwestHttpClient`] - HTTP client using reqwest
//! - [`HttpFileFetcher`] - file downloads over any [`HttpClient`](crate::traits::HttpClient)
//! - [`InMemoryStateStore`] - process-local connector state
//! - [`FileStateStore`] - connector state as a JSON document on disk
//!
//! # Mock Implementations
//!
//! The [`mock`] submodule provides test doubles for all seams.

pub mod file_state;
pub mod http_file;
pub mod memory_state;
pub mod mock;
pub mod reqwest_http;

pub use file_state::FileStateStore;
pub use http_file::HttpFileFetcher;
pub use memory_state::InMemoryStateStore;
pub use mock::{MockHttpClient, MockPlatform, RecordingStateStore};
pub use reqwest_http::ReqwestHttpClient;
