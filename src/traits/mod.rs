//! Trait abstractions for dependency injection and testability.
//!
//! # Traits
//!
//! - [`HttpClient`] - HTTP GET and streaming GET
//! - [`WorkApi`], [`FileApi`], [`BundleApi`], [`EntityApi`] - platform APIs
//! - [`StateStore`] - per-connector durable state

pub mod http;
pub mod platform;
pub mod state;

pub use http::{ByteStream, Headers, HttpClient, HttpError, Response};
pub use platform::{BundleApi, EntityApi, FileApi, PlatformError, WorkApi};
pub use state::{StateError, StateStore};
