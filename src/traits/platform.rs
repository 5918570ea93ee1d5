//! Platform API trait abstractions.
//!
//! The connector runtime consumes four platform collaborators: work
//! tracking, file download, bundle submission and entity lookup. Each is a
//! trait so lifecycles can be driven by the real client or by
//! [`MockPlatform`](crate::adapters::mock::MockPlatform).

use async_trait::async_trait;
use bytes::Bytes;

use crate::models::{Bundle, Entity};

/// Platform API errors.
#[derive(Debug, Clone, PartialEq)]
pub enum PlatformError {
    /// The request could not be sent or no response arrived
    Request(String),
    /// The platform refused the call
    Rejected { status: u16, message: String },
    /// Response body could not be decoded
    Decode(String),
    /// Other error
    Other(String),
}

impl std::fmt::Display for PlatformError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlatformError::Request(msg) => write!(f, "Request failed: {}", msg),
            PlatformError::Rejected { status, message } => {
                write!(f, "Rejected ({}): {}", status, message)
            }
            PlatformError::Decode(msg) => write!(f, "Decode error: {}", msg),
            PlatformError::Other(msg) => write!(f, "Platform error: {}", msg),
        }
    }
}

impl std::error::Error for PlatformError {}

/// Work tracking API.
///
/// A work unit goes `initiate → received → processed` and reaches
/// `processed` exactly once.
#[async_trait]
pub trait WorkApi: Send + Sync {
    /// Create a work unit and return its id.
    async fn initiate_work(&self, connector_id: &str, label: &str) -> Result<String, PlatformError>;

    async fn report_received(&self, work_id: &str, message: &str) -> Result<(), PlatformError>;

    /// Terminal report for a work unit.
    async fn report_processed(
        &self,
        work_id: &str,
        message: &str,
        is_error: bool,
    ) -> Result<(), PlatformError>;
}

/// File download API.
#[async_trait]
pub trait FileApi: Send + Sync {
    async fn fetch_file(&self, uri: &str, binary: bool) -> Result<Bytes, PlatformError>;
}

/// Bundle submission API.
#[async_trait]
pub trait BundleApi: Send + Sync {
    /// Submit a bundle for import under a work unit.
    async fn submit_bundle(
        &self,
        bundle: &Bundle,
        work_id: &str,
        applicant_id: Option<&str>,
        scope: Option<&[String]>,
    ) -> Result<(), PlatformError>;

    /// Park a bundle for validation instead of importing it.
    async fn submit_pending_bundle(
        &self,
        file_name: &str,
        bundle: &Bundle,
        mime_type: &str,
        entity_id: Option<&str>,
    ) -> Result<(), PlatformError>;
}

/// Entity lookup API.
#[async_trait]
pub trait EntityApi: Send + Sync {
    /// Read an entity with its markings. `Ok(None)` when it does not exist.
    async fn read_entity(&self, id: &str) -> Result<Option<Entity>, PlatformError>;
}
