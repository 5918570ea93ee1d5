//! Mock platform for testing.
//!
//! Implements all four platform APIs, records every call and lets tests
//! configure entities, files and failures.

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::models::{Bundle, Entity};
use crate::traits::{BundleApi, EntityApi, FileApi, PlatformError, WorkApi};

/// One recorded platform call.
#[derive(Debug, Clone, PartialEq)]
pub enum PlatformCall {
    InitiateWork {
        connector_id: String,
        label: String,
    },
    ReportReceived {
        work_id: String,
        message: String,
    },
    ReportProcessed {
        work_id: String,
        message: String,
        is_error: bool,
    },
    FetchFile {
        uri: String,
        binary: bool,
    },
    SubmitBundle {
        bundle: Bundle,
        work_id: String,
        applicant_id: Option<String>,
        scope: Option<Vec<String>>,
    },
    SubmitPending {
        file_name: String,
        bundle: Bundle,
        mime_type: String,
        entity_id: Option<String>,
    },
    ReadEntity {
        id: String,
    },
}

#[derive(Debug, Default)]
struct Failures {
    initiate: Option<PlatformError>,
    received: Option<PlatformError>,
    processed: Option<PlatformError>,
    bundles: Option<PlatformError>,
    entities: Option<PlatformError>,
}

/// Mock platform client.
///
/// # Example
///
/// ```ignore
/// use cti_connector::adapters::mock::MockPlatform;
///
/// let api = Arc::new(MockPlatform::new().with_entity(Entity::new("ipv4-addr--1")));
/// let platform = Platform::from_client(api.clone(), store);
/// // ... drive a connector ...
/// assert_eq!(api.processed_reports("w1"), vec![("done".to_string(), false)]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MockPlatform {
    calls: Arc<Mutex<Vec<PlatformCall>>>,
    entities: Arc<Mutex<HashMap<String, Entity>>>,
    files: Arc<Mutex<HashMap<String, Bytes>>>,
    failures: Arc<Mutex<Failures>>,
    next_work: Arc<AtomicUsize>,
}

impl MockPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entity(self, entity: Entity) -> Self {
        self.add_entity(entity);
        self
    }

    pub fn add_entity(&self, entity: Entity) {
        self.entities
            .lock()
            .unwrap()
            .insert(entity.id.clone(), entity);
    }

    /// Serve `content` for `uri`.
    pub fn set_file(&self, uri: &str, content: impl Into<Bytes>) {
        self.files
            .lock()
            .unwrap()
            .insert(uri.to_string(), content.into());
    }

    pub fn fail_initiate(&self, err: PlatformError) {
        self.failures.lock().unwrap().initiate = Some(err);
    }

    pub fn fail_received(&self, err: PlatformError) {
        self.failures.lock().unwrap().received = Some(err);
    }

    pub fn fail_processed_reports(&self, err: PlatformError) {
        self.failures.lock().unwrap().processed = Some(err);
    }

    pub fn fail_bundle_submissions(&self, err: PlatformError) {
        self.failures.lock().unwrap().bundles = Some(err);
    }

    pub fn fail_entity_reads(&self, err: PlatformError) {
        self.failures.lock().unwrap().entities = Some(err);
    }

    /// Every call, in order, including failed ones.
    pub fn calls(&self) -> Vec<PlatformCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    /// `(message, is_error)` of every processed report for `work_id`.
    pub fn processed_reports(&self, work_id: &str) -> Vec<(String, bool)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                PlatformCall::ReportProcessed {
                    work_id: id,
                    message,
                    is_error,
                } if id == work_id => Some((message, is_error)),
                _ => None,
            })
            .collect()
    }

    /// All processed reports regardless of work unit.
    pub fn all_processed_reports(&self) -> Vec<(String, String, bool)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                PlatformCall::ReportProcessed {
                    work_id,
                    message,
                    is_error,
                } => Some((work_id, message, is_error)),
                _ => None,
            })
            .collect()
    }

    pub fn received_reports(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                PlatformCall::ReportReceived { work_id, .. } => Some(work_id),
                _ => None,
            })
            .collect()
    }

    /// Bundles passed to `submit_bundle`, including rejected ones.
    pub fn submitted_bundles(&self) -> Vec<Bundle> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                PlatformCall::SubmitBundle { bundle, .. } => Some(bundle),
                _ => None,
            })
            .collect()
    }

    pub fn pending_bundles(&self) -> Vec<(String, Bundle)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                PlatformCall::SubmitPending {
                    file_name, bundle, ..
                } => Some((file_name, bundle)),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: PlatformCall) {
        self.calls.lock().unwrap().push(call);
    }

    fn failure(
        &self,
        pick: impl FnOnce(&Failures) -> &Option<PlatformError>,
    ) -> Result<(), PlatformError> {
        let failures = self.failures.lock().unwrap();
        match pick(&*failures) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl WorkApi for MockPlatform {
    async fn initiate_work(&self, connector_id: &str, label: &str) -> Result<String, PlatformError> {
        self.record(PlatformCall::InitiateWork {
            connector_id: connector_id.to_string(),
            label: label.to_string(),
        });
        self.failure(|f| &f.initiate)?;
        let n = self.next_work.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(format!("work-{}", n))
    }

    async fn report_received(&self, work_id: &str, message: &str) -> Result<(), PlatformError> {
        self.record(PlatformCall::ReportReceived {
            work_id: work_id.to_string(),
            message: message.to_string(),
        });
        self.failure(|f| &f.received)
    }

    async fn report_processed(
        &self,
        work_id: &str,
        message: &str,
        is_error: bool,
    ) -> Result<(), PlatformError> {
        self.record(PlatformCall::ReportProcessed {
            work_id: work_id.to_string(),
            message: message.to_string(),
            is_error,
        });
        self.failure(|f| &f.processed)
    }
}

#[async_trait]
impl FileApi for MockPlatform {
    async fn fetch_file(&self, uri: &str, binary: bool) -> Result<Bytes, PlatformError> {
        self.record(PlatformCall::FetchFile {
            uri: uri.to_string(),
            binary,
        });
        self.files
            .lock()
            .unwrap()
            .get(uri)
            .cloned()
            .ok_or_else(|| PlatformError::Rejected {
                status: 404,
                message: format!("No file at {}", uri),
            })
    }
}

#[async_trait]
impl BundleApi for MockPlatform {
    async fn submit_bundle(
        &self,
        bundle: &Bundle,
        work_id: &str,
        applicant_id: Option<&str>,
        scope: Option<&[String]>,
    ) -> Result<(), PlatformError> {
        self.record(PlatformCall::SubmitBundle {
            bundle: bundle.clone(),
            work_id: work_id.to_string(),
            applicant_id: applicant_id.map(str::to_string),
            scope: scope.map(<[String]>::to_vec),
        });
        self.failure(|f| &f.bundles)
    }

    async fn submit_pending_bundle(
        &self,
        file_name: &str,
        bundle: &Bundle,
        mime_type: &str,
        entity_id: Option<&str>,
    ) -> Result<(), PlatformError> {
        self.record(PlatformCall::SubmitPending {
            file_name: file_name.to_string(),
            bundle: bundle.clone(),
            mime_type: mime_type.to_string(),
            entity_id: entity_id.map(str::to_string),
        });
        self.failure(|f| &f.bundles)
    }
}

#[async_trait]
impl EntityApi for MockPlatform {
    async fn read_entity(&self, id: &str) -> Result<Option<Entity>, PlatformError> {
        self.record(PlatformCall::ReadEntity { id: id.to_string() });
        self.failure(|f| &f.entities)?;
        Ok(self.entities.lock().unwrap().get(id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_work_ids_are_distinct() {
        let api = MockPlatform::new();
        let a = api.initiate_work("c1", "run").await.unwrap();
        let b = api.initiate_work("c1", "run").await.unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_failed_calls_are_recorded() {
        let api = MockPlatform::new();
        api.fail_processed_reports(PlatformError::Request("down".to_string()));

        assert!(api.report_processed("w1", "boom", true).await.is_err());
        assert_eq!(
            api.processed_reports("w1"),
            vec![("boom".to_string(), true)]
        );
    }

    #[tokio::test]
    async fn test_entities_and_files() {
        let api = MockPlatform::new().with_entity(Entity::new("e1"));
        api.set_file("https://p/storage/a.txt", "hello");

        assert!(api.read_entity("e1").await.unwrap().is_some());
        assert!(api.read_entity("e2").await.unwrap().is_none());
        assert_eq!(
            api.fetch_file("https://p/storage/a.txt", true).await.unwrap(),
            Bytes::from("hello")
        );
        assert!(matches!(
            api.fetch_file("https://p/storage/b.txt", true).await,
            Err(PlatformError::Rejected { status: 404, .. })
        ));
    }
}
