//! File import lifecycle tests.

mod common;

use common::*;
use cti_connector::adapters::mock::PlatformCall;
use cti_connector::connector::{CycleOutcome, ImportFileConnector, MessageConnector};
use cti_connector::state::LAST_RUN;
use tempfile::TempDir;

const FILE_FETCH: &str = "/storage/get/import/global/report.json";

fn file_uri() -> String {
    format!("{}{}", TEST_URL, FILE_FETCH)
}

fn setup(script: Scripted) -> (PlatformFixture, ScriptedRunner, TempDir) {
    let fixture = PlatformFixture::new();
    fixture
        .api
        .set_file(&file_uri(), r#"{"type": "report", "name": "APT notes"}"#);
    let runner = ScriptedRunner::new(script);
    let dir = TempDir::new().unwrap();
    (fixture, runner, dir)
}

#[tokio::test]
async fn test_import_success_deletes_file_and_submits() {
    let (fixture, runner, dir) = setup(Scripted::ok("1 report", vec![indicator_bundle("i1")]));
    let config = test_config().with_download_dir(dir.path());
    let connector = ImportFileConnector::new(config, fixture.platform(), runner.clone());

    let outcome = connector
        .process_broker_message(import_file_message(FILE_FETCH, "w1"))
        .await;

    assert_eq!(outcome, CycleOutcome::Completed { bundles_sent: 1 });

    let files = runner.files.lock().unwrap().clone();
    assert_eq!(files.len(), 1);
    let (path, existed) = &files[0];
    assert!(*existed, "file must be on disk while user logic runs");
    assert_eq!(path, &dir.path().join("report.json"));
    assert!(!path.exists(), "file must be removed after success");

    assert!(fixture.api.calls().iter().any(|c| matches!(
        c,
        PlatformCall::FetchFile { uri, binary: true } if *uri == file_uri()
    )));
    assert_eq!(
        fixture.api.processed_reports("w1"),
        vec![("1 report".to_string(), false)]
    );
    assert!(fixture.api.calls().iter().any(|c| matches!(
        c,
        PlatformCall::SubmitBundle { work_id, applicant_id: Some(a), .. }
            if work_id == "w1" && a == "user-1"
    )));
    assert!(fixture.store.current().contains_key(LAST_RUN));
}

#[tokio::test]
async fn test_validate_before_import_parks_bundles() {
    let (fixture, runner, dir) = setup(Scripted::ok("ok", vec![indicator_bundle("i1")]));
    let config = test_config()
        .with_download_dir(dir.path())
        .with_validate_before_import(true);
    let connector = ImportFileConnector::new(config, fixture.platform(), runner);

    let outcome = connector
        .process_broker_message(import_file_message(FILE_FETCH, "w1"))
        .await;

    assert!(outcome.is_completed());
    assert!(fixture.api.submitted_bundles().is_empty());
    let pending: Vec<_> = fixture
        .api
        .calls()
        .into_iter()
        .filter_map(|c| match c {
            PlatformCall::SubmitPending {
                file_name,
                mime_type,
                entity_id,
                ..
            } => Some((file_name, mime_type, entity_id)),
            _ => None,
        })
        .collect();
    assert_eq!(
        pending,
        vec![(
            "report.json".to_string(),
            "application/json".to_string(),
            Some("report--1".to_string())
        )]
    );
}

#[tokio::test]
async fn test_failure_keeps_downloaded_file() {
    let (fixture, runner, dir) = setup(Scripted::fail("unsupported format"));
    let config = test_config().with_download_dir(dir.path());
    let connector = ImportFileConnector::new(config, fixture.platform(), runner);

    let outcome = connector
        .process_broker_message(import_file_message(FILE_FETCH, "w1"))
        .await;

    assert_eq!(outcome, CycleOutcome::Failed("unsupported format".to_string()));
    assert!(dir.path().join("report.json").exists());
    assert_eq!(
        fixture.api.processed_reports("w1"),
        vec![("unsupported format".to_string(), true)]
    );
    assert!(fixture.api.submitted_bundles().is_empty());
    assert_eq!(fixture.store.current().error(), Some("unsupported format"));
}

#[tokio::test]
async fn test_download_failure_is_reported() {
    let fixture = PlatformFixture::new();
    let runner = ScriptedRunner::new(Scripted::ok("ok", vec![]));
    let dir = TempDir::new().unwrap();
    let config = test_config().with_download_dir(dir.path());
    let connector = ImportFileConnector::new(config, fixture.platform(), runner.clone());

    let outcome = connector
        .process_broker_message(import_file_message("/storage/get/missing.pdf", "w1"))
        .await;

    assert!(matches!(outcome, CycleOutcome::Failed(_)));
    assert_eq!(runner.call_count(), 0);
    let reports = fixture.api.processed_reports("w1");
    assert_eq!(reports.len(), 1);
    assert!(reports[0].1);
}

#[tokio::test]
async fn test_reference_without_file_name() {
    let fixture = PlatformFixture::new();
    let runner = ScriptedRunner::new(Scripted::ok("ok", vec![]));
    let dir = TempDir::new().unwrap();
    let config = test_config().with_download_dir(dir.path());
    let connector = ImportFileConnector::new(config, fixture.platform(), runner.clone());

    let outcome = connector
        .process_broker_message(import_file_message("/storage/get/", "w1"))
        .await;

    assert!(matches!(outcome, CycleOutcome::Failed(_)));
    assert_eq!(runner.call_count(), 0);
    assert_eq!(fixture.api.received_reports(), vec!["w1".to_string()]);
    assert_eq!(fixture.api.processed_reports("w1").len(), 1);
}

#[tokio::test]
async fn test_malformed_message_is_dropped() {
    let fixture = PlatformFixture::new();
    let runner = ScriptedRunner::new(Scripted::ok("ok", vec![]));
    let connector = ImportFileConnector::new(test_config(), fixture.platform(), runner);

    let outcome = connector
        .process_broker_message(serde_json::json!({"event": {"file_fetch": FILE_FETCH}}))
        .await;

    assert!(matches!(outcome, CycleOutcome::Dropped(_)));
    assert!(fixture.api.calls().is_empty());
}
