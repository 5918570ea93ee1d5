//! Reqwest adapters against a local mock server.

mod common;

use std::sync::Arc;

use common::*;
use cti_connector::adapters::{HttpFileFetcher, ReqwestHttpClient};
use cti_connector::config::{ConnectorConfig, StreamSettings};
use cti_connector::connector::{
    Connector, ImportFileConnector, MessageConnector, Platform, StreamConnector, StreamExit,
};
use cti_connector::state::START_FROM;
use cti_connector::traits::HttpClient;
use tempfile::TempDir;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config_for(server: &MockServer) -> ConnectorConfig {
    ConnectorConfig::new("connector-test", server.uri())
        .with_token("test-token")
        .with_ssl_verify(true)
}

fn reqwest_client(config: &ConnectorConfig) -> Arc<dyn HttpClient> {
    Arc::new(ReqwestHttpClient::from_config(config).unwrap())
}

#[tokio::test]
async fn test_stream_over_http() {
    let server = MockServer::start().await;
    let body = concat!(
        ": keep-alive\n\n",
        "id: 1700000000000-0\nevent: connected\ndata: {}\n\n",
        "id: 1700000000001-0\nevent: create\ndata: {\"id\": \"indicator--1\"}\n\n",
        "id: 1700000000002-0\nevent: delete\ndata: {\"id\": \"indicator--1\"}\n\n",
    );
    Mock::given(method("GET"))
        .and(path("/stream/live-1"))
        .and(query_param("from", "0-0"))
        .and(query_param("recover", "2024-01-01T00:00:00Z"))
        .and(header("authorization", "Bearer test-token"))
        .and(header("listen-delete", "true"))
        .and(header("accept", "text/event-stream"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .expect(1)
        .mount(&server)
        .await;

    let fixture = PlatformFixture::new();
    let config = config_for(&server).with_stream(StreamSettings {
        live_stream_id: Some("live-1".to_string()),
        recover_iso_date: Some("2024-01-01T00:00:00Z".to_string()),
        ..StreamSettings::default()
    });
    let runner = RecordingStreamRunner::new();
    let connector = StreamConnector::new(
        config.clone(),
        fixture.platform(),
        reqwest_client(&config),
        runner.clone(),
    );

    let exit = connector.start().await;

    assert_eq!(exit, StreamExit::Ended);
    assert_eq!(
        runner.seen_ids(),
        vec!["1700000000001-0", "1700000000002-0"]
    );
    assert_eq!(
        fixture.store.current().get_str(START_FROM),
        Some("1700000000002-0")
    );
    assert_eq!(fixture.api.submitted_bundles().len(), 2);
}

#[tokio::test]
async fn test_stream_rejected_by_server() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/stream"))
        .respond_with(ResponseTemplate::new(403).set_body_string("forbidden"))
        .mount(&server)
        .await;

    let fixture = PlatformFixture::new();
    let config = config_for(&server);
    let connector = StreamConnector::new(
        config.clone(),
        fixture.platform(),
        reqwest_client(&config),
        RecordingStreamRunner::new(),
    );

    let exit = connector.start().await;

    assert!(matches!(exit, StreamExit::Transport(ref m) if m.contains("403")));
    assert!(fixture.store.current().error().is_some());
}

#[tokio::test]
async fn test_import_file_downloads_over_http() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/storage/get/import/global/report.json"))
        .and(header("authorization", "Bearer test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"type": "report"}"#))
        .expect(1)
        .mount(&server)
        .await;

    let fixture = PlatformFixture::new();
    let dir = TempDir::new().unwrap();
    let config = config_for(&server).with_download_dir(dir.path());
    let files = Arc::new(HttpFileFetcher::new(reqwest_client(&config), "test-token"));
    let platform = Platform::new(
        fixture.api.clone(),
        files,
        fixture.api.clone(),
        fixture.api.clone(),
        fixture.store.clone(),
    );
    let runner = ScriptedRunner::new(Scripted::ok("parsed", vec![indicator_bundle("i1")]));
    let connector = ImportFileConnector::new(config, platform, runner.clone());

    let outcome = connector
        .process_broker_message(import_file_message(
            "/storage/get/import/global/report.json",
            "w1",
        ))
        .await;

    assert!(outcome.is_completed(), "{:?}", outcome);
    let files = runner.files.lock().unwrap().clone();
    assert_eq!(files.len(), 1);
    assert!(files[0].1);
    assert!(!files[0].0.exists());
}

#[tokio::test]
async fn test_missing_file_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let fixture = PlatformFixture::new();
    let dir = TempDir::new().unwrap();
    let config = config_for(&server).with_download_dir(dir.path());
    let files = Arc::new(HttpFileFetcher::new(reqwest_client(&config), "test-token"));
    let platform = Platform::new(
        fixture.api.clone(),
        files,
        fixture.api.clone(),
        fixture.api.clone(),
        fixture.store.clone(),
    );
    let runner = ScriptedRunner::new(Scripted::ok("parsed", vec![]));
    let connector = ImportFileConnector::new(config, platform, runner.clone());

    let outcome = connector
        .process_broker_message(import_file_message("/storage/get/gone.json", "w1"))
        .await;

    assert!(!outcome.is_completed());
    assert_eq!(runner.call_count(), 0);
    let reports = fixture.api.processed_reports("w1");
    assert_eq!(reports.len(), 1);
    assert!(reports[0].1);
}
