//! Enrichment lifecycle tests.

mod common;

use std::time::Duration;

use common::*;
use cti_connector::adapters::mock::PlatformCall;
use cti_connector::connector::{Connector, CycleOutcome, EnrichmentConnector, MessageConnector};
use cti_connector::models::{Entity, MarkingDefinition};
use cti_connector::state::LAST_RUN;
use cti_connector::tlp::TlpLevel;
use cti_connector::traits::PlatformError;
use serde_json::json;
use tokio::sync::mpsc;

const ENTITY: &str = "ipv4-addr--0b1e2d3c";

fn fixture_with(entity: Entity) -> PlatformFixture {
    let fixture = PlatformFixture::new();
    fixture.api.add_entity(entity);
    fixture
}

#[tokio::test]
async fn test_enrichment_success() {
    let fixture = fixture_with(Entity::new(ENTITY));
    let runner = ScriptedRunner::new(Scripted::ok("enriched", vec![indicator_bundle("i1")]));
    let connector = EnrichmentConnector::new(test_config(), fixture.platform(), runner.clone());

    let outcome = connector
        .process_broker_message(enrichment_message(ENTITY, "w1"))
        .await;

    assert_eq!(outcome, CycleOutcome::Completed { bundles_sent: 1 });
    assert_eq!(*runner.calls.lock().unwrap(), vec![ENTITY.to_string()]);
    assert_eq!(fixture.api.received_reports(), vec!["w1".to_string()]);
    assert_eq!(
        fixture.api.processed_reports("w1"),
        vec![("enriched".to_string(), false)]
    );
    assert!(fixture.api.calls().iter().any(|c| matches!(
        c,
        PlatformCall::SubmitBundle { work_id, applicant_id: Some(a), scope: None, .. }
            if work_id == "w1" && a == "user-1"
    )));
    assert!(fixture.store.current().last_run().is_some());
}

#[tokio::test]
async fn test_malformed_message_touches_nothing() {
    let fixture = PlatformFixture::new();
    let runner = ScriptedRunner::new(Scripted::ok("ok", vec![]));
    let connector = EnrichmentConnector::new(test_config(), fixture.platform(), runner.clone());

    let outcome = connector
        .process_broker_message(json!({"event": {}, "internal": {"work_id": "w1"}}))
        .await;

    assert!(matches!(outcome, CycleOutcome::Dropped(_)));
    assert!(fixture.api.calls().is_empty());
    assert!(fixture.store.writes().is_empty());
    assert_eq!(runner.call_count(), 0);
}

#[tokio::test]
async fn test_missing_entity_is_handled() {
    let fixture = PlatformFixture::new();
    let runner = ScriptedRunner::new(Scripted::ok("ok", vec![]));
    let connector = EnrichmentConnector::new(test_config(), fixture.platform(), runner.clone());

    let outcome = connector
        .process_broker_message(enrichment_message(ENTITY, "w1"))
        .await;

    assert!(matches!(outcome, CycleOutcome::Rejected(_)));
    assert_eq!(runner.call_count(), 0);
    let reports = fixture.api.processed_reports("w1");
    assert_eq!(reports.len(), 1);
    assert!(reports[0].1);
    assert!(reports[0].0.contains(ENTITY));

    let state = fixture.store.current();
    assert!(state.error().is_some());
    assert!(state.contains_key(LAST_RUN));
}

#[tokio::test]
async fn test_tlp_above_ceiling_is_rejected() {
    let entity = Entity::new(ENTITY).with_marking(MarkingDefinition::tlp("TLP:RED"));
    let fixture = fixture_with(entity);
    let runner = ScriptedRunner::new(Scripted::ok("ok", vec![]));
    let config = test_config().with_max_tlp(TlpLevel::Amber);
    let connector = EnrichmentConnector::new(config, fixture.platform(), runner.clone());

    let outcome = connector
        .process_broker_message(enrichment_message(ENTITY, "w1"))
        .await;

    assert!(matches!(outcome, CycleOutcome::Rejected(ref m) if m.contains("TLP:RED")));
    assert_eq!(runner.call_count(), 0);
    assert_eq!(fixture.api.processed_reports("w1").len(), 1);
    assert!(fixture.store.current().last_run().is_some());
}

#[tokio::test]
async fn test_tlp_within_ceiling_runs() {
    let entity = Entity::new(ENTITY).with_marking(MarkingDefinition::tlp("TLP:GREEN"));
    let fixture = fixture_with(entity);
    let runner = ScriptedRunner::new(Scripted::ok("ok", vec![]));
    let config = test_config().with_max_tlp(TlpLevel::Amber);
    let connector = EnrichmentConnector::new(config, fixture.platform(), runner.clone());

    let outcome = connector
        .process_broker_message(enrichment_message(ENTITY, "w1"))
        .await;

    assert!(outcome.is_completed());
    assert_eq!(runner.call_count(), 1);
}

#[tokio::test]
async fn test_unmarked_entity_counts_as_clear() {
    let fixture = fixture_with(Entity::new(ENTITY));
    let runner = ScriptedRunner::new(Scripted::ok("ok", vec![]));
    let config = test_config().with_max_tlp(TlpLevel::White);
    let connector = EnrichmentConnector::new(config, fixture.platform(), runner.clone());

    let outcome = connector
        .process_broker_message(enrichment_message(ENTITY, "w1"))
        .await;

    assert!(outcome.is_completed());
}

#[tokio::test]
async fn test_user_failure_reports_error_once() {
    let fixture = fixture_with(Entity::new(ENTITY));
    let runner = ScriptedRunner::new(Scripted::fail("lookup service down"));
    let connector = EnrichmentConnector::new(test_config(), fixture.platform(), runner);

    let outcome = connector
        .process_broker_message(enrichment_message(ENTITY, "w1"))
        .await;

    assert_eq!(outcome, CycleOutcome::Failed("lookup service down".to_string()));
    assert_eq!(
        fixture.api.processed_reports("w1"),
        vec![("lookup service down".to_string(), true)]
    );
    assert!(fixture.api.submitted_bundles().is_empty());
    assert!(!fixture.store.current().contains_key(LAST_RUN));
}

#[tokio::test]
async fn test_entity_read_failure_is_not_handled() {
    let fixture = PlatformFixture::new();
    fixture
        .api
        .fail_entity_reads(PlatformError::Request("timeout".to_string()));
    let runner = ScriptedRunner::new(Scripted::ok("ok", vec![]));
    let connector = EnrichmentConnector::new(test_config(), fixture.platform(), runner);

    let outcome = connector
        .process_broker_message(enrichment_message(ENTITY, "w1"))
        .await;

    assert!(matches!(outcome, CycleOutcome::Failed(_)));
    assert_eq!(fixture.api.processed_reports("w1").len(), 1);
}

#[tokio::test]
async fn test_start_consumes_inbox_until_closed() {
    let fixture = fixture_with(Entity::new(ENTITY));
    let runner = ScriptedRunner::new(Scripted::ok("ok", vec![]));
    let (tx, rx) = mpsc::channel(4);
    let connector = EnrichmentConnector::new(test_config(), fixture.platform(), runner.clone())
        .with_inbox(rx)
        .with_tick(Duration::from_millis(10));

    tx.send(enrichment_message(ENTITY, "w1")).await.unwrap();
    tx.send(json!({"garbage": true})).await.unwrap();
    tx.send(enrichment_message(ENTITY, "w2")).await.unwrap();
    drop(tx);

    let dispatched = tokio::time::timeout(Duration::from_secs(2), connector.start())
        .await
        .unwrap();

    assert_eq!(dispatched, 3);
    assert_eq!(runner.call_count(), 2);
    assert_eq!(fixture.api.processed_reports("w1").len(), 1);
    assert_eq!(fixture.api.processed_reports("w2").len(), 1);
}

#[tokio::test]
async fn test_start_without_inbox_returns() {
    let fixture = PlatformFixture::new();
    let runner = ScriptedRunner::new(Scripted::ok("ok", vec![]));
    let connector = EnrichmentConnector::new(test_config(), fixture.platform(), runner);

    assert_eq!(connector.start().await, 0);
}
