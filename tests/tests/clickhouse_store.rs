//! End-to-end tests against a real ClickHouse Event Store.
//!
//! Requires Docker (or `PIPELINE_TEST_CLICKHOUSE_URL`). Run with
//! `--ignored`.

use api::{router, AppState, PipelineConfig};
use axum_test::TestServer;
use event_store::clickhouse_store::health::init_schema;
use event_store::{ClickHouseClient, ClickHouseEventStore, EventStore, SharedEventStore};
use integration_tests::{
    containers::TestContainers,
    fixtures::{self, DAY_MS, T0_MS},
};
use pipeline_core::{Dictionary, EventQuery, ManualClock, SharedClock, TenantId};
use std::sync::Arc;
use uuid::Uuid;

async fn clickhouse_store() -> (TestContainers, ClickHouseEventStore) {
    let containers = TestContainers::start().await;
    let client = ClickHouseClient::new(containers.clickhouse.clone())
        .expect("Failed to create ClickHouse client");
    init_schema(&client)
        .await
        .expect("Failed to initialize schema");
    (containers, ClickHouseEventStore::new(client))
}

/// Fresh tenant so tests sharing a server never see each other's rows.
fn fresh_tenant() -> String {
    format!("t-{}", Uuid::new_v4().simple())
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_intern_is_idempotent() {
    let (_containers, store) = clickhouse_store().await;
    let name = format!("event-{}", Uuid::new_v4());

    let first = store.intern(Dictionary::EventType, &name).await.unwrap();
    let second = store.intern(Dictionary::EventType, &name).await.unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_intern_rehashes_taken_id() {
    let (_containers, store) = clickhouse_store().await;
    let client = store.client();
    let table = client.table(Dictionary::Page.table());
    let page = format!("/products/{}", Uuid::new_v4());
    let squatter = format!("/other/{}", Uuid::new_v4());

    // Occupy the id the page would hash to with a different value.
    client
        .inner()
        .query(&format!("INSERT INTO {table} (id, name) SELECT sipHash64(?), ?"))
        .bind(page.as_str())
        .bind(squatter.as_str())
        .execute()
        .await
        .expect("Failed to seed dictionary row");
    let taken: u64 = client
        .inner()
        .query(&format!("SELECT id FROM {table} WHERE name = ?"))
        .bind(squatter.as_str())
        .fetch_one()
        .await
        .unwrap();

    let id = store.intern(Dictionary::Page, &page).await.unwrap();
    assert_ne!(id, taken);
    assert_eq!(store.intern(Dictionary::Page, &page).await.unwrap(), id);
    assert_eq!(store.intern(Dictionary::Page, &squatter).await.unwrap(), taken);

    client
        .inner()
        .query(&format!("OPTIMIZE TABLE {table} FINAL"))
        .execute()
        .await
        .unwrap();
    let names: Vec<String> = client
        .inner()
        .query(&format!("SELECT name FROM {table} FINAL WHERE id IN (?, ?) ORDER BY id"))
        .bind(id)
        .bind(taken)
        .fetch_all()
        .await
        .unwrap();
    assert_eq!(names.len(), 2);
    assert!(names.contains(&page) && names.contains(&squatter));
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_pipeline_round_trip() {
    let (_containers, store) = clickhouse_store().await;
    let tenant = fresh_tenant();

    let clock = Arc::new(ManualClock::new(T0_MS));
    let shared_store: SharedEventStore = Arc::new(store.clone());
    let shared_clock: SharedClock = clock.clone();
    let state = AppState::build(&PipelineConfig::default(), shared_store, shared_clock)
        .expect("Failed to assemble pipeline");
    let server = TestServer::new(router(state.clone())).expect("Failed to create test server");
    let header = state.tenant_header.clone();

    server
        .post("/events")
        .add_header(header.as_str(), tenant.as_str())
        .json(&fixtures::add_to_cart("ch-session", 9, 12.5))
        .await
        .assert_status_ok();
    clock.advance(40 * DAY_MS);
    server
        .post("/events/batch")
        .add_header(header.as_str(), tenant.as_str())
        .json(&fixtures::batch_payload(fixtures::page_views(3)))
        .await
        .assert_status_ok();
    state.queue.wait_idle().await;

    let body: serde_json::Value = server
        .get("/events?category=shop")
        .add_header(header.as_str(), tenant.as_str())
        .await
        .json();
    assert_eq!(body["pagination"]["total"], 1);
    assert_eq!(body["events"][0]["action"], "add_to_cart");
    assert_eq!(body["events"][0]["productId"], 9);

    let body: serde_json::Value = server
        .delete("/events?daysOld=30")
        .add_header(header.as_str(), tenant.as_str())
        .await
        .json();
    assert_eq!(body["deleted"], 1);

    let tenant_id = TenantId::parse(&tenant).unwrap();
    let page = store.query(&EventQuery::for_tenant(tenant_id)).await.unwrap();
    assert_eq!(page.total, 3);
    assert!(page.records.iter().all(|r| r.event_type == "page_view"));
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_count_before_matches_delete() {
    let (_containers, store) = clickhouse_store().await;
    let tenant = TenantId::parse(fresh_tenant()).unwrap();

    let clock = Arc::new(ManualClock::new(T0_MS));
    let shared_store: SharedEventStore = Arc::new(store.clone());
    let shared_clock: SharedClock = clock.clone();
    let state = AppState::build(&PipelineConfig::default(), shared_store, shared_clock)
        .expect("Failed to assemble pipeline");

    for _ in 0..4 {
        state
            .ingress
            .submit(
                serde_json::from_value(fixtures::unique_page_view()).unwrap(),
                tenant.clone(),
            )
            .await
            .unwrap();
    }
    state.queue.wait_idle().await;

    let cutoff = T0_MS / 1000 + 1;
    assert_eq!(store.count_before(Some(&tenant), cutoff).await.unwrap(), 4);
    assert_eq!(store.delete_before(Some(&tenant), cutoff).await.unwrap(), 4);
    assert_eq!(store.count_before(Some(&tenant), cutoff).await.unwrap(), 0);
}
