//! Tests for single and batch ingestion through the write queue.

use integration_tests::{fixtures, setup::TestContext};
use std::time::{Duration, Instant};

#[tokio::test]
async fn test_event_acknowledged_before_store_write() {
    let ctx = TestContext::new();
    ctx.store.set_insert_delay(Duration::from_millis(500));

    let start = Instant::now();
    let response = ctx.post("/events").json(&fixtures::unique_page_view()).await;
    let elapsed = start.elapsed();

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["success"], true);
    assert!(body.get("cached").is_none());
    assert!(
        elapsed < Duration::from_millis(500),
        "response took {:?}, should not wait for the store",
        elapsed
    );
    assert!(ctx.store.rows().is_empty(), "insert should still be pending");

    ctx.drain().await;
    assert_eq!(ctx.store.rows().len(), 1);
}

#[tokio::test]
async fn test_duplicate_within_window_is_cached() {
    let ctx = TestContext::new();
    let event = fixtures::page_view("session-1");

    let first = ctx.post("/events").json(&event).await;
    first.assert_status_ok();

    ctx.clock.advance(1_000);
    let second = ctx.post("/events").json(&event).await;
    second.assert_status_ok();
    let body: serde_json::Value = second.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["cached"], true);

    ctx.drain().await;
    assert_eq!(ctx.store.insert_calls(), 1, "duplicate must not be persisted");

    // Past the 5s window the same event counts again
    ctx.clock.advance(5_000);
    let third = ctx.post("/events").json(&event).await;
    third.assert_status_ok();
    let body: serde_json::Value = third.json();
    assert!(body.get("cached").is_none());

    ctx.drain().await;
    assert_eq!(ctx.store.insert_calls(), 2);
}

#[tokio::test]
async fn test_distinct_sessions_are_not_duplicates() {
    let ctx = TestContext::new();

    ctx.post("/events")
        .json(&fixtures::page_view("a"))
        .await
        .assert_status_ok();
    ctx.post("/events")
        .json(&fixtures::page_view("b"))
        .await
        .assert_status_ok();

    ctx.drain().await;
    assert_eq!(ctx.store.rows().len(), 2);
}

#[tokio::test]
async fn test_stored_event_is_enriched() {
    let ctx = TestContext::new();

    ctx.post("/events")
        .json(&fixtures::add_to_cart("s-42", 42, 19.99))
        .await
        .assert_status_ok();
    ctx.drain().await;

    let rows = ctx.store.rows();
    assert_eq!(rows.len(), 1);
    let row = &rows[0];
    assert_eq!(row.tenant_id.as_str(), fixtures::TENANT);
    assert_eq!(row.product_id, Some(42));
    assert_eq!(row.price, Some(19.99));
    assert_eq!(row.quantity, Some(1));
    assert!(row.session_hash.is_some());
    assert_eq!(row.created_at, fixtures::T0_MS / 1000);
}

#[tokio::test]
async fn test_batch_of_max_size_is_persisted() {
    let ctx = TestContext::new();

    let payload = fixtures::batch_payload(fixtures::page_views(100));
    let response = ctx.post("/events/batch").json(&payload).await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["processed"], 100);
    assert_eq!(body["timestamp"], fixtures::T0_MS);

    ctx.drain().await;
    assert_eq!(ctx.store.rows().len(), 100);
}

#[tokio::test]
async fn test_batch_settles_all_events() {
    let ctx = TestContext::new();

    let events = vec![
        fixtures::unique_page_view(),
        fixtures::without(fixtures::unique_page_view(), "action"),
        fixtures::unique_page_view(),
    ];
    let response = ctx
        .post("/events/batch")
        .json(&fixtures::batch_payload(events))
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["processed"], 3);

    ctx.drain().await;
    assert_eq!(
        ctx.store.rows().len(),
        2,
        "invalid member should fail alone without blocking the others"
    );
}

#[tokio::test]
async fn test_batch_skips_dedup() {
    let ctx = TestContext::new();
    let event = fixtures::page_view("same");

    ctx.post("/events/batch")
        .json(&fixtures::batch_payload(vec![event.clone(), event]))
        .await
        .assert_status_ok();

    ctx.drain().await;
    assert_eq!(ctx.store.rows().len(), 2);
}

#[tokio::test]
async fn test_store_failure_does_not_reach_client() {
    let ctx = TestContext::new();
    ctx.store.set_should_fail(true);

    let response = ctx.post("/events").json(&fixtures::unique_page_view()).await;
    response.assert_status_ok();

    ctx.drain().await;
    assert_eq!(ctx.store.insert_calls(), 0, "failing intern stops before insert");
    assert!(ctx.store.rows().is_empty());
}
