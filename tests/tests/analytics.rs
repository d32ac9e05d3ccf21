//! Tests for cached analytics metrics.

use axum::http::StatusCode;
use integration_tests::{
    fixtures::{self, DAY_MS},
    setup::TestContext,
};

async fn seeded() -> TestContext {
    let ctx = TestContext::new();
    ctx.post("/events")
        .json(&fixtures::page_view("s1"))
        .await
        .assert_status_ok();
    ctx.post("/events")
        .json(&fixtures::add_to_cart("s1", 1, 10.0))
        .await
        .assert_status_ok();
    ctx.post("/events")
        .json(&fixtures::page_view("s2"))
        .await
        .assert_status_ok();
    ctx.drain().await;
    ctx
}

#[tokio::test]
async fn test_daily_metrics_for_today() {
    let ctx = seeded().await;

    let response = ctx.get("/analytics/metrics").await;
    response.assert_status_ok();

    let body: serde_json::Value = response.json();
    assert_eq!(body["window"], "daily");
    assert_eq!(body["startDate"], "2026-01-15");
    assert_eq!(body["endDate"], "2026-01-15");

    let metrics = &body["metrics"];
    assert_eq!(metrics["totalEvents"], 3);
    assert_eq!(metrics["ecommerce"]["cartAdditions"], 1);
    assert_eq!(metrics["engagement"]["uniqueSessions"], 2);
    assert_eq!(metrics["engagement"]["pageViews"], 2);
}

#[tokio::test]
async fn test_repeat_reads_hit_cache() {
    let ctx = seeded().await;

    ctx.get("/analytics/metrics").await.assert_status_ok();
    let queries = ctx.store.query_calls();

    ctx.get("/analytics/metrics").await.assert_status_ok();
    assert_eq!(ctx.store.query_calls(), queries, "second read should be cached");
}

#[tokio::test]
async fn test_new_event_invalidates_cached_metrics() {
    let ctx = seeded().await;

    let before: serde_json::Value = ctx.get("/analytics/metrics").await.json();
    assert_eq!(before["metrics"]["totalEvents"], 3);

    ctx.post("/events")
        .json(&fixtures::page_view("s3"))
        .await
        .assert_status_ok();
    ctx.drain().await;

    let after: serde_json::Value = ctx.get("/analytics/metrics").await.json();
    assert_eq!(after["metrics"]["totalEvents"], 4);
}

#[tokio::test]
async fn test_entry_expires_after_window_ttl() {
    let ctx = seeded().await;

    ctx.get("/analytics/metrics?window=realtime").await.assert_status_ok();
    let queries = ctx.store.query_calls();

    ctx.clock.advance(31_000);
    ctx.get("/analytics/metrics?window=realtime").await.assert_status_ok();
    assert_eq!(ctx.store.query_calls(), queries + 1);
}

#[tokio::test]
async fn test_purge_invalidates_cached_metrics() {
    let ctx = seeded().await;
    ctx.clock.advance(40 * DAY_MS);

    let range = "/analytics/metrics?startDate=2026-01-15&endDate=2026-01-15";
    let before: serde_json::Value = ctx.get(range).await.json();
    assert_eq!(before["metrics"]["totalEvents"], 3);

    ctx.delete("/events?daysOld=30").await.assert_status_ok();

    let after: serde_json::Value = ctx.get(range).await.json();
    assert_eq!(after["metrics"]["totalEvents"], 0);
}

#[tokio::test]
async fn test_session_scope_is_cached_separately() {
    let ctx = seeded().await;

    ctx.get("/analytics/metrics").await.assert_status_ok();
    let body: serde_json::Value = ctx.get("/analytics/metrics?sessionId=s1").await.json();
    assert_eq!(body["metrics"]["totalEvents"], 2);
}

#[tokio::test]
async fn test_unknown_window_returns_400() {
    let ctx = TestContext::new();

    let response = ctx.get("/analytics/metrics?window=hourly").await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "VALID_004");
}

#[tokio::test]
async fn test_inverted_range_returns_400() {
    let ctx = TestContext::new();

    let response = ctx
        .get("/analytics/metrics?startDate=2026-01-10&endDate=2026-01-09")
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
}
