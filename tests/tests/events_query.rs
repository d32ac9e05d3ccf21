//! Tests for GET /events filtering and pagination.

use axum::http::StatusCode;
use integration_tests::{
    fixtures::{self, DAY_MS},
    setup::TestContext,
};

/// Seeds `n` page views one minute apart, returning the context.
async fn seeded(n: usize) -> TestContext {
    let ctx = TestContext::new();
    for _ in 0..n {
        ctx.post("/events")
            .json(&fixtures::unique_page_view())
            .await
            .assert_status_ok();
        ctx.clock.advance(60_000);
    }
    ctx.drain().await;
    ctx
}

#[tokio::test]
async fn test_list_returns_newest_first_with_pagination() {
    let ctx = seeded(5).await;

    let response = ctx.get("/events?limit=2&page=2").await;
    response.assert_status_ok();

    let body: serde_json::Value = response.json();
    let events = body["events"].as_array().expect("events array");
    assert_eq!(events.len(), 2);
    assert!(events[0]["createdAt"].as_i64() > events[1]["createdAt"].as_i64());

    let pagination = &body["pagination"];
    assert_eq!(pagination["total"], 5);
    assert_eq!(pagination["limit"], 2);
    assert_eq!(pagination["offset"], 2);
    assert_eq!(pagination["page"], 2);
    assert_eq!(pagination["hasMore"], true);
}

#[tokio::test]
async fn test_last_page_has_no_more() {
    let ctx = seeded(5).await;

    let body: serde_json::Value = ctx.get("/events?limit=2&offset=4").await.json();
    assert_eq!(body["events"].as_array().map(Vec::len), Some(1));
    assert_eq!(body["pagination"]["hasMore"], false);
    assert_eq!(body["pagination"]["page"], 3);
}

#[tokio::test]
async fn test_filter_by_session_id() {
    let ctx = TestContext::new();
    ctx.post("/events")
        .json(&fixtures::page_view("wanted"))
        .await
        .assert_status_ok();
    ctx.post("/events")
        .json(&fixtures::page_view("other"))
        .await
        .assert_status_ok();
    ctx.drain().await;

    let body: serde_json::Value = ctx.get("/events?sessionId=wanted").await.json();
    assert_eq!(body["pagination"]["total"], 1);
    let event = &body["events"][0];
    assert_eq!(event["event"], "page_view");
    assert!(event.get("sessionId").is_none(), "raw session ids are never stored");
    assert!(event["sessionHash"].is_string());
}

#[tokio::test]
async fn test_filter_by_names() {
    let ctx = TestContext::new();
    ctx.post("/events")
        .json(&fixtures::unique_page_view())
        .await
        .assert_status_ok();
    ctx.post("/events")
        .json(&fixtures::add_to_cart("cart-session", 7, 5.0))
        .await
        .assert_status_ok();
    ctx.drain().await;

    let body: serde_json::Value = ctx.get("/events?category=shop&action=add_to_cart").await.json();
    assert_eq!(body["pagination"]["total"], 1);
    assert_eq!(body["events"][0]["productId"], 7);
    assert_eq!(body["events"][0]["metadata"]["productName"], "Product 7");

    let body: serde_json::Value = ctx.get("/events?eventType=nothing").await.json();
    assert_eq!(body["pagination"]["total"], 0);
}

#[tokio::test]
async fn test_filter_by_date_range() {
    let ctx = TestContext::new();
    ctx.post("/events")
        .json(&fixtures::unique_page_view())
        .await
        .assert_status_ok();
    ctx.clock.advance(2 * DAY_MS);
    ctx.post("/events")
        .json(&fixtures::unique_page_view())
        .await
        .assert_status_ok();
    ctx.drain().await;

    // Date-only end bound includes the whole day
    let body: serde_json::Value = ctx
        .get("/events?startDate=2026-01-15&endDate=2026-01-15")
        .await
        .json();
    assert_eq!(body["pagination"]["total"], 1);

    let body: serde_json::Value = ctx.get("/events?startDate=2026-01-16").await.json();
    assert_eq!(body["pagination"]["total"], 1);
}

#[tokio::test]
async fn test_other_tenants_are_invisible() {
    let ctx = seeded(2).await;

    let response = ctx
        .server
        .get("/events")
        .add_header(ctx.state.tenant_header.as_str(), "someone-else")
        .await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["pagination"]["total"], 0);
}

#[tokio::test]
async fn test_bad_date_returns_400() {
    let ctx = TestContext::new();

    let response = ctx.get("/events?startDate=yesterday").await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "VALID_004");
}

#[tokio::test]
async fn test_store_outage_returns_500() {
    let ctx = TestContext::new();
    ctx.store.set_should_fail(true);

    let response = ctx.get("/events").await;
    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "STORE_001");
}
