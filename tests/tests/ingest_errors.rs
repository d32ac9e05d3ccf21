//! Tests for rejected submissions.
//!
//! Every rejection must be answered without touching the Event Store.

use axum::http::StatusCode;
use integration_tests::{fixtures, setup::TestContext};

/// Missing category returns VALID_003 and lists the field
#[tokio::test]
async fn test_missing_category_returns_400() {
    let ctx = TestContext::new();

    let event = fixtures::without(fixtures::unique_page_view(), "category");
    let response = ctx.post("/events").json(&event).await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "VALID_003");
    assert_eq!(body["details"], serde_json::json!(["category"]));

    ctx.drain().await;
    assert_eq!(ctx.store.insert_calls(), 0);
}

/// Blank required fields count as missing
#[tokio::test]
async fn test_blank_fields_are_missing() {
    let ctx = TestContext::new();

    let mut event = fixtures::unique_page_view();
    event["event"] = serde_json::json!("   ");
    event["action"] = serde_json::json!("");
    let response = ctx.post("/events").json(&event).await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "VALID_003");
    assert_eq!(body["details"], serde_json::json!(["event", "action"]));
}

/// Malformed JSON returns VALID_001
#[tokio::test]
async fn test_malformed_json_returns_400() {
    let ctx = TestContext::new();

    let response = ctx
        .post("/events")
        .content_type("application/json")
        .bytes("{\"event\": \"page_view\",".to_string().into())
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "VALID_001");

    ctx.drain().await;
    assert_eq!(ctx.store.insert_calls(), 0);
}

/// Wrong field types are payload errors, not missing fields
#[tokio::test]
async fn test_wrong_field_type_returns_400() {
    let ctx = TestContext::new();

    let mut event = fixtures::unique_page_view();
    event["value"] = serde_json::json!("not a number");
    let response = ctx.post("/events").json(&event).await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "VALID_001");
}

/// Over-long field values fail validation
#[tokio::test]
async fn test_oversized_field_returns_400() {
    let ctx = TestContext::new();

    let mut event = fixtures::unique_page_view();
    event["label"] = serde_json::json!("x".repeat(600));
    let response = ctx.post("/events").json(&event).await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "VALID_001");
}

/// A batch over the cap is rejected whole
#[tokio::test]
async fn test_oversized_batch_returns_400() {
    let ctx = TestContext::new();

    let payload = fixtures::batch_payload(fixtures::page_views(101));
    let response = ctx.post("/events/batch").json(&payload).await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "VALID_002");

    ctx.drain().await;
    assert_eq!(ctx.store.insert_calls(), 0);
}

#[tokio::test]
async fn test_empty_batch_returns_400() {
    let ctx = TestContext::new();

    let response = ctx
        .post("/events/batch")
        .json(&fixtures::batch_payload(Vec::new()))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "VALID_002");
}

#[tokio::test]
async fn test_batch_without_events_array_returns_400() {
    let ctx = TestContext::new();

    let response = ctx
        .post("/events/batch")
        .json(&serde_json::json!({ "events": "nope" }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "VALID_001");
}

/// Malformed tenant header returns TENANT_001
#[tokio::test]
async fn test_malformed_tenant_returns_400() {
    let ctx = TestContext::new();

    let response = ctx
        .server
        .post("/events")
        .add_header(ctx.state.tenant_header.as_str(), "not a tenant!")
        .json(&fixtures::unique_page_view())
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "TENANT_001");
}

/// Requests without a tenant header fall back to the default tenant
#[tokio::test]
async fn test_missing_tenant_uses_default() {
    let ctx = TestContext::new();

    ctx.server
        .post("/events")
        .json(&fixtures::unique_page_view())
        .await
        .assert_status_ok();

    ctx.drain().await;
    let rows = ctx.store.rows();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].tenant_id.as_str(), "default");
}
