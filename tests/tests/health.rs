//! Tests for health check endpoints.

use axum::http::StatusCode;
use integration_tests::setup::TestContext;

/// Test /health endpoint returns proper structure
#[tokio::test]
async fn test_health_endpoint_structure() {
    let ctx = TestContext::new();

    let response = ctx.server.get("/health").await;
    response.assert_status_ok();

    let body: serde_json::Value = response.json();

    for field in [
        "status",
        "store_connected",
        "write_queue_running",
        "queue_depth",
        "report",
        "metrics",
    ] {
        assert!(body.get(field).is_some(), "Response should have '{}' field", field);
    }
    assert!(body["queue_depth"].as_u64().is_some());
}

/// Test /health reports the store and queue of this instance
#[tokio::test]
async fn test_health_reports_components() {
    let ctx = TestContext::new();

    let body: serde_json::Value = ctx.server.get("/health").await.json();
    assert_eq!(body["store_connected"], true);
    assert_eq!(body["write_queue_running"], true);

    let status = body["status"].as_str().unwrap_or("");
    assert!(
        status == "healthy" || status == "degraded" || status == "unhealthy",
        "unexpected status '{}'",
        status
    );
}

#[tokio::test]
async fn test_ready_when_store_reachable() {
    let ctx = TestContext::new();
    ctx.server.get("/health/ready").await.assert_status_ok();
}

#[tokio::test]
async fn test_not_ready_when_store_unreachable() {
    let ctx = TestContext::new();
    ctx.store.set_should_fail(true);

    ctx.server
        .get("/health/ready")
        .await
        .assert_status(StatusCode::SERVICE_UNAVAILABLE);

    let body: serde_json::Value = ctx.server.get("/health").await.json();
    assert_eq!(body["store_connected"], false);
}

#[tokio::test]
async fn test_not_ready_after_queue_shutdown() {
    let ctx = TestContext::new();
    ctx.state.queue.shutdown().await;

    ctx.server
        .get("/health/ready")
        .await
        .assert_status(StatusCode::SERVICE_UNAVAILABLE);

    // Submissions are refused once the queue is closed
    let response = ctx
        .post("/events")
        .json(&integration_tests::fixtures::unique_page_view())
        .await;
    response.assert_status(StatusCode::SERVICE_UNAVAILABLE);
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "QUEUE_001");
}

/// Test /health/live endpoint returns 200 while the process runs
#[tokio::test]
async fn test_live_endpoint() {
    let ctx = TestContext::new();

    let response = ctx.server.get("/health/live").await;
    let status = response.status_code();
    assert!(
        status == StatusCode::OK || status == StatusCode::SERVICE_UNAVAILABLE,
        "Live endpoint should return 200 or 503, got {}",
        status
    );
}

/// Health endpoints do not need a tenant
#[tokio::test]
async fn test_health_endpoints_ignore_tenant_header() {
    let ctx = TestContext::new();

    let response = ctx
        .server
        .get("/health/ready")
        .add_header(ctx.state.tenant_header.as_str(), "not a tenant!")
        .await;
    response.assert_status_ok();
}
