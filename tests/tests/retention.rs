//! Tests for DELETE /events retention purges.

use axum::http::StatusCode;
use integration_tests::{
    fixtures::{self, DAY_MS},
    setup::TestContext,
};

/// One event 40 days old and one fresh event.
async fn aged_context() -> TestContext {
    let ctx = TestContext::new();
    ctx.post("/events")
        .json(&fixtures::unique_page_view())
        .await
        .assert_status_ok();
    ctx.clock.advance(40 * DAY_MS);
    ctx.post("/events")
        .json(&fixtures::unique_page_view())
        .await
        .assert_status_ok();
    ctx.drain().await;
    ctx
}

#[tokio::test]
async fn test_dry_run_counts_without_deleting() {
    let ctx = aged_context().await;

    let response = ctx.delete("/events?daysOld=30&dryRun=true").await;
    response.assert_status_ok();

    let body: serde_json::Value = response.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["dryRun"], true);
    assert_eq!(body["wouldDelete"], 1);
    assert!(body.get("deleted").is_none());
    assert!(body["cutoffDate"].is_string());

    assert_eq!(ctx.store.rows().len(), 2);
    assert_eq!(ctx.store.delete_calls(), 0);
}

#[tokio::test]
async fn test_purge_deletes_old_events() {
    let ctx = aged_context().await;

    let response = ctx.delete("/events?daysOld=30").await;
    response.assert_status_ok();

    let body: serde_json::Value = response.json();
    assert_eq!(body["dryRun"], false);
    assert_eq!(body["deleted"], 1);
    assert!(body.get("wouldDelete").is_none());

    let rows = ctx.store.rows();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].created_at, (fixtures::T0_MS + 40 * DAY_MS) / 1000);
}

#[tokio::test]
async fn test_default_age_is_thirty_days() {
    let ctx = aged_context().await;

    let body: serde_json::Value = ctx.delete("/events?dryRun=true").await.json();
    assert_eq!(body["wouldDelete"], 1);
}

#[tokio::test]
async fn test_purge_is_scoped_to_caller() {
    let ctx = aged_context().await;

    let response = ctx
        .server
        .delete("/events?daysOld=30")
        .add_header(ctx.state.tenant_header.as_str(), "someone-else")
        .await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["deleted"], 0);
    assert_eq!(ctx.store.rows().len(), 2);
}

#[tokio::test]
async fn test_zero_days_returns_400() {
    let ctx = aged_context().await;

    let response = ctx.delete("/events?daysOld=0").await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "VALID_004");
    assert_eq!(ctx.store.rows().len(), 2);
}

#[tokio::test]
async fn test_unparsable_days_returns_400() {
    let ctx = TestContext::new();

    let response = ctx.delete("/events?daysOld=many").await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "VALID_004");
}
