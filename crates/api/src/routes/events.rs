//! Event endpoints: single and batch ingestion, listing and retention.

use axum::{extract::State, Json};
use pipeline_core::hashing::session_hash;
use pipeline_core::limits::{DEFAULT_QUERY_LIMIT, DEFAULT_RETENTION_DAYS, MAX_QUERY_LIMIT};
use pipeline_core::query::{parse_date_bound, DateBound};
use pipeline_core::{BatchPayload, EventQuery, TelemetryEvent};
use serde::Deserialize;
use std::time::Instant;
use telemetry::metrics;
use tracing::{debug, info};

use crate::extractors::{ApiJson, ApiQuery, Tenant};
use crate::response::{
    ApiError, BatchResponse, EventAccepted, EventView, EventsResponse, Pagination, PurgeResponse,
};
use crate::state::AppState;

/// POST /events
///
/// Answers once the event is validated, deduplicated and queued.
pub async fn submit_event(
    State(state): State<AppState>,
    Tenant(tenant): Tenant,
    ApiJson(event): ApiJson<TelemetryEvent>,
) -> Result<Json<EventAccepted>, ApiError> {
    let start = Instant::now();
    let submitted = state.ingress.submit(event, tenant.clone()).await?;

    let latency_ms = start.elapsed().as_millis() as u64;
    metrics().ingest_latency_ms.observe(latency_ms);
    debug!(tenant = %tenant, cached = submitted.cached, latency_ms, "Event accepted");

    Ok(Json(EventAccepted::new(submitted.cached)))
}

/// POST /events/batch
pub async fn submit_batch(
    State(state): State<AppState>,
    Tenant(tenant): Tenant,
    ApiJson(payload): ApiJson<BatchPayload>,
) -> Result<Json<BatchResponse>, ApiError> {
    let start = Instant::now();
    let accepted = state.batch.submit_batch(payload, tenant.clone()).await?;

    let latency_ms = start.elapsed().as_millis() as u64;
    metrics().ingest_latency_ms.observe(latency_ms);
    info!(
        tenant = %tenant,
        processed = accepted.processed,
        latency_ms,
        "Batch scheduled"
    );

    Ok(Json(BatchResponse {
        success: true,
        processed: accepted.processed,
        timestamp: accepted.timestamp,
    }))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    pub session_id: Option<String>,
    pub session_hash: Option<String>,
    pub visitor_hash: Option<String>,
    pub user_id: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub event_type: Option<String>,
    pub category: Option<String>,
    pub action: Option<String>,
    pub limit: Option<u32>,
    /// 1-based; ignored when `offset` is given
    pub page: Option<u32>,
    pub offset: Option<u32>,
}

impl ListParams {
    fn into_query(self, tenant: pipeline_core::TenantId) -> Result<EventQuery, ApiError> {
        let limit = self.limit.unwrap_or(DEFAULT_QUERY_LIMIT).clamp(1, MAX_QUERY_LIMIT);
        let offset = match (self.offset, self.page) {
            (Some(offset), _) => offset,
            (None, Some(page)) => page.max(1).saturating_sub(1).saturating_mul(limit),
            (None, None) => 0,
        };

        let session = self
            .session_hash
            .or_else(|| self.session_id.as_deref().map(|sid| session_hash(&tenant, sid)));
        let start = self
            .start_date
            .as_deref()
            .map(|raw| parse_date_bound(raw, DateBound::Start))
            .transpose()?;
        let end = self
            .end_date
            .as_deref()
            .map(|raw| parse_date_bound(raw, DateBound::End))
            .transpose()?;

        let mut query = EventQuery::for_tenant(tenant).with_page(Some(limit), offset);
        query.session_hash = session;
        query.visitor_hash = self.visitor_hash;
        query.user_id = self.user_id;
        query.start = start;
        query.end = end;
        query.event_type = self.event_type;
        query.category = self.category;
        query.action = self.action;
        Ok(query)
    }
}

/// GET /events
pub async fn list_events(
    State(state): State<AppState>,
    Tenant(tenant): Tenant,
    ApiQuery(params): ApiQuery<ListParams>,
) -> Result<Json<EventsResponse>, ApiError> {
    let query = params.into_query(tenant)?;
    let (limit, offset) = (query.limit, query.offset);

    let page = state.store.query(&query).await?;
    let returned = page.records.len() as u64;

    let pagination = Pagination {
        total: page.total,
        limit,
        offset,
        page: offset / limit + 1,
        has_more: u64::from(offset) + returned < page.total,
    };

    Ok(Json(EventsResponse {
        events: page.records.into_iter().map(EventView::from).collect(),
        pagination,
    }))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurgeParams {
    pub days_old: Option<u32>,
    pub dry_run: Option<bool>,
}

/// DELETE /events
///
/// Purges the caller's events older than `daysOld` days.
pub async fn purge_events(
    State(state): State<AppState>,
    Tenant(tenant): Tenant,
    ApiQuery(params): ApiQuery<PurgeParams>,
) -> Result<Json<PurgeResponse>, ApiError> {
    let days_old = params.days_old.unwrap_or(DEFAULT_RETENTION_DAYS);
    let dry_run = params.dry_run.unwrap_or(false);

    let report = state.sweeper.purge(Some(&tenant), days_old, dry_run).await?;
    Ok(Json(PurgeResponse::from(report)))
}
