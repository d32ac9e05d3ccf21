//! Read-through aggregate metrics.

use axum::{extract::State, Json};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use metrics_cache::{CacheKey, MetricsScope, MetricsWindow};
use pipeline_core::analytics::{compute_metrics, AnalyticsMetrics};
use pipeline_core::error::ValidationErrorCode;
use pipeline_core::hashing::session_hash;
use pipeline_core::{Error, EventQuery, Result, TenantId};
use serde::Deserialize;
use std::time::Instant;
use tracing::debug;

use crate::extractors::{ApiQuery, Tenant};
use crate::response::{ApiError, MetricsResponse};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsParams {
    pub window: Option<String>,
    /// YYYY-MM-DD, inclusive
    pub start_date: Option<String>,
    /// YYYY-MM-DD, inclusive
    pub end_date: Option<String>,
    pub user_id: Option<String>,
    pub session_id: Option<String>,
}

fn parse_day(raw: &str, field: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|_| {
        Error::validation_code(
            ValidationErrorCode::InvalidParameter,
            format!("{field} must be YYYY-MM-DD, got '{raw}'"),
        )
    })
}

fn day_start_secs(day: NaiveDate) -> i64 {
    day.and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc().timestamp())
        .unwrap_or_default()
}

/// Resolves window and dates, filling gaps from the window's default range.
fn resolve_scope(
    params: MetricsParams,
    tenant: TenantId,
    today: NaiveDate,
) -> Result<(MetricsWindow, MetricsScope)> {
    let window = params
        .window
        .as_deref()
        .map(str::parse::<MetricsWindow>)
        .transpose()?
        .unwrap_or_default();

    let (default_start, default_end) = window.default_range(today);
    let start = params
        .start_date
        .as_deref()
        .map(|raw| parse_day(raw, "startDate"))
        .transpose()?
        .unwrap_or(default_start);
    let end = params
        .end_date
        .as_deref()
        .map(|raw| parse_day(raw, "endDate"))
        .transpose()?
        .unwrap_or(if params.start_date.is_some() { start } else { default_end });

    if end < start {
        return Err(Error::validation_code(
            ValidationErrorCode::InvalidParameter,
            "endDate is before startDate",
        ));
    }

    Ok((
        window,
        MetricsScope {
            tenant,
            start,
            end,
            user_id: params.user_id,
            session_id: params.session_id,
        },
    ))
}

fn scope_query(scope: &MetricsScope) -> EventQuery {
    let mut query = EventQuery::for_tenant(scope.tenant.clone())
        .unbounded()
        .without_metadata();
    query.start = Some(day_start_secs(scope.start));
    query.end = Some(day_start_secs(scope.end + Duration::days(1)));
    query.user_id = scope.user_id.clone();
    query.session_hash = scope
        .session_id
        .as_deref()
        .map(|sid| session_hash(&scope.tenant, sid));
    query
}

/// GET /analytics/metrics
pub async fn metrics_handler(
    State(state): State<AppState>,
    Tenant(tenant): Tenant,
    ApiQuery(params): ApiQuery<MetricsParams>,
) -> std::result::Result<Json<MetricsResponse>, ApiError> {
    let start = Instant::now();
    let today = DateTime::<Utc>::from_timestamp(state.clock.now_secs(), 0)
        .map(|dt| dt.date_naive())
        .ok_or_else(|| Error::internal("clock out of range"))?;
    let (window, scope) = resolve_scope(params, tenant, today)?;
    let key = CacheKey::metrics(window, &scope);

    let store = state.store.clone();
    let query = scope_query(&scope);
    let metrics: AnalyticsMetrics = state
        .cache
        .get_or_compute(&key, window.ttl(), || async move {
            let page = store.query(&query).await?;
            Ok(compute_metrics(&page.records))
        })
        .await?;

    debug!(
        key = %key,
        total_events = metrics.total_events,
        latency_ms = start.elapsed().as_millis() as u64,
        "Served analytics metrics"
    );

    Ok(Json(MetricsResponse {
        window: window.to_string(),
        start_date: scope.start.format("%Y-%m-%d").to_string(),
        end_date: scope.end.format("%Y-%m-%d").to_string(),
        metrics,
    }))
}
