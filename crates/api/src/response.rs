//! Response bodies and the API error type.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use pipeline_core::analytics::AnalyticsMetrics;
use pipeline_core::{metadata, Error, EventRecord, PurgeReport};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use telemetry::{HealthReport, MetricsSnapshot};
use tracing::{error, warn};

/// `POST /events` acknowledgement.
#[derive(Debug, Serialize, Deserialize)]
pub struct EventAccepted {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cached: Option<bool>,
}

impl EventAccepted {
    pub fn new(cached: bool) -> Self {
        Self {
            success: true,
            cached: cached.then_some(true),
        }
    }
}

/// `POST /events/batch` acknowledgement.
#[derive(Debug, Serialize, Deserialize)]
pub struct BatchResponse {
    pub success: bool,
    pub processed: usize,
    pub timestamp: i64,
}

/// A stored event with dictionary names resolved and metadata decoded.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventView {
    pub id: String,
    pub tenant_id: String,
    pub event: String,
    pub category: String,
    pub action: String,
    pub page: Option<String>,
    pub browser: Option<String>,
    pub label: Option<String>,
    pub value: Option<f64>,
    pub product_id: Option<i64>,
    pub product_name: Option<String>,
    pub category_name: Option<String>,
    pub price: Option<f64>,
    pub quantity: Option<u32>,
    pub device_type: Option<String>,
    pub session_hash: Option<String>,
    pub visitor_hash: Option<String>,
    pub user_id: Option<String>,
    /// Epoch seconds
    pub created_at: i64,
    pub metadata: Option<Map<String, Value>>,
}

impl From<EventRecord> for EventView {
    fn from(record: EventRecord) -> Self {
        let row = record.event;
        let metadata = row.metadata.as_deref().and_then(|encoded| {
            metadata::decompress(encoded)
                .map_err(|e| warn!(id = %row.id, error = %e, "Unreadable stored metadata"))
                .ok()
        });

        Self {
            id: row.id.to_string(),
            tenant_id: row.tenant_id.to_string(),
            event: record.event_type,
            category: record.category,
            action: record.action,
            page: record.page,
            browser: record.browser,
            label: row.label,
            value: row.value,
            product_id: row.product_id,
            product_name: row.product_name,
            category_name: row.category_name,
            price: row.price,
            quantity: row.quantity,
            device_type: row.device_type,
            session_hash: row.session_hash,
            visitor_hash: row.visitor_hash,
            user_id: row.user_id,
            created_at: row.created_at,
            metadata,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub total: u64,
    pub limit: u32,
    pub offset: u32,
    /// 1-based
    pub page: u32,
    pub has_more: bool,
}

/// `GET /events` body.
#[derive(Debug, Serialize, Deserialize)]
pub struct EventsResponse {
    pub events: Vec<EventView>,
    pub pagination: Pagination,
}

/// `DELETE /events` body. Exactly one of `would_delete`/`deleted` is set.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurgeResponse {
    pub success: bool,
    pub dry_run: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub would_delete: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted: Option<u64>,
    pub cutoff_date: String,
}

impl From<PurgeReport> for PurgeResponse {
    fn from(report: PurgeReport) -> Self {
        let (would_delete, deleted) = if report.dry_run {
            (Some(report.affected), None)
        } else {
            (None, Some(report.affected))
        };
        Self {
            success: true,
            dry_run: report.dry_run,
            would_delete,
            deleted,
            cutoff_date: report.cutoff_date(),
        }
    }
}

/// `GET /analytics/metrics` body.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsResponse {
    pub window: String,
    pub start_date: String,
    pub end_date: String,
    pub metrics: AnalyticsMetrics,
}

/// Health check response.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub store_connected: bool,
    pub write_queue_running: bool,
    pub queue_depth: u64,
    pub report: HealthReport,
    pub metrics: MetricsSnapshot,
}

/// Error response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<String>>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code: code.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: Vec<String>) -> Self {
        self.details = Some(details);
        self
    }
}

/// API error with a coded JSON body.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub response: ErrorResponse,
}

impl ApiError {
    pub fn with_code(status: StatusCode, code: impl Into<String>, msg: impl Into<String>) -> Self {
        Self {
            status,
            response: ErrorResponse::new(msg, code),
        }
    }

    pub fn bad_request(code: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::with_code(StatusCode::BAD_REQUEST, code, msg)
    }

    pub fn internal() -> Self {
        Self::with_code(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL", "internal server error")
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.response)).into_response()
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        let status =
            StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let code = err.error_code();

        match err {
            Error::MissingFields(fields) => Self {
                status,
                response: ErrorResponse::new("missing required fields", code)
                    .with_details(fields.into_iter().map(str::to_string).collect()),
            },
            Error::ValidationWithCode { message, .. } => Self::with_code(status, code, message),
            Error::Validation(msg) => Self {
                status,
                response: ErrorResponse::new("Validation failed", code).with_details(vec![msg]),
            },
            Error::Store { message, .. } => {
                error!(code, error = %message, "Event Store request failed");
                Self::with_code(status, code, "event store unavailable")
            }
            Error::Internal(msg) => {
                error!(error = %msg, "Internal error");
                Self::internal()
            }
            other => Self::with_code(status, code, other.to_string()),
        }
    }
}
