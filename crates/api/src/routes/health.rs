//! Health check endpoints.

use axum::{extract::State, http::StatusCode, Json};
use telemetry::{health, metrics};
use tracing::warn;

use crate::response::HealthResponse;
use crate::state::AppState;

/// Pings the Event Store and records the result in the health registry.
async fn probe_store(state: &AppState) -> bool {
    match state.store.health_check().await {
        Ok(()) => {
            health().store.set_healthy();
            true
        }
        Err(e) => {
            warn!(error = %e, "Event Store health check failed");
            health().store.set_unhealthy(e.to_string());
            false
        }
    }
}

/// GET /health - Full health check.
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let store_connected = probe_store(&state).await;
    let report = health().report();
    let snapshot = metrics().snapshot();

    Json(HealthResponse {
        status: format!("{:?}", report.status).to_lowercase(),
        store_connected,
        write_queue_running: !state.queue.is_closed(),
        queue_depth: snapshot.queue_depth,
        report,
        metrics: snapshot,
    })
}

/// GET /health/ready - Readiness probe (can accept traffic).
pub async fn ready_handler(State(state): State<AppState>) -> StatusCode {
    if !state.queue.is_closed() && probe_store(&state).await {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

/// GET /health/live - Liveness probe (service is running).
pub async fn live_handler() -> StatusCode {
    if health().is_alive() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}
