//! Batch job: persist every event of a batch and settle all attempts.

use futures::future::join_all;
use pipeline_core::{TelemetryEvent, TenantId};
use serde::Serialize;
use telemetry::metrics;
use tracing::{info, warn};

use crate::writer::AsyncWriter;

/// Tally of a settled batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchOutcome {
    pub succeeded: usize,
    pub failed: usize,
}

/// Writes each event concurrently and waits for every attempt.
///
/// A failing event never cancels the others. Events that fail validation
/// here count as failures like any persistence error.
pub async fn settle_all(
    writer: &AsyncWriter,
    events: Vec<TelemetryEvent>,
    tenant: &TenantId,
) -> BatchOutcome {
    let processed = events.len();

    let attempts = events.into_iter().enumerate().map(|(index, event)| async move {
        let event = match event.into_validated() {
            Ok(event) => event,
            Err(e) => {
                warn!(tenant = %tenant, index, error = %e, "Skipping invalid batch event");
                return false;
            }
        };
        writer.persist(&event, tenant).await.is_ok()
    });

    let results = join_all(attempts).await;
    let succeeded = results.iter().filter(|ok| **ok).count();
    let outcome = BatchOutcome {
        succeeded,
        failed: processed - succeeded,
    };

    metrics().batch_events_failed.inc_by(outcome.failed as u64);
    info!(
        tenant = %tenant,
        processed,
        succeeded = outcome.succeeded,
        failed = outcome.failed,
        "Batch settled"
    );
    outcome
}
