//! Event Ingress and Batch Ingress.
//!
//! Both validate synchronously and hand persistence to the write queue.
//! Neither waits for the Event Store: the caller is answered as soon as the
//! job is queued.

use pipeline_core::error::ValidationErrorCode;
use pipeline_core::limits::MAX_BATCH_EVENTS;
use pipeline_core::{
    BatchPayload, DedupWindow, Error, Observation, Result, SharedClock, TelemetryEvent, TenantId,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use telemetry::metrics;
use tracing::debug;
use worker::{WriteJob, WriteQueue};

/// Batch Ingress configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    #[serde(default = "default_max_events")]
    pub max_events: usize,
}

fn default_max_events() -> usize {
    MAX_BATCH_EVENTS
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_events: default_max_events(),
        }
    }
}

/// Result of a single-event submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Submitted {
    /// The event repeated one accepted within the dedup window
    pub cached: bool,
}

/// Validates, deduplicates and schedules single events.
pub struct EventIngress {
    dedup: Arc<DedupWindow>,
    queue: Arc<WriteQueue>,
}

impl EventIngress {
    pub fn new(dedup: Arc<DedupWindow>, queue: Arc<WriteQueue>) -> Self {
        Self { dedup, queue }
    }

    pub fn dedup(&self) -> &DedupWindow {
        &self.dedup
    }

    pub async fn submit(&self, event: TelemetryEvent, tenant: TenantId) -> Result<Submitted> {
        metrics().events_received.inc();

        let event = event.into_validated().map_err(|e| {
            metrics().events_rejected.inc();
            e
        })?;

        let key = event.dedup_key();
        if self.dedup.observe(key.clone()) == Observation::Duplicate {
            metrics().events_deduplicated.inc();
            debug!(tenant = %tenant, dedup_key = %key, "Duplicate event suppressed");
            return Ok(Submitted { cached: true });
        }

        if let Err(e) = self.queue.enqueue(WriteJob::Single { event, tenant }).await {
            // Nothing will be written, so a retry must not be suppressed.
            self.dedup.forget(&key);
            return Err(e);
        }
        Ok(Submitted { cached: false })
    }
}

/// Acknowledgement of a scheduled batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchAccepted {
    /// Events handed to the writer, not events persisted
    pub processed: usize,
    /// Server time, epoch ms
    pub timestamp: i64,
}

/// Bounds-checks a batch and schedules it as one job.
pub struct BatchIngress {
    queue: Arc<WriteQueue>,
    config: BatchConfig,
    clock: SharedClock,
}

impl BatchIngress {
    pub fn new(queue: Arc<WriteQueue>, config: BatchConfig, clock: SharedClock) -> Self {
        Self {
            queue,
            config,
            clock,
        }
    }

    pub async fn submit_batch(&self, payload: BatchPayload, tenant: TenantId) -> Result<BatchAccepted> {
        let count = payload.events.len();
        if count == 0 || count > self.config.max_events {
            metrics().events_rejected.inc_by(count as u64);
            return Err(Error::validation_code(
                ValidationErrorCode::BatchSize,
                format!(
                    "batch must contain between 1 and {} events, got {count}",
                    self.config.max_events
                ),
            ));
        }

        metrics().batches_received.inc();
        metrics().events_received.inc_by(count as u64);

        self.queue
            .enqueue(WriteJob::Batch {
                events: payload.events,
                tenant,
            })
            .await?;

        Ok(BatchAccepted {
            processed: count,
            timestamp: self.clock.now_ms(),
        })
    }
}
