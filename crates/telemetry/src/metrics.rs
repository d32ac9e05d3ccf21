//! In-process counters, gauges and latency histograms.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// A counter metric.
#[derive(Debug, Default)]
pub struct Counter(AtomicU64);

impl Counter {
    pub fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    pub fn inc(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_by(&self, n: u64) {
        self.0.fetch_add(n, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// A gauge metric (can go up or down).
#[derive(Debug, Default)]
pub struct Gauge(AtomicU64);

impl Gauge {
    pub fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    pub fn set(&self, val: u64) {
        self.0.store(val, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }

    pub fn inc(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    pub fn dec(&self) {
        let _ = self
            .0
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |v| v.checked_sub(1));
    }
}

/// Histogram for latency tracking.
#[derive(Debug)]
pub struct Histogram {
    /// Buckets: 1ms, 5ms, 10ms, 25ms, 50ms, 100ms, 250ms, 500ms, 1s, 5s, 10s
    buckets: [AtomicU64; 11],
    sum: AtomicU64,
    count: AtomicU64,
}

impl Default for Histogram {
    fn default() -> Self {
        Self::new()
    }
}

impl Histogram {
    const BUCKET_BOUNDS: [u64; 11] = [1, 5, 10, 25, 50, 100, 250, 500, 1000, 5000, 10000];

    pub fn new() -> Self {
        Self {
            buckets: Default::default(),
            sum: AtomicU64::new(0),
            count: AtomicU64::new(0),
        }
    }

    /// Records a value in milliseconds.
    pub fn observe(&self, ms: u64) {
        self.sum.fetch_add(ms, Ordering::Relaxed);
        self.count.fetch_add(1, Ordering::Relaxed);

        for (i, &bound) in Self::BUCKET_BOUNDS.iter().enumerate() {
            if ms <= bound {
                self.buckets[i].fetch_add(1, Ordering::Relaxed);
                return;
            }
        }
        // Value exceeds all buckets, add to last
        self.buckets[10].fetch_add(1, Ordering::Relaxed);
    }

    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    pub fn sum(&self) -> u64 {
        self.sum.load(Ordering::Relaxed)
    }

    pub fn mean(&self) -> f64 {
        let count = self.count();
        if count == 0 {
            0.0
        } else {
            self.sum() as f64 / count as f64
        }
    }

    /// Returns bucket counts.
    pub fn buckets(&self) -> Vec<(u64, u64)> {
        Self::BUCKET_BOUNDS
            .iter()
            .zip(self.buckets.iter())
            .map(|(&bound, count)| (bound, count.load(Ordering::Relaxed)))
            .collect()
    }
}

/// Collected metrics for the event pipeline.
#[derive(Debug, Default)]
pub struct Metrics {
    // Ingress
    pub events_received: Counter,
    pub events_deduplicated: Counter,
    pub events_rejected: Counter,
    pub batches_received: Counter,

    // Write queue
    pub jobs_enqueued: Counter,
    pub queue_rejections: Counter,

    // Persistence
    pub events_persisted: Counter,
    pub persist_failures: Counter,
    pub batch_events_failed: Counter,
    pub dictionary_lookups: Counter,
    pub dictionary_cache_hits: Counter,

    // Metrics cache
    pub cache_hits: Counter,
    pub cache_misses: Counter,
    pub cache_invalidations: Counter,
    pub cache_invalidation_failures: Counter,

    // Retention
    pub events_purged: Counter,

    // Latency histograms
    pub ingest_latency_ms: Histogram,
    pub persist_latency_ms: Histogram,
    pub store_latency_ms: Histogram,

    // Gauges
    pub queue_depth: Gauge,
    pub in_flight_jobs: Gauge,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }
}

/// A snapshot of metrics at a point in time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub timestamp: DateTime<Utc>,
    pub events_received: u64,
    pub events_deduplicated: u64,
    pub events_rejected: u64,
    pub batches_received: u64,
    pub jobs_enqueued: u64,
    pub queue_rejections: u64,
    pub events_persisted: u64,
    pub persist_failures: u64,
    pub batch_events_failed: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub cache_invalidations: u64,
    pub cache_invalidation_failures: u64,
    pub events_purged: u64,
    pub ingest_latency_mean_ms: f64,
    pub persist_latency_mean_ms: f64,
    pub store_latency_mean_ms: f64,
    pub queue_depth: u64,
    pub in_flight_jobs: u64,
}

impl Metrics {
    /// Takes a snapshot of current metrics.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            timestamp: Utc::now(),
            events_received: self.events_received.get(),
            events_deduplicated: self.events_deduplicated.get(),
            events_rejected: self.events_rejected.get(),
            batches_received: self.batches_received.get(),
            jobs_enqueued: self.jobs_enqueued.get(),
            queue_rejections: self.queue_rejections.get(),
            events_persisted: self.events_persisted.get(),
            persist_failures: self.persist_failures.get(),
            batch_events_failed: self.batch_events_failed.get(),
            cache_hits: self.cache_hits.get(),
            cache_misses: self.cache_misses.get(),
            cache_invalidations: self.cache_invalidations.get(),
            cache_invalidation_failures: self.cache_invalidation_failures.get(),
            events_purged: self.events_purged.get(),
            ingest_latency_mean_ms: self.ingest_latency_ms.mean(),
            persist_latency_mean_ms: self.persist_latency_ms.mean(),
            store_latency_mean_ms: self.store_latency_ms.mean(),
            queue_depth: self.queue_depth.get(),
            in_flight_jobs: self.in_flight_jobs.get(),
        }
    }
}

/// Global metrics registry.
pub static METRICS: std::sync::LazyLock<Metrics> = std::sync::LazyLock::new(Metrics::new);

/// Get the global metrics instance.
pub fn metrics() -> &'static Metrics {
    &METRICS
}
