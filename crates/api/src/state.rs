//! Application state shared across handlers, and its assembly.

use event_store::SharedEventStore;
use metrics_cache::{CacheConfig, MemoryBackend, MetricsCache, SharedMetricsCache};
use pipeline_core::{
    DedupConfig, DedupWindow, HeaderTenantResolver, Result, SharedClock, SharedTenantResolver,
    TenantConfig,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use worker::{
    AsyncWriter, DictionaryCacheConfig, DictionaryResolver, QueueConfig, RetentionSweeper,
    WriteQueue,
};

use crate::ingress::{BatchConfig, BatchIngress, EventIngress};

/// Settings for every pipeline component behind the router.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub dedup: DedupConfig,
    #[serde(default)]
    pub queue: QueueConfig,
    #[serde(default)]
    pub batch: BatchConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub dictionary_cache: DictionaryCacheConfig,
    #[serde(default)]
    pub tenant: TenantConfig,
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub ingress: Arc<EventIngress>,
    pub batch: Arc<BatchIngress>,
    pub queue: Arc<WriteQueue>,
    pub writer: Arc<AsyncWriter>,
    pub store: SharedEventStore,
    pub cache: SharedMetricsCache,
    pub sweeper: Arc<RetentionSweeper>,
    pub tenants: SharedTenantResolver,
    /// Lowercase request header carrying the tenant id
    pub tenant_header: String,
    pub clock: SharedClock,
}

impl AppState {
    /// Wires the pipeline over `store` and starts the write queue.
    ///
    /// Must be called inside a Tokio runtime.
    pub fn build(config: &PipelineConfig, store: SharedEventStore, clock: SharedClock) -> Result<Self> {
        let tenants: SharedTenantResolver =
            Arc::new(HeaderTenantResolver::from_config(&config.tenant)?);

        let cache: SharedMetricsCache = Arc::new(MetricsCache::new(Arc::new(MemoryBackend::new(
            config.cache.max_capacity,
            clock.clone(),
        ))));

        let dictionary = DictionaryResolver::new(store.clone(), &config.dictionary_cache);
        let writer = Arc::new(AsyncWriter::new(
            store.clone(),
            dictionary,
            cache.clone(),
            clock.clone(),
        ));
        let queue = WriteQueue::start(config.queue.clone(), writer.clone());

        let dedup = Arc::new(DedupWindow::new(config.dedup, clock.clone()));
        let ingress = Arc::new(EventIngress::new(dedup, queue.clone()));
        let batch = Arc::new(BatchIngress::new(
            queue.clone(),
            config.batch.clone(),
            clock.clone(),
        ));
        let sweeper = Arc::new(RetentionSweeper::new(
            store.clone(),
            cache.clone(),
            clock.clone(),
        ));

        info!(
            dedup_ttl_ms = config.dedup.ttl_ms,
            dedup_capacity = config.dedup.capacity,
            max_batch_events = config.batch.max_events,
            tenant_header = %config.tenant.header,
            "Pipeline assembled"
        );

        Ok(Self {
            ingress,
            batch,
            queue,
            writer,
            store,
            cache,
            sweeper,
            tenants,
            tenant_header: config.tenant.header.to_ascii_lowercase(),
            clock,
        })
    }
}
