//! Async Writer: turns a validated event into a stored row.
//!
//! Runs off the request path. Failures are logged and counted here and never
//! reach the client that submitted the event.

use async_trait::async_trait;
use event_store::SharedEventStore;
use metrics_cache::{SharedMetricsCache, ANALYTICS_NAMESPACE};
use pipeline_core::extract::CommerceFields;
use pipeline_core::hashing::{session_hash, visitor_hash};
use pipeline_core::{metadata, Result, SharedClock, StoredEvent, TenantId, ValidatedEvent};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;
use telemetry::metrics;
use tokio::sync::Notify;
use tracing::{debug, error};
use uuid::Uuid;

use crate::batch::settle_all;
use crate::dictionary::DictionaryResolver;
use crate::enrichment::UserAgentEnricher;
use crate::queue::{JobHandler, WriteJob};

/// Spawned cache invalidations not yet finished.
#[derive(Default)]
struct InFlight {
    count: AtomicUsize,
    idle: Notify,
}

/// Persists events through the Event Store.
pub struct AsyncWriter {
    store: SharedEventStore,
    dictionary: DictionaryResolver,
    cache: SharedMetricsCache,
    enricher: UserAgentEnricher,
    clock: SharedClock,
    invalidations: Arc<InFlight>,
}

impl AsyncWriter {
    pub fn new(
        store: SharedEventStore,
        dictionary: DictionaryResolver,
        cache: SharedMetricsCache,
        clock: SharedClock,
    ) -> Self {
        Self {
            store,
            dictionary,
            cache,
            enricher: UserAgentEnricher::new(),
            clock,
            invalidations: Arc::new(InFlight::default()),
        }
    }

    /// Builds the stored row: dictionary ids, hashes, commerce columns and
    /// compressed metadata.
    pub async fn build(&self, event: &ValidatedEvent, tenant: &TenantId) -> Result<StoredEvent> {
        let client = self.enricher.parse(event.user_agent.as_deref());
        let ids = self.dictionary.resolve(event, client.browser.as_deref()).await?;
        let commerce = CommerceFields::from_metadata(&event.metadata);

        Ok(StoredEvent {
            id: Uuid::new_v4(),
            tenant_id: tenant.clone(),
            event_type_id: ids.event_type_id,
            category_id: ids.category_id,
            action_id: ids.action_id,
            page_id: ids.page_id,
            browser_id: ids.browser_id,
            label: event.label.clone(),
            value: event.value,
            product_id: commerce.product_id,
            product_name: commerce.product_name,
            category_name: commerce.category_name,
            price: commerce.price,
            quantity: Some(commerce.quantity),
            device_type: commerce.device_type.or(client.device_type),
            session_hash: event
                .session_id
                .as_deref()
                .map(|sid| session_hash(tenant, sid)),
            visitor_hash: visitor_hash(
                tenant,
                &event.metadata,
                event.user_id.as_deref(),
                event.user_agent.as_deref(),
            ),
            user_id: event.user_id.clone(),
            created_at: self.clock.now_secs(),
            metadata: metadata::compress(&event.metadata)?,
        })
    }

    /// Writes one event and invalidates the tenant's cached aggregates.
    pub async fn persist(&self, event: &ValidatedEvent, tenant: &TenantId) -> Result<()> {
        let start = Instant::now();

        let result = match self.build(event, tenant).await {
            Ok(row) => self.store.insert(row).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => {
                metrics().events_persisted.inc();
                metrics()
                    .persist_latency_ms
                    .observe(start.elapsed().as_millis() as u64);
                self.spawn_invalidation(tenant.clone());
                debug!(tenant = %tenant, event = %event.event, "Event persisted");
                Ok(())
            }
            Err(e) => {
                metrics().persist_failures.inc();
                error!(
                    tenant = %tenant,
                    event = %event.event,
                    category = %event.category,
                    action = %event.action,
                    error = %e,
                    "Failed to persist event"
                );
                Err(e)
            }
        }
    }
}

impl AsyncWriter {
    /// Drops the tenant's cached analytics without holding up the worker.
    fn spawn_invalidation(&self, tenant: TenantId) {
        let cache = self.cache.clone();
        let in_flight = self.invalidations.clone();
        in_flight.count.fetch_add(1, Ordering::SeqCst);

        tokio::spawn(async move {
            let dropped = cache.invalidate_namespace(ANALYTICS_NAMESPACE, &tenant).await;
            debug!(tenant = %tenant, invalidated = dropped, "Analytics cache invalidated");
            if in_flight.count.fetch_sub(1, Ordering::SeqCst) == 1 {
                in_flight.idle.notify_waiters();
            }
        });
    }

    /// Cache invalidations spawned and not yet finished.
    pub fn pending_invalidations(&self) -> usize {
        self.invalidations.count.load(Ordering::SeqCst)
    }

    /// Waits until every spawned invalidation has finished.
    pub async fn wait_invalidations(&self) {
        loop {
            let notified = self.invalidations.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.pending_invalidations() == 0 {
                return;
            }
            notified.await;
        }
    }
}

#[async_trait]
impl JobHandler for AsyncWriter {
    async fn handle(&self, job: WriteJob) {
        match job {
            // Errors are already logged and counted by persist.
            WriteJob::Single { event, tenant } => {
                let _ = self.persist(&event, &tenant).await;
            }
            WriteJob::Batch { events, tenant } => {
                settle_all(self, events, &tenant).await;
            }
        }
    }
}
