//! Mock implementations for testing.

use async_trait::async_trait;
use event_store::{EventStore, InMemoryEventStore};
use parking_lot::Mutex;
use pipeline_core::{
    DictId, Dictionary, Error, EventPage, EventQuery, Result, StoredEvent, TenantId,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Event Store that records calls and can be slowed down or made to fail.
///
/// Storage itself is delegated to an [`InMemoryEventStore`], so the rows a
/// test reads back are exactly what the pipeline wrote.
#[derive(Clone, Default)]
pub struct RecordingStore {
    inner: Arc<InMemoryEventStore>,
    insert_delay: Arc<Mutex<Option<Duration>>>,
    should_fail: Arc<Mutex<bool>>,
    inserts: Arc<AtomicUsize>,
    queries: Arc<AtomicUsize>,
    deletes: Arc<AtomicUsize>,
}

impl RecordingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rows currently stored.
    pub fn rows(&self) -> Vec<StoredEvent> {
        self.inner.rows()
    }

    /// Number of insert calls, including failed ones.
    pub fn insert_calls(&self) -> usize {
        self.inserts.load(Ordering::SeqCst)
    }

    pub fn query_calls(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    pub fn delete_calls(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }

    /// Makes every insert sleep for `delay` before storing.
    pub fn set_insert_delay(&self, delay: Duration) {
        *self.insert_delay.lock() = Some(delay);
    }

    /// Set failure mode for testing error handling.
    pub fn set_should_fail(&self, fail: bool) {
        *self.should_fail.lock() = fail;
    }

    fn check_failure(&self) -> Result<()> {
        if *self.should_fail.lock() {
            return Err(Error::store("simulated store failure"));
        }
        Ok(())
    }
}

#[async_trait]
impl EventStore for RecordingStore {
    async fn intern(&self, dictionary: Dictionary, name: &str) -> Result<DictId> {
        self.check_failure()?;
        self.inner.intern(dictionary, name).await
    }

    async fn insert(&self, event: StoredEvent) -> Result<()> {
        self.inserts.fetch_add(1, Ordering::SeqCst);
        let delay = *self.insert_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.check_failure()?;
        self.inner.insert(event).await
    }

    async fn query(&self, query: &EventQuery) -> Result<EventPage> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        self.check_failure()?;
        self.inner.query(query).await
    }

    async fn count_before(&self, tenant: Option<&TenantId>, cutoff: i64) -> Result<u64> {
        self.check_failure()?;
        self.inner.count_before(tenant, cutoff).await
    }

    async fn delete_before(&self, tenant: Option<&TenantId>, cutoff: i64) -> Result<u64> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        self.check_failure()?;
        self.inner.delete_before(tenant, cutoff).await
    }

    async fn health_check(&self) -> Result<()> {
        self.check_failure()
    }
}
