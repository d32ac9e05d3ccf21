//! Key-value backing store for the Metrics Cache.

use async_trait::async_trait;
use moka::future::Cache;
use pipeline_core::{Result, SharedClock};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use crate::keys::MetricsWindow;

/// Generic get/set/delete cache used behind [`crate::MetricsCache`].
#[async_trait]
pub trait CacheBackend: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Value>>;

    async fn set(&self, key: &str, value: Value, ttl: Duration) -> Result<()>;

    async fn delete(&self, keys: &[String]) -> Result<()>;

    async fn clear(&self) -> Result<()>;
}

/// Shared backend handle.
pub type SharedCacheBackend = Arc<dyn CacheBackend>;

#[derive(Clone)]
struct Entry {
    value: Value,
    expires_at_ms: i64,
}

/// In-process backend on a moka cache.
///
/// Freshness is checked against the injected clock on read; moka's own
/// TTL only bounds how long dead entries occupy memory.
#[derive(Clone)]
pub struct MemoryBackend {
    cache: Cache<String, Entry>,
    clock: SharedClock,
}

impl MemoryBackend {
    pub fn new(max_capacity: u64, clock: SharedClock) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_capacity)
            .time_to_live(MetricsWindow::max_ttl())
            .build();

        Self { cache, clock }
    }

    /// Entries currently held, including ones awaiting eviction.
    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }
}

impl std::fmt::Debug for MemoryBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryBackend")
            .field("cache", &"<moka cache>")
            .finish()
    }
}

#[async_trait]
impl CacheBackend for MemoryBackend {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        let Some(entry) = self.cache.get(key).await else {
            return Ok(None);
        };

        if self.clock.now_ms() >= entry.expires_at_ms {
            self.cache.invalidate(key).await;
            return Ok(None);
        }
        Ok(Some(entry.value))
    }

    async fn set(&self, key: &str, value: Value, ttl: Duration) -> Result<()> {
        let ttl_ms = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
        let entry = Entry {
            value,
            expires_at_ms: self.clock.now_ms().saturating_add(ttl_ms),
        };
        self.cache.insert(key.to_string(), entry).await;
        Ok(())
    }

    async fn delete(&self, keys: &[String]) -> Result<()> {
        for key in keys {
            self.cache.invalidate(key).await;
        }
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        self.cache.invalidate_all();
        Ok(())
    }
}
