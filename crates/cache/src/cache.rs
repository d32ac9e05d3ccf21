//! Read-through Metrics Cache with namespace/tenant tagged invalidation.

use parking_lot::Mutex;
use pipeline_core::{Result, TenantId};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use telemetry::metrics;
use tracing::{debug, warn};

use crate::backend::SharedCacheBackend;
use crate::keys::CacheKey;

/// Metrics cache configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Max entries held by the in-memory backend
    #[serde(default = "default_max_capacity")]
    pub max_capacity: u64,
}

fn default_max_capacity() -> u64 {
    10_000
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_capacity: default_max_capacity(),
        }
    }
}

type Tag = (&'static str, TenantId);

/// Aggregate cache fronting Event Store queries.
///
/// Backend failures never propagate: reads degrade to misses, writes and
/// invalidations are logged and dropped.
pub struct MetricsCache {
    backend: SharedCacheBackend,
    registry: Mutex<HashMap<Tag, HashSet<String>>>,
}

/// Shared cache handle.
pub type SharedMetricsCache = Arc<MetricsCache>;

impl MetricsCache {
    pub fn new(backend: SharedCacheBackend) -> Self {
        Self {
            backend,
            registry: Mutex::new(HashMap::new()),
        }
    }

    /// Cached value for `key`, if present, fresh and decodable.
    pub async fn get<T: DeserializeOwned>(&self, key: &CacheKey) -> Option<T> {
        let value = match self.backend.get(key.as_str()).await {
            Ok(Some(value)) => value,
            Ok(None) => {
                metrics().cache_misses.inc();
                return None;
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Metrics cache read failed");
                metrics().cache_misses.inc();
                return None;
            }
        };

        match serde_json::from_value(value) {
            Ok(decoded) => {
                metrics().cache_hits.inc();
                Some(decoded)
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Discarding undecodable metrics cache entry");
                metrics().cache_misses.inc();
                None
            }
        }
    }

    /// Stores `value` under `key` and registers the key under its tag.
    pub async fn set<T: Serialize>(&self, key: &CacheKey, value: &T, ttl: Duration) {
        let value = match serde_json::to_value(value) {
            Ok(v) => v,
            Err(e) => {
                warn!(key = %key, error = %e, "Metrics value not serializable, not caching");
                return;
            }
        };

        self.registry
            .lock()
            .entry((key.namespace(), key.tenant().clone()))
            .or_default()
            .insert(key.as_str().to_string());

        if let Err(e) = self.backend.set(key.as_str(), value, ttl).await {
            warn!(key = %key, error = %e, "Metrics cache write failed");
        }
    }

    /// Returns the cached value or computes, stores and returns it.
    pub async fn get_or_compute<T, F, Fut>(&self, key: &CacheKey, ttl: Duration, compute: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        if let Some(cached) = self.get(key).await {
            debug!(key = %key, "Metrics cache hit");
            return Ok(cached);
        }

        let value = compute().await?;
        self.set(key, &value, ttl).await;
        Ok(value)
    }

    /// Drops every key registered under `namespace` for `tenant`.
    ///
    /// Returns how many keys were dropped.
    pub async fn invalidate_namespace(&self, namespace: &str, tenant: &TenantId) -> usize {
        let entries: Vec<(Tag, String)> = {
            let mut registry = self.registry.lock();
            let tag = registry
                .keys()
                .find(|(ns, t)| *ns == namespace && t == tenant)
                .cloned();
            tag.and_then(|tag| registry.remove(&tag).map(|set| (tag, set)))
                .map(|(tag, set)| set.into_iter().map(|key| (tag.clone(), key)).collect())
                .unwrap_or_default()
        };

        self.delete_keys(entries).await
    }

    /// Drops every registered key starting with `pattern`.
    ///
    /// A trailing `*` is accepted, so `analytics:*` and `analytics:` match
    /// the same keys.
    pub async fn invalidate_pattern(&self, pattern: &str) -> usize {
        let prefix = pattern.trim_end_matches('*');

        let entries: Vec<(Tag, String)> = {
            let mut registry = self.registry.lock();
            let mut matched = Vec::new();
            for (tag, set) in registry.iter_mut() {
                set.retain(|key| {
                    if key.starts_with(prefix) {
                        matched.push((tag.clone(), key.clone()));
                        false
                    } else {
                        true
                    }
                });
            }
            registry.retain(|_, set| !set.is_empty());
            matched
        };

        self.delete_keys(entries).await
    }

    /// Drops everything, registered or not.
    pub async fn clear(&self) {
        self.registry.lock().clear();
        if let Err(e) = self.backend.clear().await {
            warn!(error = %e, "Metrics cache clear failed");
        }
    }

    /// Number of keys currently registered for a tenant's namespace.
    pub fn registered(&self, namespace: &str, tenant: &TenantId) -> usize {
        self.registry
            .lock()
            .iter()
            .find(|((ns, t), _)| *ns == namespace && t == tenant)
            .map_or(0, |(_, set)| set.len())
    }

    async fn delete_keys(&self, entries: Vec<(Tag, String)>) -> usize {
        if entries.is_empty() {
            return 0;
        }

        let keys: Vec<String> = entries.iter().map(|(_, key)| key.clone()).collect();
        match self.backend.delete(&keys).await {
            Ok(()) => {
                metrics().cache_invalidations.inc_by(keys.len() as u64);
                debug!(count = keys.len(), "Invalidated metrics cache keys");
                keys.len()
            }
            Err(e) => {
                metrics().cache_invalidation_failures.inc();
                warn!(count = keys.len(), error = %e, "Metrics cache invalidation failed");
                // Entries are still in the backend; keep them reachable.
                let mut registry = self.registry.lock();
                for (tag, key) in entries {
                    registry.entry(tag).or_default().insert(key);
                }
                0
            }
        }
    }
}
