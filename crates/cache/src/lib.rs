//! Metrics Cache: read-through cache for aggregate analytics.
//!
//! Keys are registered under a namespace and tenant tag when written, so a
//! writer invalidates an enumerable key set instead of scanning the backend.

pub mod backend;
pub mod cache;
pub mod keys;

pub use backend::{CacheBackend, MemoryBackend, SharedCacheBackend};
pub use cache::{CacheConfig, MetricsCache, SharedMetricsCache};
pub use keys::{CacheKey, MetricsScope, MetricsWindow, ANALYTICS_NAMESPACE};
