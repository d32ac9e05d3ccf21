//! Event Store contract and backends.
//!
//! The pipeline only talks to storage through [`EventStore`]: dictionary
//! interning, append-only inserts, windowed queries and bulk deletes.

pub mod clickhouse_store;
pub mod memory;

use async_trait::async_trait;
use pipeline_core::{DictId, Dictionary, EventPage, EventQuery, Result, StoredEvent, TenantId};
use std::sync::Arc;

pub use clickhouse_store::{ClickHouseClient, ClickHouseConfig, ClickHouseEventStore};
pub use memory::InMemoryEventStore;

/// Storage operations used by the pipeline.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Returns the surrogate id for `name`, creating it if absent.
    ///
    /// Concurrent calls for the same value must resolve to the same id.
    async fn intern(&self, dictionary: Dictionary, name: &str) -> Result<DictId>;

    /// Appends one event row.
    async fn insert(&self, event: StoredEvent) -> Result<()>;

    /// Lists events newest first with their dictionary values resolved.
    async fn query(&self, query: &EventQuery) -> Result<EventPage>;

    /// Counts rows with `created_at < cutoff`, for one tenant or all.
    async fn count_before(&self, tenant: Option<&TenantId>, cutoff: i64) -> Result<u64>;

    /// Deletes rows with `created_at < cutoff` and returns how many were removed.
    async fn delete_before(&self, tenant: Option<&TenantId>, cutoff: i64) -> Result<u64>;

    /// Verifies the backend is reachable.
    async fn health_check(&self) -> Result<()>;
}

/// Shared store handle.
pub type SharedEventStore = Arc<dyn EventStore>;
