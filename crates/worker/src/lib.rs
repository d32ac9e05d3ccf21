//! Deferred persistence for the event pipeline.
//!
//! - Write queue and worker pool
//! - Async Writer (enrichment, dictionary interning, cache invalidation)
//! - Batch settle-all
//! - Retention Sweeper and its optional schedule

pub mod batch;
pub mod dictionary;
pub mod enrichment;
pub mod queue;
pub mod retention;
pub mod scheduler;
pub mod writer;

pub use batch::{settle_all, BatchOutcome};
pub use dictionary::{DictionaryCacheConfig, DictionaryResolver};
pub use enrichment::{ClientInfo, UserAgentEnricher};
pub use queue::{Enqueued, JobHandler, OverflowPolicy, QueueConfig, WriteJob, WriteQueue};
pub use retention::RetentionSweeper;
pub use scheduler::{spawn_retention_schedule, RetentionScheduleConfig};
pub use writer::AsyncWriter;
