//! Size limits and window defaults for the event pipeline.
//!
//! The `#[validate]` derive macro requires literal values in attributes,
//! so field limits are duplicated there. Keep both in sync when modifying.

// === Batch Limits ===

/// Maximum events accepted by a single batch call.
pub const MAX_BATCH_EVENTS: usize = 100;

/// Maximum request body size in bytes (1MB).
pub const MAX_BODY_SIZE_BYTES: usize = 1024 * 1024;

/// Maximum serialized metadata size per event (16KB).
pub const MAX_METADATA_BYTES: usize = 16 * 1024;

// === Dedup Window ===

/// Default dedup TTL in milliseconds.
pub const DEFAULT_DEDUP_TTL_MS: u64 = 5_000;

/// Key count above which an insert triggers a full sweep.
pub const DEFAULT_DEDUP_CAPACITY: usize = 1_000;

// === String Field Limits (chars) ===

/// Event name, category and action max length.
pub const MAX_NAME_LEN: usize = 100;

/// Label max length.
pub const MAX_LABEL_LEN: usize = 500;

/// Session ID max length.
pub const MAX_SESSION_ID_LEN: usize = 128;

/// User ID max length.
pub const MAX_USER_ID_LEN: usize = 128;

/// Page path max length.
pub const MAX_PAGE_LEN: usize = 2048;

/// User agent max length.
pub const MAX_USER_AGENT_LEN: usize = 512;

// === Query Limits ===

/// Default page size for event listing.
pub const DEFAULT_QUERY_LIMIT: u32 = 100;

/// Upper bound on page size for event listing.
pub const MAX_QUERY_LIMIT: u32 = 1_000;

/// Default retention age for purge requests.
pub const DEFAULT_RETENTION_DAYS: u32 = 30;
