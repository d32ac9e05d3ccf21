//! ClickHouse table schemas.
//!
//! String dimensions live in small dictionary tables keyed by a UInt64
//! surrogate (`sipHash64` of the value, rehashed on collision); the events
//! table stores only the ids plus denormalized commerce columns.

use pipeline_core::Dictionary;

/// Events table name.
pub const EVENTS_TABLE: &str = "analytics_events";

pub fn create_database(database: &str) -> String {
    format!("CREATE DATABASE IF NOT EXISTS {database}")
}

/// DDL for one dictionary table.
///
/// Sorted by `name` so ReplacingMergeTree only ever collapses rows for the
/// same value, never two values that share an id.
pub fn dictionary_table(database: &str, dictionary: Dictionary) -> String {
    format!(
        r#"
CREATE TABLE IF NOT EXISTS {database}.{table} (
    id UInt64,
    name String
)
ENGINE = ReplacingMergeTree()
ORDER BY name
"#,
        table = dictionary.table()
    )
}

/// DDL for the append-only events table.
pub fn events_table(database: &str) -> String {
    format!(
        r#"
CREATE TABLE IF NOT EXISTS {database}.{EVENTS_TABLE} (
    id String,
    tenant_id LowCardinality(String),

    -- Dictionary-encoded dimensions
    event_type_id UInt64,
    category_id UInt64,
    action_id UInt64,
    page_id Nullable(UInt64),
    browser_id Nullable(UInt64),

    label Nullable(String),
    value Nullable(Float64),

    -- Denormalized commerce fields
    product_id Nullable(Int64),
    product_name Nullable(String),
    category_name Nullable(String),
    price Nullable(Float64),
    quantity Nullable(UInt32),
    device_type LowCardinality(Nullable(String)),

    -- Hashed identifiers
    session_hash Nullable(String),
    visitor_hash Nullable(String),
    user_id Nullable(String),

    -- Epoch seconds
    created_at UInt32,

    -- gzip + base64 JSON
    metadata Nullable(String)
)
ENGINE = MergeTree()
PARTITION BY toYYYYMM(toDateTime(created_at))
ORDER BY (tenant_id, created_at, event_type_id)
SETTINGS index_granularity = 8192
"#
    )
}

/// All table DDL, dictionaries first.
pub fn all_tables(database: &str) -> Vec<String> {
    Dictionary::ALL
        .iter()
        .map(|d| dictionary_table(database, *d))
        .chain(std::iter::once(events_table(database)))
        .collect()
}
