//! ClickHouse-backed Event Store.

pub mod client;
pub mod config;
pub mod health;
pub mod rows;
pub mod schema;
pub mod store;

pub use client::ClickHouseClient;
pub use config::ClickHouseConfig;
pub use store::ClickHouseEventStore;
