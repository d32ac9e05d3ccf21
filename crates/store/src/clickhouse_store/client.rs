//! ClickHouse client wrapper.

use clickhouse::Client;
use pipeline_core::{Error, Result};
use tracing::info;

use super::config::ClickHouseConfig;

/// ClickHouse client bound to one database.
#[derive(Clone)]
pub struct ClickHouseClient {
    inner: Client,
    config: ClickHouseConfig,
}

impl ClickHouseClient {
    /// Creates a new ClickHouse client.
    pub fn new(config: ClickHouseConfig) -> Result<Self> {
        if config.database.is_empty()
            || !config
                .database
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return Err(Error::internal(format!(
                "invalid ClickHouse database name '{}'",
                config.database
            )));
        }

        let mut client = Client::default()
            .with_url(&config.url)
            .with_database(&config.database);

        if let Some(ref user) = config.username {
            client = client.with_user(user);
        }

        if let Some(ref pass) = config.password {
            client = client.with_password(pass);
        }

        info!(
            url = %config.url,
            database = %config.database,
            "Created ClickHouse client"
        );

        Ok(Self {
            inner: client,
            config,
        })
    }

    /// Returns the inner clickhouse client.
    pub fn inner(&self) -> &Client {
        &self.inner
    }

    /// Returns the configuration.
    pub fn config(&self) -> &ClickHouseConfig {
        &self.config
    }

    /// Fully qualified table name.
    pub fn table(&self, name: &str) -> String {
        format!("{}.{}", self.config.database, name)
    }
}

/// Maps a driver error into a store error.
pub(crate) fn store_err(op: &'static str) -> impl Fn(clickhouse::error::Error) -> Error {
    move |e| Error::store(format!("ClickHouse {op} failed: {e}"))
}
