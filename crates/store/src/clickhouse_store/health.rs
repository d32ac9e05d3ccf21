//! ClickHouse health checks and schema bootstrap.

use pipeline_core::Result;
use tracing::{debug, error};

use super::client::{store_err, ClickHouseClient};
use super::schema::{all_tables, create_database};

/// Check ClickHouse connection health.
pub async fn check_connection(client: &ClickHouseClient) -> bool {
    match client.inner().query("SELECT 1").fetch_one::<u8>().await {
        Ok(_) => {
            debug!("ClickHouse connection healthy");
            true
        }
        Err(e) => {
            error!("ClickHouse health check failed: {}", e);
            false
        }
    }
}

/// Creates the database, dictionary tables and events table if missing.
pub async fn init_schema(client: &ClickHouseClient) -> Result<()> {
    // The target database may not exist yet, so bootstrap from `default`.
    client
        .inner()
        .clone()
        .with_database("default")
        .query(&create_database(&client.config().database))
        .execute()
        .await
        .map_err(store_err("CREATE DATABASE"))?;

    for ddl in all_tables(&client.config().database) {
        client
            .inner()
            .query(&ddl)
            .execute()
            .await
            .map_err(store_err("DDL"))?;
    }

    debug!("ClickHouse schema initialized");
    Ok(())
}
