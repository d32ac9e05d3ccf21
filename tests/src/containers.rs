//! Testcontainer setup for ClickHouse.
//!
//! Set `PIPELINE_TEST_CLICKHOUSE_URL` to run against an existing server
//! instead of starting a container.

use event_store::clickhouse_store::health::check_connection;
use event_store::{ClickHouseClient, ClickHouseConfig};
use std::time::Duration;
use testcontainers::{
    core::{IntoContainerPort, WaitFor},
    runners::AsyncRunner,
    ContainerAsync, GenericImage, ImageExt,
};

const TEST_DATABASE: &str = "pipeline_test";

/// Container handle for ClickHouse.
pub struct TestContainers {
    #[allow(dead_code)]
    container: Option<ContainerAsync<GenericImage>>,
    pub clickhouse: ClickHouseConfig,
}

impl TestContainers {
    /// Start ClickHouse, or reuse the server named by the environment.
    pub async fn start() -> Self {
        if let Some(url) = std::env::var("PIPELINE_TEST_CLICKHOUSE_URL")
            .ok()
            .filter(|v| !v.trim().is_empty())
        {
            let config = ClickHouseConfig {
                url,
                database: std::env::var("PIPELINE_TEST_CLICKHOUSE_DB")
                    .unwrap_or_else(|_| TEST_DATABASE.to_string()),
                username: std::env::var("PIPELINE_TEST_CLICKHOUSE_USER").ok(),
                password: std::env::var("PIPELINE_TEST_CLICKHOUSE_PASSWORD").ok(),
            };
            return Self {
                container: None,
                clickhouse: config,
            };
        }

        let (container, url) = start_clickhouse().await;

        Self {
            container: Some(container),
            clickhouse: ClickHouseConfig {
                url,
                database: TEST_DATABASE.to_string(),
                username: Some("default".to_string()),
                password: None,
            },
        }
    }
}

/// Start ClickHouse container, return container and HTTP URL.
pub async fn start_clickhouse() -> (ContainerAsync<GenericImage>, String) {
    let image = GenericImage::new("clickhouse/clickhouse-server", "24.3")
        .with_wait_for(WaitFor::seconds(5))
        .with_exposed_port(8123.tcp())
        .with_env_var("CLICKHOUSE_DB", TEST_DATABASE)
        .with_env_var("CLICKHOUSE_DEFAULT_ACCESS_MANAGEMENT", "1")
        .with_env_var("CLICKHOUSE_USER", "default")
        .with_env_var("CLICKHOUSE_PASSWORD", "");

    let container = image.start().await.expect("Failed to start ClickHouse");

    let port = container.get_host_port_ipv4(8123).await.unwrap();
    let url = format!("http://127.0.0.1:{}", port);

    wait_for_clickhouse(&url, Duration::from_secs(30)).await;

    (container, url)
}

/// Polls `SELECT 1` until the server answers.
async fn wait_for_clickhouse(url: &str, timeout: Duration) {
    let client = ClickHouseClient::new(ClickHouseConfig {
        url: url.to_string(),
        database: "default".to_string(),
        username: Some("default".to_string()),
        password: None,
    })
    .expect("Failed to create ClickHouse client");
    let start = std::time::Instant::now();

    while start.elapsed() < timeout {
        if check_connection(&client).await {
            return;
        }
        tokio::time::sleep(Duration::from_millis(500)).await;
    }
    panic!("ClickHouse at {} not ready after {:?}", url, timeout);
}
