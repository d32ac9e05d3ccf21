//! Telemetry Event Pipeline
//!
//! Ingests client telemetry events over HTTP:
//! - Validation and short-window deduplication on the request path
//! - Deferred persistence through a bounded write queue
//! - Read-through cached analytics aggregates
//! - Administrative and scheduled retention purges

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tokio::signal;
use tracing::{error, info, warn};

use api::{router, AppState, BatchConfig, PipelineConfig};
use event_store::clickhouse_store::health::{check_connection, init_schema};
use event_store::{
    ClickHouseClient, ClickHouseConfig, ClickHouseEventStore, InMemoryEventStore, SharedEventStore,
};
use metrics_cache::CacheConfig;
use pipeline_core::{system_clock, DedupConfig, TenantConfig};
use telemetry::{health, init_tracing_from_env};
use worker::{spawn_retention_schedule, DictionaryCacheConfig, QueueConfig, RetentionScheduleConfig};

/// Event Store backend selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum StoreBackend {
    #[default]
    Memory,
    Clickhouse,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct StoreConfig {
    #[serde(default)]
    backend: StoreBackend,
    #[serde(default)]
    clickhouse: ClickHouseConfig,
}

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Config {
    #[serde(default = "default_host")]
    host: String,
    #[serde(default = "default_port")]
    port: u16,

    #[serde(default)]
    dedup: DedupConfig,
    #[serde(default)]
    queue: QueueConfig,
    #[serde(default)]
    batch: BatchConfig,
    #[serde(default)]
    cache: CacheConfig,
    #[serde(default)]
    dictionary_cache: DictionaryCacheConfig,
    #[serde(default)]
    tenant: TenantConfig,
    #[serde(default)]
    retention: RetentionScheduleConfig,
    #[serde(default)]
    store: StoreConfig,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            dedup: DedupConfig::default(),
            queue: QueueConfig::default(),
            batch: BatchConfig::default(),
            cache: CacheConfig::default(),
            dictionary_cache: DictionaryCacheConfig::default(),
            tenant: TenantConfig::default(),
            retention: RetentionScheduleConfig::default(),
            store: StoreConfig::default(),
        }
    }
}

impl Config {
    fn pipeline(&self) -> PipelineConfig {
        PipelineConfig {
            dedup: self.dedup,
            queue: self.queue.clone(),
            batch: self.batch.clone(),
            cache: self.cache.clone(),
            dictionary_cache: self.dictionary_cache.clone(),
            tenant: self.tenant.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    init_tracing_from_env();

    info!("Starting Telemetry Event Pipeline v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config()?;
    let store = open_store(&config.store).await?;

    let state = AppState::build(&config.pipeline(), store, system_clock())
        .context("Failed to assemble pipeline")?;
    let queue = state.queue.clone();
    let writer = state.writer.clone();

    let retention_task = spawn_retention_schedule(&config.retention, state.sweeper.clone());

    let app = router(state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .context("Invalid server address")?;

    info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Shutting down...");

    if let Some(task) = retention_task {
        task.abort();
    }

    // Persist everything already acknowledged
    queue.shutdown().await;
    writer.wait_invalidations().await;

    info!("Shutdown complete");
    Ok(())
}

/// Load configuration from defaults, an optional file and the environment.
fn load_config() -> Result<Config> {
    let config = config::Config::builder()
        .add_source(config::Config::try_from(&Config::default())?)
        .add_source(
            config::File::with_name("config/default")
                .required(false)
                .format(config::FileFormat::Toml),
        )
        .add_source(
            config::Environment::default()
                .separator("__")
                .prefix("PIPELINE")
                .try_parsing(true),
        )
        .build()
        .context("Failed to build configuration")?;

    config
        .try_deserialize()
        .context("Failed to deserialize configuration")
}

/// Opens the configured Event Store and records its health.
async fn open_store(config: &StoreConfig) -> Result<SharedEventStore> {
    match config.backend {
        StoreBackend::Memory => {
            warn!("Using in-memory Event Store; events are lost on restart");
            health().store.set_healthy();
            Ok(Arc::new(InMemoryEventStore::new()))
        }
        StoreBackend::Clickhouse => {
            let client = ClickHouseClient::new(config.clickhouse.clone())
                .context("Failed to create ClickHouse client")?;

            if let Err(e) = init_schema(&client).await {
                error!("Failed to initialize ClickHouse schema: {}", e);
                // Continue anyway - schema might already exist
            }

            if check_connection(&client).await {
                health().store.set_healthy();
                info!("ClickHouse connection: healthy");
            } else {
                health().store.set_unhealthy("Connection failed");
                error!("ClickHouse connection: unhealthy");
            }

            Ok(Arc::new(ClickHouseEventStore::new(client)))
        }
    }
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        }
        _ = terminate => {
            info!("Received terminate signal");
        }
    }
}
