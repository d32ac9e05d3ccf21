//! Common test setup functions.

use api::{router, AppState, PipelineConfig};
use axum_test::{TestRequest, TestServer};
use event_store::SharedEventStore;
use pipeline_core::{ManualClock, SharedClock};
use std::sync::Arc;

use crate::fixtures::{T0_MS, TENANT};
use crate::mocks::RecordingStore;

/// Test context over the real router with a recording in-memory store.
///
/// Time is driven by a [`ManualClock`] starting at [`T0_MS`], so dedup
/// windows, cache TTLs and retention cutoffs are deterministic.
pub struct TestContext {
    pub store: RecordingStore,
    pub clock: Arc<ManualClock>,
    pub state: AppState,
    pub server: TestServer,
}

impl TestContext {
    /// Create a new test context with default settings.
    pub fn new() -> Self {
        Self::with_config(PipelineConfig::default())
    }

    /// Create a test context with custom pipeline settings.
    pub fn with_config(config: PipelineConfig) -> Self {
        Self::with_store(config, RecordingStore::new())
    }

    pub fn with_store(config: PipelineConfig, store: RecordingStore) -> Self {
        let clock = Arc::new(ManualClock::new(T0_MS));
        let shared_store: SharedEventStore = Arc::new(store.clone());
        let shared_clock: SharedClock = clock.clone();

        let state = AppState::build(&config, shared_store, shared_clock)
            .expect("Failed to assemble pipeline");
        let server = TestServer::new(router(state.clone())).expect("Failed to create test server");

        Self {
            store,
            clock,
            state,
            server,
        }
    }

    pub fn post(&self, path: &str) -> TestRequest {
        self.server
            .post(path)
            .add_header(self.state.tenant_header.as_str(), TENANT)
    }

    pub fn get(&self, path: &str) -> TestRequest {
        self.server
            .get(path)
            .add_header(self.state.tenant_header.as_str(), TENANT)
    }

    pub fn delete(&self, path: &str) -> TestRequest {
        self.server
            .delete(path)
            .add_header(self.state.tenant_header.as_str(), TENANT)
    }

    /// Waits until every queued write has been handled.
    pub async fn drain(&self) {
        self.state.queue.wait_idle().await;
        self.state.writer.wait_invalidations().await;
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}
