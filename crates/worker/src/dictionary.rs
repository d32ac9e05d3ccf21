//! Dictionary repository: upsert-or-get interning with a hot-value cache.

use event_store::SharedEventStore;
use moka::future::Cache;
use pipeline_core::{DictId, Dictionary, DictionaryIds, Error, Result, ValidatedEvent};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use telemetry::metrics;

/// Dictionary cache configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DictionaryCacheConfig {
    #[serde(default = "default_max_capacity")]
    pub max_capacity: u64,
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
}

fn default_max_capacity() -> u64 {
    10_000
}

fn default_ttl_secs() -> u64 {
    600
}

impl Default for DictionaryCacheConfig {
    fn default() -> Self {
        Self {
            max_capacity: default_max_capacity(),
            ttl_secs: default_ttl_secs(),
        }
    }
}

/// Resolves dictionary values to surrogate ids through the Event Store.
///
/// Concurrent misses for the same value share one store call.
#[derive(Clone)]
pub struct DictionaryResolver {
    store: SharedEventStore,
    cache: Cache<(Dictionary, String), DictId>,
}

impl DictionaryResolver {
    pub fn new(store: SharedEventStore, config: &DictionaryCacheConfig) -> Self {
        let cache = Cache::builder()
            .max_capacity(config.max_capacity)
            .time_to_live(Duration::from_secs(config.ttl_secs))
            .build();

        Self { store, cache }
    }

    pub async fn intern(&self, dictionary: Dictionary, name: &str) -> Result<DictId> {
        let key = (dictionary, name.to_string());
        if let Some(id) = self.cache.get(&key).await {
            metrics().dictionary_cache_hits.inc();
            return Ok(id);
        }

        let store = self.store.clone();
        let name = name.to_string();
        self.cache
            .try_get_with(key, async move {
                metrics().dictionary_lookups.inc();
                store.intern(dictionary, &name).await
            })
            .await
            .map_err(|e| Error::store(format!("{} interning failed: {e}", dictionary.as_str())))
    }

    pub async fn intern_event_type(&self, name: &str) -> Result<DictId> {
        self.intern(Dictionary::EventType, name).await
    }

    pub async fn intern_category(&self, name: &str) -> Result<DictId> {
        self.intern(Dictionary::Category, name).await
    }

    pub async fn intern_action(&self, name: &str) -> Result<DictId> {
        self.intern(Dictionary::Action, name).await
    }

    pub async fn intern_page(&self, path: &str) -> Result<DictId> {
        self.intern(Dictionary::Page, path).await
    }

    pub async fn intern_browser(&self, name: &str) -> Result<DictId> {
        self.intern(Dictionary::Browser, name).await
    }

    /// Resolves every dictionary column of an event.
    pub async fn resolve(
        &self,
        event: &ValidatedEvent,
        browser: Option<&str>,
    ) -> Result<DictionaryIds> {
        let page_id = match event.page.as_deref() {
            Some(page) => Some(self.intern_page(page).await?),
            None => None,
        };
        let browser_id = match browser {
            Some(name) => Some(self.intern_browser(name).await?),
            None => None,
        };

        Ok(DictionaryIds {
            event_type_id: self.intern_event_type(&event.event).await?,
            category_id: self.intern_category(&event.category).await?,
            action_id: self.intern_action(&event.action).await?,
            page_id,
            browser_id,
        })
    }
}
