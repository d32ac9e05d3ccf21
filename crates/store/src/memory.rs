//! In-process Event Store for single-node deployments and tests.

use async_trait::async_trait;
use parking_lot::RwLock;
use pipeline_core::{
    DictId, Dictionary, EventPage, EventQuery, EventRecord, Result, StoredEvent, TenantId,
};
use std::collections::HashMap;
use tracing::debug;

use crate::EventStore;

#[derive(Default)]
struct DictionaryTable {
    ids: HashMap<String, DictId>,
    names: Vec<String>,
}

impl DictionaryTable {
    fn intern(&mut self, name: &str) -> DictId {
        if let Some(id) = self.ids.get(name) {
            return *id;
        }
        // Ids start at 1 so 0 never looks like a real value.
        let id = self.names.len() as DictId + 1;
        self.names.push(name.to_string());
        self.ids.insert(name.to_string(), id);
        id
    }

    fn name(&self, id: DictId) -> Option<&str> {
        let index = usize::try_from(id).ok()?.checked_sub(1)?;
        self.names.get(index).map(String::as_str)
    }
}

#[derive(Default)]
struct Inner {
    dictionaries: HashMap<Dictionary, DictionaryTable>,
    rows: Vec<StoredEvent>,
}

impl Inner {
    fn name(&self, dictionary: Dictionary, id: DictId) -> Option<String> {
        self.dictionaries
            .get(&dictionary)
            .and_then(|t| t.name(id))
            .map(str::to_string)
    }

    fn resolve(&self, event: &StoredEvent) -> EventRecord {
        let required = |dictionary, id| {
            self.name(dictionary, id)
                .unwrap_or_else(|| "unknown".to_string())
        };
        EventRecord {
            event_type: required(Dictionary::EventType, event.event_type_id),
            category: required(Dictionary::Category, event.category_id),
            action: required(Dictionary::Action, event.action_id),
            page: event.page_id.and_then(|id| self.name(Dictionary::Page, id)),
            browser: event.browser_id.and_then(|id| self.name(Dictionary::Browser, id)),
            event: event.clone(),
        }
    }
}

fn expired(row: &StoredEvent, tenant: Option<&TenantId>, cutoff: i64) -> bool {
    row.created_at < cutoff && tenant.map_or(true, |t| &row.tenant_id == t)
}

/// Event Store held entirely in memory behind a lock.
#[derive(Default)]
pub struct InMemoryEventStore {
    inner: RwLock<Inner>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored rows across all tenants.
    pub fn len(&self) -> usize {
        self.inner.read().rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of every stored row in insertion order.
    pub fn rows(&self) -> Vec<StoredEvent> {
        self.inner.read().rows.clone()
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn intern(&self, dictionary: Dictionary, name: &str) -> Result<DictId> {
        let mut inner = self.inner.write();
        Ok(inner.dictionaries.entry(dictionary).or_default().intern(name))
    }

    async fn insert(&self, event: StoredEvent) -> Result<()> {
        self.inner.write().rows.push(event);
        Ok(())
    }

    async fn query(&self, query: &EventQuery) -> Result<EventPage> {
        let inner = self.inner.read();

        let mut matched: Vec<EventRecord> = inner
            .rows
            .iter()
            .filter(|row| row.tenant_id == query.tenant)
            .map(|row| inner.resolve(row))
            .filter(|record| query.matches(record))
            .collect();

        matched.sort_by(|a, b| b.event.created_at.cmp(&a.event.created_at));
        let total = matched.len() as u64;

        let records = matched
            .into_iter()
            .skip(query.offset as usize)
            .take(query.limit as usize)
            .map(|mut record: EventRecord| {
                if query.skip_metadata {
                    record.event.metadata = None;
                }
                record
            })
            .collect();

        Ok(EventPage { records, total })
    }

    async fn count_before(&self, tenant: Option<&TenantId>, cutoff: i64) -> Result<u64> {
        let inner = self.inner.read();
        Ok(inner.rows.iter().filter(|r| expired(r, tenant, cutoff)).count() as u64)
    }

    async fn delete_before(&self, tenant: Option<&TenantId>, cutoff: i64) -> Result<u64> {
        let mut inner = self.inner.write();
        let before = inner.rows.len();
        inner.rows.retain(|r| !expired(r, tenant, cutoff));
        let deleted = (before - inner.rows.len()) as u64;
        debug!(deleted, cutoff, "Deleted expired events from memory store");
        Ok(deleted)
    }

    async fn health_check(&self) -> Result<()> {
        Ok(())
    }
}
