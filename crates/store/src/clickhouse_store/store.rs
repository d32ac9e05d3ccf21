//! [`EventStore`] over ClickHouse.

use async_trait::async_trait;
use clickhouse::query::Query;
use pipeline_core::{
    DictId, Dictionary, Error, EventPage, EventQuery, EventRecord, Result, StoredEvent, TenantId,
};
use std::time::Instant;
use telemetry::metrics;
use tracing::{debug, warn};

use super::client::{store_err, ClickHouseClient};
use super::health::check_connection;
use super::rows::{metadata_column, DictionaryRow, EventRow, JoinedEventRow, EVENT_COLUMNS};
use super::schema::EVENTS_TABLE;
use crate::EventStore;

/// Rehash attempts before interning gives up.
const MAX_ID_ATTEMPTS: u32 = 8;

/// Hash expression for dictionary id candidates. Attempt 0 hashes the bare
/// value, later attempts salt it with the attempt number.
fn candidate_id_sql(attempt: u32) -> &'static str {
    if attempt == 0 {
        "SELECT sipHash64(?)"
    } else {
        "SELECT sipHash64(concat(?, '#', toString(?)))"
    }
}

/// Positional query parameter.
enum Param {
    Text(String),
    Int(i64),
    UInt(u64),
}

fn bind_all(mut query: Query, params: &[Param]) -> Query {
    for param in params {
        query = match param {
            Param::Text(s) => query.bind(s.as_str()),
            Param::Int(i) => query.bind(*i),
            Param::UInt(u) => query.bind(*u),
        };
    }
    query
}

/// WHERE clause and its parameters, in placeholder order.
fn where_clause(query: &EventQuery) -> (String, Vec<Param>) {
    let mut conditions = vec!["e.tenant_id = ?".to_string()];
    let mut params = vec![Param::Text(query.tenant.as_str().to_string())];

    let mut text = |column: &str, value: &Option<String>| {
        if let Some(v) = value {
            conditions.push(format!("{column} = ?"));
            params.push(Param::Text(v.clone()));
        }
    };
    text("e.session_hash", &query.session_hash);
    text("e.visitor_hash", &query.visitor_hash);
    text("e.user_id", &query.user_id);
    text("et.name", &query.event_type);
    text("c.name", &query.category);
    text("a.name", &query.action);

    if let Some(start) = query.start {
        conditions.push("e.created_at >= ?".to_string());
        params.push(Param::Int(start));
    }
    if let Some(end) = query.end {
        conditions.push("e.created_at < ?".to_string());
        params.push(Param::Int(end));
    }

    (conditions.join(" AND "), params)
}

/// Event Store backed by ClickHouse.
#[derive(Clone)]
pub struct ClickHouseEventStore {
    client: ClickHouseClient,
}

impl ClickHouseEventStore {
    pub fn new(client: ClickHouseClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &ClickHouseClient {
        &self.client
    }

    fn joined_from(&self) -> String {
        let dict = |d: Dictionary, alias: &str, key: &str| {
            format!(
                "LEFT JOIN (SELECT id, name FROM {} FINAL) AS {alias} ON {alias}.id = e.{key}",
                self.client.table(d.table())
            )
        };
        format!(
            "FROM {} AS e {} {} {} {} {}",
            self.client.table(EVENTS_TABLE),
            dict(Dictionary::EventType, "et", "event_type_id"),
            dict(Dictionary::Category, "c", "category_id"),
            dict(Dictionary::Action, "a", "action_id"),
            dict(Dictionary::Page, "p", "page_id"),
            dict(Dictionary::Browser, "b", "browser_id"),
        )
    }

    async fn candidate_id(&self, name: &str, attempt: u32) -> Result<DictId> {
        let mut query = self.client.inner().query(candidate_id_sql(attempt)).bind(name);
        if attempt > 0 {
            query = query.bind(attempt);
        }
        query.fetch_one().await.map_err(store_err("dictionary hash"))
    }

    fn tenant_filter(tenant: Option<&TenantId>, cutoff: i64) -> (String, Vec<Param>) {
        let mut params = vec![Param::Int(cutoff)];
        let mut clause = "created_at < ?".to_string();
        if let Some(t) = tenant {
            clause.push_str(" AND tenant_id = ?");
            params.push(Param::Text(t.as_str().to_string()));
        }
        (clause, params)
    }
}

#[async_trait]
impl EventStore for ClickHouseEventStore {
    async fn intern(&self, dictionary: Dictionary, name: &str) -> Result<DictId> {
        let table = self.client.table(dictionary.table());

        let existing: Option<DictId> = self
            .client
            .inner()
            .query(&format!("SELECT id FROM {table} FINAL WHERE name = ? LIMIT 1"))
            .bind(name)
            .fetch_optional()
            .await
            .map_err(store_err("dictionary lookup"))?;
        if let Some(id) = existing {
            return Ok(id);
        }

        // Deterministic ids make concurrent inserts of one value converge.
        for attempt in 0..MAX_ID_ATTEMPTS {
            let id = self.candidate_id(name, attempt).await?;

            let holder: Option<String> = self
                .client
                .inner()
                .query(&format!(
                    "SELECT name FROM {table} FINAL WHERE id = ? AND name != ? LIMIT 1"
                ))
                .bind(id)
                .bind(name)
                .fetch_optional()
                .await
                .map_err(store_err("dictionary lookup"))?;
            if let Some(holder) = holder {
                warn!(
                    dictionary = dictionary.as_str(),
                    name,
                    holder = %holder,
                    id,
                    attempt,
                    "Dictionary id collision, rehashing"
                );
                continue;
            }

            let mut insert = self
                .client
                .inner()
                .insert(&table)
                .map_err(store_err("dictionary insert"))?;
            insert
                .write(&DictionaryRow {
                    id,
                    name: name.to_string(),
                })
                .await
                .map_err(store_err("dictionary insert"))?;
            insert.end().await.map_err(store_err("dictionary insert"))?;

            debug!(dictionary = dictionary.as_str(), name, id, "Interned dictionary value");
            return Ok(id);
        }

        Err(Error::store(format!(
            "no free {} dictionary id for '{name}' after {MAX_ID_ATTEMPTS} attempts",
            dictionary.as_str()
        )))
    }

    async fn insert(&self, event: StoredEvent) -> Result<()> {
        let start = Instant::now();
        let row = EventRow::try_from(event)?;

        let mut insert = self
            .client
            .inner()
            .insert(&self.client.table(EVENTS_TABLE))
            .map_err(store_err("insert"))?;
        insert.write(&row).await.map_err(store_err("insert"))?;
        insert.end().await.map_err(store_err("insert"))?;

        metrics()
            .store_latency_ms
            .observe(start.elapsed().as_millis() as u64);
        Ok(())
    }

    async fn query(&self, query: &EventQuery) -> Result<EventPage> {
        let (clause, params) = where_clause(query);
        let from = self.joined_from();

        let total: u64 = bind_all(
            self.client
                .inner()
                .query(&format!("SELECT count() {from} WHERE {clause}")),
            &params,
        )
        .fetch_one()
        .await
        .map_err(store_err("count"))?;

        let sql = format!(
            "SELECT {EVENT_COLUMNS}, {}, et.name, c.name, a.name, p.name, b.name {from} \
             WHERE {clause} ORDER BY e.created_at DESC LIMIT ? OFFSET ?",
            metadata_column(query.skip_metadata)
        );
        let mut page_params = params;
        page_params.push(Param::UInt(u64::from(query.limit)));
        page_params.push(Param::UInt(u64::from(query.offset)));

        let rows: Vec<JoinedEventRow> =
            bind_all(self.client.inner().query(&sql), &page_params)
                .fetch_all()
                .await
                .map_err(store_err("query"))?;

        let records = rows
            .into_iter()
            .map(EventRecord::try_from)
            .collect::<Result<Vec<_>>>()?;

        Ok(EventPage { records, total })
    }

    async fn count_before(&self, tenant: Option<&TenantId>, cutoff: i64) -> Result<u64> {
        let (clause, params) = Self::tenant_filter(tenant, cutoff);
        bind_all(
            self.client.inner().query(&format!(
                "SELECT count() FROM {} WHERE {clause}",
                self.client.table(EVENTS_TABLE)
            )),
            &params,
        )
        .fetch_one()
        .await
        .map_err(store_err("count"))
    }

    async fn delete_before(&self, tenant: Option<&TenantId>, cutoff: i64) -> Result<u64> {
        let affected = self.count_before(tenant, cutoff).await?;
        if affected == 0 {
            return Ok(0);
        }

        let (clause, params) = Self::tenant_filter(tenant, cutoff);
        // Wait for the mutation so the caller observes the deletion.
        let client = self.client.inner().clone().with_option("mutations_sync", "2");
        bind_all(
            client.query(&format!(
                "ALTER TABLE {} DELETE WHERE {clause}",
                self.client.table(EVENTS_TABLE)
            )),
            &params,
        )
        .execute()
        .await
        .map_err(store_err("delete"))?;

        Ok(affected)
    }

    async fn health_check(&self) -> Result<()> {
        if check_connection(&self.client).await {
            Ok(())
        } else {
            Err(Error::store("ClickHouse is unreachable"))
        }
    }
}
