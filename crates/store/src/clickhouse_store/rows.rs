//! Row types exchanged with ClickHouse.

use clickhouse::Row;
use pipeline_core::{DictId, Error, EventRecord, Result, StoredEvent, TenantId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One dictionary entry.
#[derive(Debug, Clone, Row, Serialize, Deserialize)]
pub struct DictionaryRow {
    pub id: DictId,
    pub name: String,
}

/// Flattened event row for insertion.
#[derive(Debug, Clone, Row, Serialize, Deserialize)]
pub struct EventRow {
    pub id: String,
    pub tenant_id: String,
    pub event_type_id: DictId,
    pub category_id: DictId,
    pub action_id: DictId,
    pub page_id: Option<DictId>,
    pub browser_id: Option<DictId>,
    pub label: Option<String>,
    pub value: Option<f64>,
    pub product_id: Option<i64>,
    pub product_name: Option<String>,
    pub category_name: Option<String>,
    pub price: Option<f64>,
    pub quantity: Option<u32>,
    pub device_type: Option<String>,
    pub session_hash: Option<String>,
    pub visitor_hash: Option<String>,
    pub user_id: Option<String>,
    pub created_at: u32,
    pub metadata: Option<String>,
}

/// Column list matching [`EventRow`] field order up to `created_at`,
/// qualified with `e.`. The metadata column follows it.
pub const EVENT_COLUMNS: &str = "e.id, e.tenant_id, e.event_type_id, e.category_id, e.action_id, \
     e.page_id, e.browser_id, e.label, e.value, e.product_id, e.product_name, e.category_name, \
     e.price, e.quantity, e.device_type, e.session_hash, e.visitor_hash, e.user_id, \
     e.created_at";

/// Metadata select expression; a typed NULL when the caller skips it.
pub fn metadata_column(skip: bool) -> &'static str {
    if skip {
        "CAST(NULL, 'Nullable(String)')"
    } else {
        "e.metadata"
    }
}

impl TryFrom<StoredEvent> for EventRow {
    type Error = Error;

    fn try_from(event: StoredEvent) -> Result<Self> {
        let created_at = u32::try_from(event.created_at).map_err(|_| {
            Error::store(format!("created_at {} out of range", event.created_at))
        })?;

        Ok(Self {
            id: event.id.to_string(),
            tenant_id: event.tenant_id.into(),
            event_type_id: event.event_type_id,
            category_id: event.category_id,
            action_id: event.action_id,
            page_id: event.page_id,
            browser_id: event.browser_id,
            label: event.label,
            value: event.value,
            product_id: event.product_id,
            product_name: event.product_name,
            category_name: event.category_name,
            price: event.price,
            quantity: event.quantity,
            device_type: event.device_type,
            session_hash: event.session_hash,
            visitor_hash: event.visitor_hash,
            user_id: event.user_id,
            created_at,
            metadata: event.metadata,
        })
    }
}

/// Event row joined with its dictionary names.
///
/// Unmatched joins come back as empty strings.
#[derive(Debug, Clone, Row, Deserialize)]
pub struct JoinedEventRow {
    pub id: String,
    pub tenant_id: String,
    pub event_type_id: DictId,
    pub category_id: DictId,
    pub action_id: DictId,
    pub page_id: Option<DictId>,
    pub browser_id: Option<DictId>,
    pub label: Option<String>,
    pub value: Option<f64>,
    pub product_id: Option<i64>,
    pub product_name: Option<String>,
    pub category_name: Option<String>,
    pub price: Option<f64>,
    pub quantity: Option<u32>,
    pub device_type: Option<String>,
    pub session_hash: Option<String>,
    pub visitor_hash: Option<String>,
    pub user_id: Option<String>,
    pub created_at: u32,
    pub metadata: Option<String>,
    pub event_type: String,
    pub category: String,
    pub action: String,
    pub page: String,
    pub browser: String,
}

fn required(name: String) -> String {
    if name.is_empty() {
        "unknown".to_string()
    } else {
        name
    }
}

fn optional(id: Option<DictId>, name: String) -> Option<String> {
    id.filter(|_| !name.is_empty()).map(|_| name)
}

impl TryFrom<JoinedEventRow> for EventRecord {
    type Error = Error;

    fn try_from(row: JoinedEventRow) -> Result<Self> {
        let id = Uuid::parse_str(&row.id)
            .map_err(|e| Error::store(format!("stored event id '{}' is invalid: {e}", row.id)))?;

        Ok(EventRecord {
            event_type: required(row.event_type),
            category: required(row.category),
            action: required(row.action),
            page: optional(row.page_id, row.page),
            browser: optional(row.browser_id, row.browser),
            event: StoredEvent {
                id,
                tenant_id: TenantId::parse(&row.tenant_id)?,
                event_type_id: row.event_type_id,
                category_id: row.category_id,
                action_id: row.action_id,
                page_id: row.page_id,
                browser_id: row.browser_id,
                label: row.label,
                value: row.value,
                product_id: row.product_id,
                product_name: row.product_name,
                category_name: row.category_name,
                price: row.price,
                quantity: row.quantity,
                device_type: row.device_type,
                session_hash: row.session_hash,
                visitor_hash: row.visitor_hash,
                user_id: row.user_id,
                created_at: i64::from(row.created_at),
                metadata: row.metadata,
            },
        })
    }
}
