//! Append-only storage model with dictionary-encoded string columns.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::tenant::TenantId;

/// Integer surrogate key for an interned dictionary value.
pub type DictId = u64;

/// String dictionaries interned by the Event Store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dictionary {
    EventType,
    Category,
    Action,
    Page,
    Browser,
}

impl Dictionary {
    pub const ALL: [Dictionary; 5] = [
        Self::EventType,
        Self::Category,
        Self::Action,
        Self::Page,
        Self::Browser,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EventType => "event_type",
            Self::Category => "category",
            Self::Action => "action",
            Self::Page => "page",
            Self::Browser => "browser",
        }
    }

    /// Backing table name.
    pub fn table(&self) -> &'static str {
        match self {
            Self::EventType => "analytics_event_types",
            Self::Category => "analytics_categories",
            Self::Action => "analytics_actions",
            Self::Page => "analytics_pages",
            Self::Browser => "analytics_browsers",
        }
    }
}

/// Resolved surrogate ids for one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DictionaryIds {
    pub event_type_id: DictId,
    pub category_id: DictId,
    pub action_id: DictId,
    pub page_id: Option<DictId>,
    pub browser_id: Option<DictId>,
}

/// One persisted event row. Never updated after insert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredEvent {
    pub id: Uuid,
    pub tenant_id: TenantId,
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
    /// Epoch seconds
    pub created_at: i64,
    /// Gzip + base64 JSON of the submitted metadata
    pub metadata: Option<String>,
}

/// A stored row joined with its dictionary values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub event: StoredEvent,
    pub event_type: String,
    pub category: String,
    pub action: String,
    pub page: Option<String>,
    pub browser: Option<String>,
}
