//! Windowed event queries against the Event Store.

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result, ValidationErrorCode};
use crate::limits::{DEFAULT_QUERY_LIMIT, MAX_QUERY_LIMIT};
use crate::stored::EventRecord;
use crate::tenant::TenantId;

/// Filters for listing a tenant's stored events.
///
/// `start` is inclusive and `end` exclusive, both in epoch seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventQuery {
    pub tenant: TenantId,
    pub session_hash: Option<String>,
    pub visitor_hash: Option<String>,
    pub user_id: Option<String>,
    pub start: Option<i64>,
    pub end: Option<i64>,
    pub event_type: Option<String>,
    pub category: Option<String>,
    pub action: Option<String>,
    pub limit: u32,
    pub offset: u32,
    /// Leave `metadata` unset on returned rows
    #[serde(default)]
    pub skip_metadata: bool,
}

impl EventQuery {
    /// Unfiltered query for a tenant with the default page size.
    pub fn for_tenant(tenant: TenantId) -> Self {
        Self {
            tenant,
            session_hash: None,
            visitor_hash: None,
            user_id: None,
            start: None,
            end: None,
            event_type: None,
            category: None,
            action: None,
            limit: DEFAULT_QUERY_LIMIT,
            offset: 0,
            skip_metadata: false,
        }
    }

    /// Same filters without paging, for aggregate computation.
    pub fn unbounded(mut self) -> Self {
        self.limit = u32::MAX;
        self.offset = 0;
        self
    }

    /// Rows come back without their metadata blob.
    pub fn without_metadata(mut self) -> Self {
        self.skip_metadata = true;
        self
    }

    /// Clamps `limit` into `1..=MAX_QUERY_LIMIT`.
    pub fn with_page(mut self, limit: Option<u32>, offset: u32) -> Self {
        self.limit = limit.unwrap_or(DEFAULT_QUERY_LIMIT).clamp(1, MAX_QUERY_LIMIT);
        self.offset = offset;
        self
    }

    /// Whether a record satisfies every filter except paging.
    pub fn matches(&self, record: &EventRecord) -> bool {
        let event = &record.event;

        event.tenant_id == self.tenant
            && eq_opt(&self.session_hash, event.session_hash.as_deref())
            && eq_opt(&self.visitor_hash, event.visitor_hash.as_deref())
            && eq_opt(&self.user_id, event.user_id.as_deref())
            && self.start.map_or(true, |s| event.created_at >= s)
            && self.end.map_or(true, |e| event.created_at < e)
            && eq_opt(&self.event_type, Some(record.event_type.as_str()))
            && eq_opt(&self.category, Some(record.category.as_str()))
            && eq_opt(&self.action, Some(record.action.as_str()))
    }
}

fn eq_opt(filter: &Option<String>, value: Option<&str>) -> bool {
    match filter {
        Some(expected) => value == Some(expected.as_str()),
        None => true,
    }
}

/// One page of query results plus the unpaged match count.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventPage {
    pub records: Vec<EventRecord>,
    pub total: u64,
}

/// Which end of a date range a bound is parsed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateBound {
    Start,
    End,
}

/// Parses a date range bound into epoch seconds.
///
/// Accepts RFC 3339 timestamps or `YYYY-MM-DD`. A date-only end bound
/// covers that whole day; any end bound is returned as an exclusive limit.
pub fn parse_date_bound(raw: &str, bound: DateBound) -> Result<i64> {
    let raw = raw.trim();

    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        let secs = ts.timestamp();
        return Ok(match bound {
            DateBound::Start => secs,
            DateBound::End => secs + 1,
        });
    }

    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| {
        Error::validation_code(
            ValidationErrorCode::InvalidParameter,
            format!("'{raw}' is not a date (expected YYYY-MM-DD or RFC 3339)"),
        )
    })?;

    let date = match bound {
        DateBound::Start => date,
        DateBound::End => date + Duration::days(1),
    };

    date.and_hms_opt(0, 0, 0)
        .map(|dt| Utc.from_utc_datetime(&dt).timestamp())
        .ok_or_else(|| Error::internal("midnight is always representable"))
}
