//! Cache key generation and per-window TTLs.

use chrono::{Datelike, Duration as ChronoDuration, NaiveDate};
use pipeline_core::error::{Error, Result, ValidationErrorCode};
use pipeline_core::TenantId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Namespace for aggregate analytics entries.
pub const ANALYTICS_NAMESPACE: &str = "analytics";

/// Aggregation window of a cached metrics entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricsWindow {
    Realtime,
    #[default]
    Daily,
    Weekly,
    Monthly,
}

impl MetricsWindow {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Realtime => "realtime",
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
        }
    }

    /// How long an entry for this window stays fresh.
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(match self {
            Self::Realtime => 30,
            Self::Daily => 3_600,
            Self::Weekly => 21_600,
            Self::Monthly => 86_400,
        })
    }

    /// Longest TTL of any window.
    pub fn max_ttl() -> Duration {
        Self::Monthly.ttl()
    }

    /// Date range the window covers when the caller gives none.
    pub fn default_range(&self, today: NaiveDate) -> (NaiveDate, NaiveDate) {
        match self {
            Self::Realtime | Self::Daily => (today, today),
            Self::Weekly => {
                let monday =
                    today - ChronoDuration::days(i64::from(today.weekday().num_days_from_monday()));
                (monday, monday + ChronoDuration::days(6))
            }
            Self::Monthly => {
                let first = today.with_day(1).unwrap_or(today);
                let next = if first.month() == 12 {
                    NaiveDate::from_ymd_opt(first.year() + 1, 1, 1)
                } else {
                    NaiveDate::from_ymd_opt(first.year(), first.month() + 1, 1)
                };
                let last = next.map(|n| n - ChronoDuration::days(1)).unwrap_or(first);
                (first, last)
            }
        }
    }
}

impl fmt::Display for MetricsWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MetricsWindow {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "realtime" => Ok(Self::Realtime),
            "daily" => Ok(Self::Daily),
            "weekly" => Ok(Self::Weekly),
            "monthly" => Ok(Self::Monthly),
            other => Err(Error::validation_code(
                ValidationErrorCode::InvalidParameter,
                format!("unknown metrics window '{other}'"),
            )),
        }
    }
}

/// What a metrics entry was computed over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsScope {
    pub tenant: TenantId,
    pub start: NaiveDate,
    /// Inclusive
    pub end: NaiveDate,
    pub user_id: Option<String>,
    pub session_id: Option<String>,
}

/// A namespaced cache key owned by one tenant.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    namespace: &'static str,
    tenant: TenantId,
    key: String,
}

impl CacheKey {
    /// `<namespace>:<body>:tenant:<tenant>`
    pub fn new(namespace: &'static str, tenant: TenantId, body: impl fmt::Display) -> Self {
        let key = format!("{namespace}:{body}:tenant:{tenant}");
        Self {
            namespace,
            tenant,
            key,
        }
    }

    /// Key for an aggregate metrics entry.
    pub fn metrics(window: MetricsWindow, scope: &MetricsScope) -> Self {
        let mut body = match window {
            MetricsWindow::Realtime => format!(
                "realtime:{}:{}",
                scope.start.format("%Y-%m-%d"),
                scope.end.format("%Y-%m-%d")
            ),
            MetricsWindow::Daily => format!("daily:{}", scope.start.format("%Y-%m-%d")),
            MetricsWindow::Weekly => {
                let week = scope.start.iso_week();
                format!("weekly:{}-W{:02}", week.year(), week.week())
            }
            MetricsWindow::Monthly => format!("monthly:{}", scope.start.format("%Y-%m")),
        };

        if let Some(user) = &scope.user_id {
            body.push_str(&format!(":user:{user}"));
        }
        if let Some(session) = &scope.session_id {
            body.push_str(&format!(":session:{session}"));
        }

        Self::new(ANALYTICS_NAMESPACE, scope.tenant.clone(), body)
    }

    pub fn as_str(&self) -> &str {
        &self.key
    }

    pub fn namespace(&self) -> &'static str {
        self.namespace
    }

    pub fn tenant(&self) -> &TenantId {
        &self.tenant
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key)
    }
}
