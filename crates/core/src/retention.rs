//! Retention cutoff computation and purge reporting.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result, ValidationErrorCode};

const SECS_PER_DAY: i64 = 86_400;

/// Cutoff in epoch seconds: rows with `created_at < cutoff` are purged.
pub fn retention_cutoff(now_secs: i64, days_old: u32) -> Result<i64> {
    if days_old == 0 {
        return Err(Error::validation_code(
            ValidationErrorCode::InvalidParameter,
            "daysOld must be at least 1",
        ));
    }
    Ok(now_secs - i64::from(days_old) * SECS_PER_DAY)
}

/// Outcome of a purge or a purge preview.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PurgeReport {
    pub dry_run: bool,
    /// Rows deleted, or rows that would be deleted on a dry run
    pub affected: u64,
    /// Epoch seconds
    pub cutoff: i64,
}

impl PurgeReport {
    /// Cutoff as an RFC 3339 timestamp.
    pub fn cutoff_date(&self) -> String {
        DateTime::<Utc>::from_timestamp(self.cutoff, 0)
            .map(|dt| dt.to_rfc3339())
            .unwrap_or_else(|| self.cutoff.to_string())
    }
}
