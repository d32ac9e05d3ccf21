//! Retention Sweeper: bulk deletion of events older than a cutoff.
//!
//! Rows are removed with `created_at < now - daysOld`. A dry run only counts
//! them. Errors propagate; this is an administrative action with a caller
//! waiting on the result.

use event_store::SharedEventStore;
use metrics_cache::{SharedMetricsCache, ANALYTICS_NAMESPACE};
use pipeline_core::{retention_cutoff, PurgeReport, Result, SharedClock, TenantId};
use std::time::Instant;
use telemetry::metrics;
use tracing::{error, info};

pub struct RetentionSweeper {
    store: SharedEventStore,
    cache: SharedMetricsCache,
    clock: SharedClock,
}

impl RetentionSweeper {
    pub fn new(store: SharedEventStore, cache: SharedMetricsCache, clock: SharedClock) -> Self {
        Self {
            store,
            cache,
            clock,
        }
    }

    /// Purges (or previews purging) one tenant's old events, or every
    /// tenant's when `tenant` is `None`.
    pub async fn purge(
        &self,
        tenant: Option<&TenantId>,
        days_old: u32,
        dry_run: bool,
    ) -> Result<PurgeReport> {
        let start = Instant::now();
        let cutoff = retention_cutoff(self.clock.now_secs(), days_old)?;
        let scope = tenant.map_or("*", |t| t.as_str());

        let affected = if dry_run {
            self.store.count_before(tenant, cutoff).await
        } else {
            self.store.delete_before(tenant, cutoff).await
        }
        .map_err(|e| {
            error!(tenant = scope, days_old, dry_run, error = %e, "Retention purge failed");
            e
        })?;

        if !dry_run {
            metrics().events_purged.inc_by(affected);
            if affected > 0 {
                match tenant {
                    Some(t) => self.cache.invalidate_namespace(ANALYTICS_NAMESPACE, t).await,
                    None => {
                        self.cache
                            .invalidate_pattern(&format!("{ANALYTICS_NAMESPACE}:*"))
                            .await
                    }
                };
            }
        }

        let report = PurgeReport {
            dry_run,
            affected,
            cutoff,
        };
        info!(
            tenant = scope,
            days_old,
            dry_run,
            affected,
            cutoff = %report.cutoff_date(),
            latency_ms = start.elapsed().as_millis() as u64,
            "Retention purge complete"
        );
        Ok(report)
    }
}
