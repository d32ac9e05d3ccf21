//! Periodic retention sweep across all tenants.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{error, info};

use crate::retention::RetentionSweeper;

/// Scheduled retention configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetentionScheduleConfig {
    /// Off unless explicitly enabled
    #[serde(default)]
    pub schedule_enabled: bool,
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    #[serde(default = "default_days_old")]
    pub days_old: u32,
}

fn default_interval_secs() -> u64 {
    86_400
}

fn default_days_old() -> u32 {
    90
}

impl Default for RetentionScheduleConfig {
    fn default() -> Self {
        Self {
            schedule_enabled: false,
            interval_secs: default_interval_secs(),
            days_old: default_days_old(),
        }
    }
}

/// Spawns the sweep loop if enabled. The first run happens one interval
/// after startup.
pub fn spawn_retention_schedule(
    config: &RetentionScheduleConfig,
    sweeper: Arc<RetentionSweeper>,
) -> Option<JoinHandle<()>> {
    if !config.schedule_enabled {
        return None;
    }

    let period = Duration::from_secs(config.interval_secs.max(1));
    let days_old = config.days_old;
    info!(interval_secs = period.as_secs(), days_old, "Scheduled retention sweep enabled");

    Some(tokio::spawn(async move {
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            if let Err(e) = sweeper.purge(None, days_old, false).await {
                error!(error = %e, "Scheduled retention sweep failed");
            }
        }
    }))
}
