//! Short-window duplicate suppression.
//!
//! A process-local map from [`DedupKey`] to the epoch-ms timestamp of its
//! last acceptance. There are no per-entry timers: expired entries are
//! removed by a full sweep that runs only when an insert pushes the map past
//! its capacity threshold, so between sweeps the map may exceed that bound.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::clock::SharedClock;
use crate::events::DedupKey;
use crate::limits::{DEFAULT_DEDUP_CAPACITY, DEFAULT_DEDUP_TTL_MS};

/// Dedup window configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DedupConfig {
    /// Window length in milliseconds
    #[serde(default = "default_ttl_ms")]
    pub ttl_ms: u64,
    /// Key count that triggers a sweep
    #[serde(default = "default_capacity")]
    pub capacity: usize,
}

fn default_ttl_ms() -> u64 {
    DEFAULT_DEDUP_TTL_MS
}

fn default_capacity() -> usize {
    DEFAULT_DEDUP_CAPACITY
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            ttl_ms: default_ttl_ms(),
            capacity: default_capacity(),
        }
    }
}

/// Outcome of checking a key against the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Observation {
    /// Key was accepted within the window; nothing was recorded.
    Duplicate,
    /// Key was recorded as accepted now.
    Novel,
}

/// Bounded TTL cache of recently accepted event signatures.
pub struct DedupWindow {
    entries: Mutex<HashMap<DedupKey, i64>>,
    config: DedupConfig,
    clock: SharedClock,
}

impl DedupWindow {
    pub fn new(config: DedupConfig, clock: SharedClock) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            config,
            clock,
        }
    }

    pub fn config(&self) -> &DedupConfig {
        &self.config
    }

    fn is_fresh(&self, accepted_at: i64, now: i64) -> bool {
        now.saturating_sub(accepted_at) < self.config.ttl_ms as i64
    }

    /// Whether `key` was accepted less than one TTL ago.
    pub fn seen(&self, key: &DedupKey) -> bool {
        let now = self.clock.now_ms();
        self.entries
            .lock()
            .get(key)
            .is_some_and(|&accepted_at| self.is_fresh(accepted_at, now))
    }

    /// Records `key` as accepted now, sweeping if over capacity.
    pub fn remember(&self, key: DedupKey) {
        let now = self.clock.now_ms();
        let mut entries = self.entries.lock();
        entries.insert(key, now);
        if entries.len() > self.config.capacity {
            self.sweep_locked(&mut entries, now);
        }
    }

    /// Check and record in one step.
    pub fn observe(&self, key: DedupKey) -> Observation {
        let now = self.clock.now_ms();
        let mut entries = self.entries.lock();

        if let Some(&accepted_at) = entries.get(&key) {
            if self.is_fresh(accepted_at, now) {
                return Observation::Duplicate;
            }
        }

        entries.insert(key, now);
        if entries.len() > self.config.capacity {
            self.sweep_locked(&mut entries, now);
        }
        Observation::Novel
    }

    /// Withdraws an acceptance whose write never got scheduled.
    pub fn forget(&self, key: &DedupKey) {
        self.entries.lock().remove(key);
    }

    /// Removes every expired entry. Returns the number removed.
    pub fn sweep(&self) -> usize {
        let now = self.clock.now_ms();
        let mut entries = self.entries.lock();
        self.sweep_locked(&mut entries, now)
    }

    fn sweep_locked(&self, entries: &mut HashMap<DedupKey, i64>, now: i64) -> usize {
        let before = entries.len();
        entries.retain(|_, &mut accepted_at| self.is_fresh(accepted_at, now));
        before - entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Drops all entries.
    pub fn reset(&self) {
        self.entries.lock().clear();
    }
}
