//! Per-stage circuit breaker registry.
//!
//! # States
//! - Closed: fewer than `failure_threshold` consecutive failures
//! - Open: threshold reached and the last failure is within the cooldown
//! - Reset: cooldown elapsed; the entry is dropped lazily on the next check
//!
//! The registry is meant to outlive individual runs so a chronically failing
//! provider stays tripped across unrelated assets. Entries are expired on
//! read, so no background sweeper is needed.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Configuration for circuit breakers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakerConfig {
    /// Consecutive failures that open the breaker.
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,
    /// Seconds after the last failure before the entry is cleared.
    #[serde(default = "default_cooldown_secs")]
    pub cooldown_secs: u64,
}

fn default_failure_threshold() -> u32 {
    3
}

fn default_cooldown_secs() -> u64 {
    300
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: default_failure_threshold(),
            cooldown_secs: default_cooldown_secs(),
        }
    }
}

impl BreakerConfig {
    /// Cooldown as a `Duration`.
    #[must_use]
    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_secs)
    }
}

/// Observable breaker status for a stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakerStatus {
    /// Calls pass through.
    Closed,
    /// Calls are skipped.
    Open,
}

impl fmt::Display for BreakerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Closed => write!(f, "closed"),
            Self::Open => write!(f, "open"),
        }
    }
}

#[derive(Debug, Clone)]
struct BreakerEntry {
    consecutive_failures: u32,
    last_failure: Instant,
    last_failure_at: DateTime<Utc>,
}

/// Point-in-time view of one breaker entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakerSnapshot {
    /// Stage identifier.
    pub stage_id: String,
    /// Failures since the last success or reset.
    pub consecutive_failures: u32,
    /// Wall-clock time of the last failure.
    pub last_failure_at: DateTime<Utc>,
    /// Status derived from the entry.
    pub status: BreakerStatus,
}

/// Registry of per-stage failure counters.
///
/// All operations are safe to call from concurrent runs.
#[derive(Debug, Default)]
pub struct BreakerRegistry {
    entries: DashMap<String, BreakerEntry>,
    config: BreakerConfig,
}

static PROCESS_WIDE: OnceLock<Arc<BreakerRegistry>> = OnceLock::new();

impl BreakerRegistry {
    /// Creates a registry with the given configuration.
    #[must_use]
    pub fn new(config: BreakerConfig) -> Self {
        Self {
            entries: DashMap::new(),
            config,
        }
    }

    /// Returns the registry shared by every orchestrator in the process
    /// that was not given one explicitly.
    #[must_use]
    pub fn process_wide() -> Arc<Self> {
        PROCESS_WIDE
            .get_or_init(|| Arc::new(Self::default()))
            .clone()
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &BreakerConfig {
        &self.config
    }

    fn is_expired(&self, entry: &BreakerEntry) -> bool {
        entry.last_failure.elapsed() > self.config.cooldown()
    }

    /// Returns true if calls for `stage_id` should be skipped.
    ///
    /// An entry whose cooldown has elapsed is removed and reported closed.
    pub fn is_open(&self, stage_id: &str) -> bool {
        if self
            .entries
            .remove_if(stage_id, |_, entry| self.is_expired(entry))
            .is_some()
        {
            debug!(stage = %stage_id, "Circuit breaker cooldown elapsed, entry cleared");
            return false;
        }

        self.entries
            .get(stage_id)
            .is_some_and(|entry| entry.consecutive_failures >= self.config.failure_threshold)
    }

    /// Returns the status for `stage_id`, applying lazy expiry.
    pub fn status(&self, stage_id: &str) -> BreakerStatus {
        if self.is_open(stage_id) {
            BreakerStatus::Open
        } else {
            BreakerStatus::Closed
        }
    }

    /// Records one exhausted stage for `stage_id` and returns the new failure count.
    ///
    /// A stale entry (cooldown elapsed) restarts counting from one.
    pub fn record_failure(&self, stage_id: &str) -> u32 {
        let now = Instant::now();
        let cooldown = self.config.cooldown();

        let count = {
            let mut entry = self
                .entries
                .entry(stage_id.to_string())
                .or_insert_with(|| BreakerEntry {
                    consecutive_failures: 0,
                    last_failure: now,
                    last_failure_at: Utc::now(),
                });

            if now.duration_since(entry.last_failure) > cooldown {
                entry.consecutive_failures = 0;
            }
            entry.consecutive_failures += 1;
            entry.last_failure = now;
            entry.last_failure_at = Utc::now();
            entry.consecutive_failures
        };

        if count == self.config.failure_threshold {
            warn!(
                stage = %stage_id,
                failures = count,
                cooldown_secs = self.config.cooldown_secs,
                "Circuit breaker opened"
            );
        } else {
            debug!(stage = %stage_id, failures = count, "Circuit breaker failure recorded");
        }

        count
    }

    /// Clears the entry for `stage_id`.
    pub fn record_success(&self, stage_id: &str) {
        if self.entries.remove(stage_id).is_some() {
            debug!(stage = %stage_id, "Circuit breaker reset after success");
        }
    }

    /// Returns the current failure count without applying expiry.
    #[must_use]
    pub fn failure_count(&self, stage_id: &str) -> u32 {
        self.entries
            .get(stage_id)
            .map_or(0, |entry| entry.consecutive_failures)
    }

    /// Returns a snapshot of the entry for `stage_id`, if one exists.
    #[must_use]
    pub fn snapshot(&self, stage_id: &str) -> Option<BreakerSnapshot> {
        self.entries.get(stage_id).map(|entry| BreakerSnapshot {
            stage_id: stage_id.to_string(),
            consecutive_failures: entry.consecutive_failures,
            last_failure_at: entry.last_failure_at,
            status: if entry.consecutive_failures >= self.config.failure_threshold
                && !self.is_expired(&entry)
            {
                BreakerStatus::Open
            } else {
                BreakerStatus::Closed
            },
        })
    }

    /// Removes the expired entries among `stage_ids` and returns how many were removed.
    ///
    /// Live entries are left untouched.
    pub fn prune_expired<'a, I>(&self, stage_ids: I) -> usize
    where
        I: IntoIterator<Item = &'a str>,
    {
        stage_ids
            .into_iter()
            .filter(|id| {
                self.entries
                    .remove_if(*id, |_, entry| self.is_expired(entry))
                    .is_some()
            })
            .count()
    }

    /// Number of tracked entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no entries are tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drops every entry.
    pub fn clear(&self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> BreakerRegistry {
        BreakerRegistry::new(BreakerConfig::default())
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_entry_is_closed() {
        let registry = registry();
        assert!(!registry.is_open("metadata"));
        assert_eq!(registry.status("metadata"), BreakerStatus::Closed);
        assert!(registry.snapshot("metadata").is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_opens_exactly_at_threshold() {
        let registry = registry();

        assert_eq!(registry.record_failure("analysis"), 1);
        assert!(!registry.is_open("analysis"));
        assert_eq!(registry.record_failure("analysis"), 2);
        assert!(!registry.is_open("analysis"));
        assert_eq!(registry.record_failure("analysis"), 3);
        assert!(registry.is_open("analysis"));
        assert_eq!(
            registry.snapshot("analysis").unwrap().status,
            BreakerStatus::Open
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_resets_counter() {
        let registry = registry();

        registry.record_failure("analysis");
        registry.record_failure("analysis");
        registry.record_success("analysis");

        assert_eq!(registry.failure_count("analysis"), 0);
        registry.record_failure("analysis");
        assert!(!registry.is_open("analysis"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_auto_clears_after_cooldown() {
        let registry = registry();
        for _ in 0..3 {
            registry.record_failure("synthesis");
        }
        assert!(registry.is_open("synthesis"));

        tokio::time::advance(Duration::from_secs(299)).await;
        assert!(registry.is_open("synthesis"));

        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(!registry.is_open("synthesis"));
        assert!(registry.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_failures_do_not_accumulate() {
        let registry = registry();
        registry.record_failure("metadata");
        registry.record_failure("metadata");

        tokio::time::advance(Duration::from_secs(301)).await;

        assert_eq!(registry.record_failure("metadata"), 1);
        assert!(!registry.is_open("metadata"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stages_are_independent() {
        let registry = registry();
        for _ in 0..3 {
            registry.record_failure("analysis");
        }

        assert!(registry.is_open("analysis"));
        assert!(!registry.is_open("synthesis"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_prune_expired_leaves_live_entries() {
        let registry = registry();
        registry.record_failure("old");
        tokio::time::advance(Duration::from_secs(400)).await;
        registry.record_failure("fresh");

        let removed = registry.prune_expired(["old", "fresh", "unknown"]);

        assert_eq!(removed, 1);
        assert_eq!(registry.failure_count("fresh"), 1);
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_custom_threshold() {
        let registry = BreakerRegistry::new(BreakerConfig {
            failure_threshold: 1,
            cooldown_secs: 10,
        });

        registry.record_failure("metadata");
        assert!(registry.is_open("metadata"));

        tokio::time::advance(Duration::from_secs(11)).await;
        assert!(!registry.is_open("metadata"));
    }

    #[test]
    fn test_process_wide_is_shared() {
        let a = BreakerRegistry::process_wide();
        let b = BreakerRegistry::process_wide();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_failures_are_counted() {
        let registry = Arc::new(registry());
        let mut handles = Vec::new();

        for _ in 0..8 {
            let registry = registry.clone();
            handles.push(tokio::spawn(async move {
                registry.record_failure("shared");
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(registry.failure_count("shared"), 8);
        assert!(registry.is_open("shared"));
    }
}
