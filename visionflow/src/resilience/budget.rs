//! Provider-scoped consumption budget.
//!
//! The ledger only records. Enforcement happens in the stage executor, which
//! checks `remaining` before a stage and clamps charges to `headroom`.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Static budget allocation table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetConfig {
    /// Ceiling per provider identifier.
    #[serde(default = "default_allocations")]
    pub allocations: BTreeMap<String, u64>,
    /// Overrun allowance shared by all providers.
    #[serde(default = "default_buffer")]
    pub buffer: u64,
}

fn default_allocations() -> BTreeMap<String, u64> {
    BTreeMap::from([
        ("metadata-extractor".to_string(), 100),
        ("vision-analyzer".to_string(), 4000),
        ("synthesis-provider".to_string(), 6000),
    ])
}

fn default_buffer() -> u64 {
    1000
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            allocations: default_allocations(),
            buffer: default_buffer(),
        }
    }
}

impl BudgetConfig {
    /// Sets the allocation for one provider.
    #[must_use]
    pub fn with_allocation(mut self, provider_id: impl Into<String>, ceiling: u64) -> Self {
        self.allocations.insert(provider_id.into(), ceiling);
        self
    }

    /// Sets the shared buffer.
    #[must_use]
    pub fn with_buffer(mut self, buffer: u64) -> Self {
        self.buffer = buffer;
        self
    }
}

/// Ceiling and consumption of one provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BudgetAccount {
    /// Allocated ceiling.
    pub ceiling: u64,
    /// Units consumed so far.
    pub consumed: u64,
}

/// Aggregate budget statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BudgetStats {
    /// Units consumed across all providers.
    pub consumed: u64,
    /// Sum of all provider ceilings.
    pub ceiling: u64,
    /// Share of the total ceiling left unused, 0..=100.
    pub efficiency_percent: u8,
}

#[derive(Debug, Default)]
struct LedgerInner {
    accounts: BTreeMap<String, BudgetAccount>,
    buffer: u64,
}

/// Consumption ledger keyed by provider identifier.
///
/// Internally synchronized so one ledger can be shared across a batch of runs.
#[derive(Debug, Default)]
pub struct BudgetLedger {
    inner: Mutex<LedgerInner>,
}

impl BudgetLedger {
    /// Creates a ledger from an allocation table with nothing consumed.
    #[must_use]
    pub fn new(config: &BudgetConfig) -> Self {
        let accounts = config
            .allocations
            .iter()
            .map(|(provider, ceiling)| {
                (
                    provider.clone(),
                    BudgetAccount {
                        ceiling: *ceiling,
                        consumed: 0,
                    },
                )
            })
            .collect();

        Self {
            inner: Mutex::new(LedgerInner {
                accounts,
                buffer: config.buffer,
            }),
        }
    }

    /// Ceiling minus consumption for `provider_id`, never below zero.
    ///
    /// Providers without an allocation have nothing remaining.
    #[must_use]
    pub fn remaining(&self, provider_id: &str) -> u64 {
        self.inner
            .lock()
            .accounts
            .get(provider_id)
            .map_or(0, |a| a.ceiling.saturating_sub(a.consumed))
    }

    /// Units that may still be charged to `provider_id` without exceeding
    /// `ceiling + buffer`.
    #[must_use]
    pub fn headroom(&self, provider_id: &str) -> u64 {
        let inner = self.inner.lock();
        inner.accounts.get(provider_id).map_or(inner.buffer, |a| {
            a.ceiling
                .saturating_add(inner.buffer)
                .saturating_sub(a.consumed)
        })
    }

    /// Records `units` of consumption for `provider_id`.
    pub fn charge(&self, provider_id: &str, units: u64) {
        let mut inner = self.inner.lock();
        let account = inner.accounts.entry(provider_id.to_string()).or_default();
        account.consumed = account.consumed.saturating_add(units);
    }

    /// Records `units` capped at the provider's headroom and returns what was recorded.
    ///
    /// The check and the update happen under one lock, so concurrent runs
    /// sharing the ledger cannot push consumption past `ceiling + buffer`.
    pub fn charge_within_headroom(&self, provider_id: &str, units: u64) -> u64 {
        let mut inner = self.inner.lock();
        let buffer = inner.buffer;
        let account = inner.accounts.entry(provider_id.to_string()).or_default();
        let headroom = account
            .ceiling
            .saturating_add(buffer)
            .saturating_sub(account.consumed);
        let charged = units.min(headroom);
        account.consumed = account.consumed.saturating_add(charged);
        charged
    }

    /// Returns the account for `provider_id`.
    #[must_use]
    pub fn account(&self, provider_id: &str) -> Option<BudgetAccount> {
        self.inner.lock().accounts.get(provider_id).copied()
    }

    /// Returns every account, ordered by provider identifier.
    #[must_use]
    pub fn accounts(&self) -> Vec<(String, BudgetAccount)> {
        self.inner
            .lock()
            .accounts
            .iter()
            .map(|(k, v)| (k.clone(), *v))
            .collect()
    }

    /// The shared overrun buffer.
    #[must_use]
    pub fn buffer(&self) -> u64 {
        self.inner.lock().buffer
    }

    /// Zeroes every consumption counter.
    pub fn reset(&self) {
        for account in self.inner.lock().accounts.values_mut() {
            account.consumed = 0;
        }
    }

    /// `round((1 - totalConsumed / totalCeiling) * 100)`, clamped to 0..=100.
    #[must_use]
    pub fn efficiency(&self) -> u8 {
        self.stats().efficiency_percent
    }

    /// Aggregate consumption statistics.
    #[must_use]
    pub fn stats(&self) -> BudgetStats {
        let inner = self.inner.lock();
        let consumed: u64 = inner.accounts.values().map(|a| a.consumed).sum();
        let ceiling: u64 = inner.accounts.values().map(|a| a.ceiling).sum();

        #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let efficiency_percent = if ceiling == 0 {
            100
        } else {
            let ratio = 1.0 - consumed as f64 / ceiling as f64;
            (ratio * 100.0).round().clamp(0.0, 100.0) as u8
        };

        BudgetStats {
            consumed,
            ceiling,
            efficiency_percent,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> BudgetConfig {
        BudgetConfig {
            allocations: BTreeMap::from([
                ("stage1".to_string(), 100),
                ("stage2".to_string(), 200),
                ("stage3".to_string(), 300),
            ]),
            buffer: 50,
        }
    }

    #[test]
    fn test_fresh_ledger() {
        let ledger = BudgetLedger::new(&config());
        assert_eq!(ledger.remaining("stage1"), 100);
        assert_eq!(ledger.stats().consumed, 0);
        assert_eq!(ledger.stats().ceiling, 600);
        assert_eq!(ledger.efficiency(), 100);
    }

    #[test]
    fn test_charge_reduces_remaining() {
        let ledger = BudgetLedger::new(&config());
        ledger.charge("stage2", 150);

        assert_eq!(ledger.remaining("stage2"), 50);
        assert_eq!(ledger.headroom("stage2"), 100);
        assert_eq!(ledger.remaining("stage1"), 100);
    }

    #[test]
    fn test_remaining_never_negative() {
        let ledger = BudgetLedger::new(&config());
        ledger.charge("stage1", 140);

        assert_eq!(ledger.remaining("stage1"), 0);
        assert_eq!(ledger.headroom("stage1"), 10);
    }

    #[test]
    fn test_charge_within_headroom_caps() {
        let ledger = BudgetLedger::new(&config());

        assert_eq!(ledger.charge_within_headroom("stage1", 120), 120);
        assert_eq!(ledger.charge_within_headroom("stage1", 100), 30);
        assert_eq!(ledger.account("stage1").unwrap().consumed, 150);
        assert_eq!(ledger.headroom("stage1"), 0);
    }

    #[test]
    fn test_unknown_provider_has_no_budget() {
        let ledger = BudgetLedger::new(&config());
        assert_eq!(ledger.remaining("unknown"), 0);
        assert!(ledger.account("unknown").is_none());
    }

    #[test]
    fn test_reset_zeroes_consumption() {
        let ledger = BudgetLedger::new(&config());
        ledger.charge("stage1", 10);
        ledger.charge("stage3", 30);
        ledger.reset();

        assert_eq!(ledger.stats().consumed, 0);
        assert_eq!(ledger.remaining("stage3"), 300);
    }

    #[test]
    fn test_efficiency_formula() {
        let ledger = BudgetLedger::new(&config());
        ledger.charge("stage2", 150);

        let stats = ledger.stats();
        let expected = ((1.0 - stats.consumed as f64 / stats.ceiling as f64) * 100.0).round();
        assert_eq!(stats.efficiency_percent, expected as u8);
        assert_eq!(stats.efficiency_percent, 75);
    }

    #[test]
    fn test_efficiency_clamped_on_overrun() {
        let ledger = BudgetLedger::new(&BudgetConfig {
            allocations: BTreeMap::from([("p".to_string(), 10)]),
            buffer: 5,
        });
        ledger.charge("p", 15);
        assert_eq!(ledger.efficiency(), 0);
    }

    #[test]
    fn test_empty_ledger_efficiency() {
        let ledger = BudgetLedger::default();
        assert_eq!(ledger.efficiency(), 100);
    }

    #[test]
    fn test_accounts_ordered() {
        let ledger = BudgetLedger::new(&config());
        let names: Vec<_> = ledger.accounts().into_iter().map(|(k, _)| k).collect();
        assert_eq!(names, vec!["stage1", "stage2", "stage3"]);
    }
}
