//! Failure-handling and resource-accounting building blocks.
//!
//! This module provides:
//! - Retry configuration with deterministic exponential backoff
//! - A shared per-stage circuit breaker registry
//! - A provider-scoped budget ledger

mod breaker;
mod budget;
mod retry;

pub use breaker::{BreakerConfig, BreakerRegistry, BreakerSnapshot, BreakerStatus};
pub use budget::{BudgetAccount, BudgetConfig, BudgetLedger, BudgetStats};
pub use retry::RetryConfig;
