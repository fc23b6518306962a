//! Stage executor: breaker and budget gates, per-attempt timeout, retries.
//!
//! The executor never returns an error. Whatever happens, the caller gets a
//! [`StageOutcome`] carrying either the real payload or a fallback.

use chrono::Utc;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::StageConfig;
use crate::core::{StageOutcome, StagePayload};
use crate::errors::{ErrorKind, ProviderError};
use crate::quality::fallback_payload;
use crate::resilience::{BreakerRegistry, BudgetLedger, RetryConfig};

/// What a successful provider call hands back to the executor.
#[derive(Debug, Clone, PartialEq)]
pub struct StageYield {
    /// The real payload.
    pub payload: StagePayload,
    /// Units the call consumed.
    pub consumed_units: u64,
}

impl StageYield {
    /// Creates a yield.
    #[must_use]
    pub fn new(payload: impl Into<StagePayload>, consumed_units: u64) -> Self {
        Self {
            payload: payload.into(),
            consumed_units,
        }
    }
}

/// Runs one stage operation under breaker, budget and retry policy.
#[derive(Debug, Clone)]
pub struct StageExecutor {
    breakers: Arc<BreakerRegistry>,
    budget: Arc<BudgetLedger>,
    retry: RetryConfig,
}

impl StageExecutor {
    /// Creates an executor over the given registry and ledger.
    #[must_use]
    pub fn new(breakers: Arc<BreakerRegistry>, budget: Arc<BudgetLedger>, retry: RetryConfig) -> Self {
        Self {
            breakers,
            budget,
            retry,
        }
    }

    /// Returns the retry configuration.
    #[must_use]
    pub fn retry_config(&self) -> &RetryConfig {
        &self.retry
    }

    /// Executes `operation` with the configured number of retries.
    pub async fn execute<F, Fut>(&self, stage: &StageConfig, operation: F) -> StageOutcome
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<StageYield, ProviderError>>,
    {
        self.execute_with_retries(stage, self.retry.max_retries, operation)
            .await
    }

    /// Executes `operation` with at most `max_retries` retries.
    ///
    /// Order of checks: open breaker, then remaining budget, then attempts.
    /// Only the final exhaustion is reported to the breaker registry.
    pub async fn execute_with_retries<F, Fut>(
        &self,
        stage: &StageConfig,
        max_retries: u32,
        mut operation: F,
    ) -> StageOutcome
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<StageYield, ProviderError>>,
    {
        let started_at = Utc::now();

        if self.breakers.is_open(&stage.stage_id) {
            info!(
                stage = %stage.stage_id,
                provider = %stage.provider_id,
                "Circuit breaker open, skipping stage"
            );
            return StageOutcome::failure(
                stage.kind,
                &stage.stage_id,
                &stage.provider_id,
                started_at,
                ErrorKind::BreakerOpen,
                fallback_payload(stage.kind),
                0,
            );
        }

        let remaining = self.budget.remaining(&stage.provider_id);
        if remaining < stage.min_units {
            warn!(
                stage = %stage.stage_id,
                provider = %stage.provider_id,
                remaining,
                required = stage.min_units,
                "Budget exhausted, skipping stage"
            );
            return StageOutcome::failure(
                stage.kind,
                &stage.stage_id,
                &stage.provider_id,
                started_at,
                ErrorKind::BudgetExhausted,
                fallback_payload(stage.kind),
                0,
            )
            .with_error_message(format!(
                "remaining budget {remaining} is below the required {}",
                stage.min_units
            ));
        }

        let timeout = self.retry.attempt_timeout();
        let mut attempt: u32 = 0;

        let last_error = loop {
            let result = match tokio::time::timeout(timeout, operation()).await {
                Ok(result) => result,
                Err(_) => Err(ProviderError::Timeout {
                    after_ms: self.retry.attempt_timeout_ms,
                }),
            };

            match result {
                Ok(yielded) => {
                    self.breakers.record_success(&stage.stage_id);
                    let charged = self.charge(stage, yielded.consumed_units);
                    debug!(
                        stage = %stage.stage_id,
                        provider = %stage.provider_id,
                        retries = attempt,
                        units = charged,
                        "Stage succeeded"
                    );
                    return StageOutcome::success(
                        stage.kind,
                        &stage.stage_id,
                        &stage.provider_id,
                        started_at,
                        yielded.payload,
                        charged,
                        attempt,
                    );
                }
                Err(error) if attempt < max_retries => {
                    let delay = self.retry.delay_for(attempt);
                    debug!(
                        stage = %stage.stage_id,
                        attempt = attempt + 1,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error_type = error.type_name(),
                        error = %error,
                        "Retrying stage after error"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(error) => break error,
            }
        };

        let failures = self.breakers.record_failure(&stage.stage_id);
        warn!(
            stage = %stage.stage_id,
            provider = %stage.provider_id,
            retries = attempt,
            breaker_failures = failures,
            error_type = last_error.type_name(),
            error = %last_error,
            "Stage failed after exhausting retries, substituting fallback"
        );

        StageOutcome::failure(
            stage.kind,
            &stage.stage_id,
            &stage.provider_id,
            started_at,
            ErrorKind::StageFailed,
            fallback_payload(stage.kind),
            attempt,
        )
        .with_error_message(last_error.to_string())
    }

    fn charge(&self, stage: &StageConfig, units: u64) -> u64 {
        let charged = self
            .budget
            .charge_within_headroom(&stage.provider_id, units);
        if charged < units {
            warn!(
                stage = %stage.stage_id,
                provider = %stage.provider_id,
                reported = units,
                charged,
                "Stage consumption exceeded budget headroom, charge capped"
            );
        }
        charged
    }
}
