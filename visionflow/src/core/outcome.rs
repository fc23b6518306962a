//! Stage outcomes and their audit status lines.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::payload::StagePayload;
use super::status::StageKind;
use crate::errors::ErrorKind;

/// The recorded result of one stage, successful or not.
///
/// Outcomes are built once by the stage executor and then only read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageOutcome {
    /// Stage identifier used for breaker bookkeeping.
    pub stage_id: String,
    /// Provider identifier used for budget bookkeeping.
    pub provider_id: String,
    /// Which pipeline stage produced the outcome.
    pub stage_kind: StageKind,
    /// Whether the stage produced a real payload.
    pub succeeded: bool,
    /// When the executor picked up the stage.
    pub started_at: DateTime<Utc>,
    /// When the executor finished with the stage.
    pub finished_at: DateTime<Utc>,
    /// Units charged to the provider's budget.
    pub consumed_units: u64,
    /// The real payload on success, a fallback payload otherwise.
    pub payload: StagePayload,
    /// Why the stage did not succeed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    /// Last provider error message, if any attempt failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Number of retries performed after the first attempt.
    pub retries_used: u32,
}

impl StageOutcome {
    /// Creates a successful outcome.
    #[must_use]
    pub fn success(
        stage_kind: StageKind,
        stage_id: impl Into<String>,
        provider_id: impl Into<String>,
        started_at: DateTime<Utc>,
        payload: StagePayload,
        consumed_units: u64,
        retries_used: u32,
    ) -> Self {
        Self {
            stage_id: stage_id.into(),
            provider_id: provider_id.into(),
            stage_kind,
            succeeded: true,
            started_at,
            finished_at: Utc::now(),
            consumed_units,
            payload,
            error_kind: None,
            error_message: None,
            retries_used,
        }
    }

    /// Creates a failed or skipped outcome carrying a fallback payload.
    #[must_use]
    pub fn failure(
        stage_kind: StageKind,
        stage_id: impl Into<String>,
        provider_id: impl Into<String>,
        started_at: DateTime<Utc>,
        error_kind: ErrorKind,
        fallback: StagePayload,
        retries_used: u32,
    ) -> Self {
        Self {
            stage_id: stage_id.into(),
            provider_id: provider_id.into(),
            stage_kind,
            succeeded: false,
            started_at,
            finished_at: Utc::now(),
            consumed_units: 0,
            payload: fallback,
            error_kind: Some(error_kind),
            error_message: None,
            retries_used,
        }
    }

    /// Sets the last provider error message.
    #[must_use]
    pub fn with_error_message(mut self, message: impl Into<String>) -> Self {
        self.error_message = Some(message.into());
        self
    }

    /// Returns the outcome as a `Result`: the real payload or the error kind.
    pub fn as_result(&self) -> Result<&StagePayload, ErrorKind> {
        match (self.succeeded, self.error_kind) {
            (true, _) => Ok(&self.payload),
            (false, Some(kind)) => Err(kind),
            (false, None) => Err(ErrorKind::StageFailed),
        }
    }

    /// Wall-clock duration in milliseconds.
    #[must_use]
    pub fn duration_ms(&self) -> i64 {
        (self.finished_at - self.started_at).num_milliseconds()
    }

    /// Compact audit line for this outcome.
    #[must_use]
    pub fn status_line(&self) -> StageStatusLine {
        StageStatusLine {
            stage_id: self.stage_id.clone(),
            provider_id: self.provider_id.clone(),
            succeeded: self.succeeded,
            error_kind: self.error_kind,
        }
    }
}

/// Compact per-stage status recorded alongside a run for audit purposes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageStatusLine {
    /// Stage identifier.
    pub stage_id: String,
    /// Provider identifier.
    pub provider_id: String,
    /// Whether the stage succeeded.
    pub succeeded: bool,
    /// Why it did not.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
}

impl fmt::Display for StageStatusLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.error_kind {
            None if self.succeeded => write!(f, "{} [{}]: ok", self.stage_id, self.provider_id),
            None => write!(f, "{} [{}]: failed", self.stage_id, self.provider_id),
            Some(kind) => write!(f, "{} [{}]: {}", self.stage_id, self.provider_id, kind),
        }
    }
}
