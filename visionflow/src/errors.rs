//! Error types for the visionflow pipeline.
//!
//! Stage-level failures never escape the orchestrator: they are captured as
//! [`ErrorKind`] values inside each stage outcome. The error enums here cover
//! the collaborator boundaries (providers, persistence) and configuration.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Why a stage produced no real payload.
///
/// This is recorded on the stage outcome, it is never raised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The circuit breaker for the stage was open; nothing was attempted.
    BreakerOpen,
    /// The provider's remaining budget was below the stage minimum.
    BudgetExhausted,
    /// Every attempt failed; a fallback payload was substituted.
    StageFailed,
}

impl ErrorKind {
    /// Returns true if the stage was skipped without contacting the provider.
    #[must_use]
    pub fn is_skip(&self) -> bool {
        matches!(self, Self::BreakerOpen | Self::BudgetExhausted)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BreakerOpen => write!(f, "breaker_open"),
            Self::BudgetExhausted => write!(f, "budget_exhausted"),
            Self::StageFailed => write!(f, "stage_failed"),
        }
    }
}

/// Failure reported by an external provider for a single attempt.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProviderError {
    /// The request could not be delivered or the connection dropped.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The attempt did not finish within the per-attempt timeout.
    #[error("Attempt timed out after {after_ms}ms")]
    Timeout {
        /// Timeout that elapsed, in milliseconds.
        after_ms: u64,
    },
}

impl ProviderError {
    /// Creates a transport error.
    #[must_use]
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }

    /// Returns a stable type name for logs and audit records.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Transport(_) => "Transport",
            Self::Timeout { .. } => "Timeout",
        }
    }
}

/// Failure raised by a persistence sink. Logged and swallowed by the orchestrator.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Persistence failed for asset '{asset_id}': {reason}")]
pub struct PersistenceError {
    /// The asset whose result could not be stored.
    pub asset_id: String,
    /// The reason reported by the sink.
    pub reason: String,
}

impl PersistenceError {
    /// Creates a new persistence error.
    #[must_use]
    pub fn new(asset_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            asset_id: asset_id.into(),
            reason: reason.into(),
        }
    }
}

/// Errors raised while loading or validating a pipeline configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration could not be parsed.
    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    /// A field holds an unusable value.
    #[error("Invalid config field '{field}': {message}")]
    Invalid {
        /// The offending field.
        field: String,
        /// What is wrong with it.
        message: String,
    },
}

impl ConfigError {
    /// Creates an invalid-field error.
    #[must_use]
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Invalid {
            field: field.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kind_display() {
        assert_eq!(ErrorKind::BreakerOpen.to_string(), "breaker_open");
        assert_eq!(ErrorKind::BudgetExhausted.to_string(), "budget_exhausted");
        assert_eq!(ErrorKind::StageFailed.to_string(), "stage_failed");
    }

    #[test]
    fn test_error_kind_is_skip() {
        assert!(ErrorKind::BreakerOpen.is_skip());
        assert!(ErrorKind::BudgetExhausted.is_skip());
        assert!(!ErrorKind::StageFailed.is_skip());
    }

    #[test]
    fn test_error_kind_serialize() {
        let json = serde_json::to_string(&ErrorKind::BudgetExhausted).unwrap();
        assert_eq!(json, r#""budget_exhausted""#);
    }

    #[test]
    fn test_provider_error_type_name() {
        let err = ProviderError::Timeout { after_ms: 1500 };
        assert_eq!(err.type_name(), "Timeout");
        assert_eq!(err.to_string(), "Attempt timed out after 1500ms");
        assert_eq!(ProviderError::transport("reset").type_name(), "Transport");
    }

    #[test]
    fn test_persistence_error_message() {
        let err = PersistenceError::new("asset-1", "disk full");
        assert_eq!(
            err.to_string(),
            "Persistence failed for asset 'asset-1': disk full"
        );
    }

    #[test]
    fn test_config_error_invalid() {
        let err = ConfigError::invalid("retry.max_retries", "must be at most 10");
        assert!(err.to_string().contains("retry.max_retries"));
    }
}
