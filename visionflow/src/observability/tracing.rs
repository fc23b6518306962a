//! Structured logging setup and span attributes for pipeline runs.
//!
//! The attribute types flatten outcomes and results into string maps so they
//! can be attached to spans or shipped to an external collector.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use tracing_subscriber::EnvFilter;

use crate::core::StageOutcome;
use crate::pipeline::PipelineResult;
use crate::utils::format_timestamp;

/// Output format of the log subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per event.
    Json,
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Json => write!(f, "json"),
        }
    }
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "pretty" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown log format '{other}'")),
        }
    }
}

/// Installs a global `tracing` subscriber filtered by `RUST_LOG` (default `info`).
///
/// Returns false if a subscriber was already installed; calling this more
/// than once is harmless.
pub fn init_tracing(format: LogFormat) -> bool {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    let installed = match format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    installed.is_ok()
}

/// Span attributes for one stage outcome.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StageSpanAttributes {
    /// Stage identifier.
    pub stage_id: String,
    /// Provider identifier.
    pub provider_id: String,
    /// Stage kind.
    pub stage_kind: Option<String>,
    /// "ok" or the error kind.
    pub status: Option<String>,
    /// Start time, RFC 3339.
    pub started_at: Option<String>,
    /// Duration in milliseconds.
    pub duration_ms: Option<i64>,
    /// Retries performed.
    pub retries: u32,
    /// Units charged.
    pub consumed_units: u64,
    /// Last provider error.
    pub error: Option<String>,
}

impl StageSpanAttributes {
    /// Creates attributes for a stage.
    #[must_use]
    pub fn new(stage_id: impl Into<String>, provider_id: impl Into<String>) -> Self {
        Self {
            stage_id: stage_id.into(),
            provider_id: provider_id.into(),
            ..Default::default()
        }
    }

    /// Builds attributes from a recorded outcome.
    #[must_use]
    pub fn from_outcome(outcome: &StageOutcome) -> Self {
        Self {
            stage_id: outcome.stage_id.clone(),
            provider_id: outcome.provider_id.clone(),
            stage_kind: Some(outcome.stage_kind.to_string()),
            status: Some(
                outcome
                    .error_kind
                    .map_or_else(|| "ok".to_string(), |kind| kind.to_string()),
            ),
            started_at: Some(format_timestamp(&outcome.started_at)),
            duration_ms: Some(outcome.duration_ms()),
            retries: outcome.retries_used,
            consumed_units: outcome.consumed_units,
            error: outcome.error_message.clone(),
        }
    }

    /// Sets the status.
    #[must_use]
    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    /// Sets the error.
    #[must_use]
    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    /// Flattens to a string map.
    #[must_use]
    pub fn to_attributes(&self) -> HashMap<String, String> {
        let mut attrs = HashMap::new();

        attrs.insert("stage.id".to_string(), self.stage_id.clone());
        attrs.insert("stage.provider".to_string(), self.provider_id.clone());
        attrs.insert("stage.retries".to_string(), self.retries.to_string());
        attrs.insert("stage.consumed_units".to_string(), self.consumed_units.to_string());

        if let Some(ref v) = self.stage_kind {
            attrs.insert("stage.kind".to_string(), v.clone());
        }
        if let Some(ref v) = self.status {
            attrs.insert("stage.status".to_string(), v.clone());
        }
        if let Some(ref v) = self.started_at {
            attrs.insert("stage.started_at".to_string(), v.clone());
        }
        if let Some(v) = self.duration_ms {
            attrs.insert("stage.duration_ms".to_string(), v.to_string());
        }
        if let Some(ref v) = self.error {
            attrs.insert("stage.error".to_string(), v.clone());
        }

        attrs
    }
}

/// Span attributes for a finished run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunSpanAttributes {
    /// Run identifier.
    pub run_id: String,
    /// Terminal state.
    pub state: Option<String>,
    /// Successful stages.
    pub succeeded_count: usize,
    /// Attempted stages.
    pub attempted: usize,
    /// Overall quality score.
    pub overall_quality: Option<u8>,
    /// Budget efficiency.
    pub efficiency_percent: Option<u8>,
    /// The run was cancelled.
    pub cancelled: bool,
    /// The result was persisted.
    pub persisted: bool,
}

impl RunSpanAttributes {
    /// Builds attributes from a run result.
    #[must_use]
    pub fn from_result(result: &PipelineResult) -> Self {
        Self {
            run_id: result.run_id.to_string(),
            state: Some(result.state.to_string()),
            succeeded_count: result.succeeded_count(),
            attempted: result.outcomes.len(),
            overall_quality: Some(result.quality_metrics.overall),
            efficiency_percent: Some(result.budget.efficiency_percent),
            cancelled: result.cancelled,
            persisted: result.persisted,
        }
    }

    /// Flattens to a string map.
    #[must_use]
    pub fn to_attributes(&self) -> HashMap<String, String> {
        let mut attrs = HashMap::new();

        attrs.insert("run.id".to_string(), self.run_id.clone());
        attrs.insert("run.succeeded_count".to_string(), self.succeeded_count.to_string());
        attrs.insert("run.attempted".to_string(), self.attempted.to_string());
        attrs.insert("run.cancelled".to_string(), self.cancelled.to_string());
        attrs.insert("run.persisted".to_string(), self.persisted.to_string());

        if let Some(ref v) = self.state {
            attrs.insert("run.state".to_string(), v.clone());
        }
        if let Some(v) = self.overall_quality {
            attrs.insert("run.quality.overall".to_string(), v.to_string());
        }
        if let Some(v) = self.efficiency_percent {
            attrs.insert("run.budget.efficiency".to_string(), v.to_string());
        }

        attrs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{StageKind, StagePayload};
    use crate::errors::ErrorKind;
    use chrono::Utc;

    #[test]
    fn test_log_format_parse() {
        assert_eq!("JSON".parse::<LogFormat>(), Ok(LogFormat::Json));
        assert_eq!("text".parse::<LogFormat>(), Ok(LogFormat::Text));
        assert!("xml".parse::<LogFormat>().is_err());
    }

    #[test]
    fn test_init_tracing_is_idempotent() {
        init_tracing(LogFormat::Text);
        assert!(!init_tracing(LogFormat::Json));
    }

    #[test]
    fn test_stage_attributes_from_failure() {
        let outcome = StageOutcome::failure(
            StageKind::Analysis,
            "vision_analysis",
            "vision-analyzer",
            Utc::now(),
            ErrorKind::StageFailed,
            StagePayload::None,
            2,
        )
        .with_error_message("Transport error: reset");

        let attrs = StageSpanAttributes::from_outcome(&outcome).to_attributes();
        assert_eq!(attrs.get("stage.id"), Some(&"vision_analysis".to_string()));
        assert_eq!(attrs.get("stage.status"), Some(&"stage_failed".to_string()));
        assert_eq!(attrs.get("stage.retries"), Some(&"2".to_string()));
        assert_eq!(attrs.get("stage.kind"), Some(&"analysis".to_string()));
        assert_eq!(attrs.get("stage.error"), Some(&"Transport error: reset".to_string()));
    }

    #[test]
    fn test_stage_attributes_builder() {
        let attrs = StageSpanAttributes::new("s", "p")
            .with_status("ok")
            .to_attributes();
        assert_eq!(attrs.get("stage.status"), Some(&"ok".to_string()));
        assert!(!attrs.contains_key("stage.error"));
    }
}
