//! Pipeline configuration.
//!
//! Every field has a default, so a configuration file only needs to name what
//! it changes.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

use crate::core::StageKind;
use crate::errors::ConfigError;
use crate::quality::QualityWeights;
use crate::resilience::{BreakerConfig, BudgetConfig, RetryConfig};

/// Identity and budget requirements of one stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageConfig {
    /// Stage kind.
    pub kind: StageKind,
    /// Identifier used for breaker bookkeeping.
    pub stage_id: String,
    /// Identifier used for budget bookkeeping.
    pub provider_id: String,
    /// Remaining budget required before the stage may run.
    #[serde(default)]
    pub min_units: u64,
    /// Units charged on success when the provider does not report its own consumption.
    #[serde(default)]
    pub estimated_units: u64,
}

impl StageConfig {
    /// Creates a stage config.
    #[must_use]
    pub fn new(
        kind: StageKind,
        stage_id: impl Into<String>,
        provider_id: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            stage_id: stage_id.into(),
            provider_id: provider_id.into(),
            min_units: 0,
            estimated_units: 0,
        }
    }

    /// Sets the minimum remaining budget.
    #[must_use]
    pub fn with_min_units(mut self, units: u64) -> Self {
        self.min_units = units;
        self
    }

    /// Sets the estimated consumption.
    #[must_use]
    pub fn with_estimated_units(mut self, units: u64) -> Self {
        self.estimated_units = units;
        self
    }
}

/// The three stages, in execution order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageTable {
    /// Stage 1.
    #[serde(default = "default_metadata_stage")]
    pub metadata: StageConfig,
    /// Stage 2.
    #[serde(default = "default_analysis_stage")]
    pub analysis: StageConfig,
    /// Stage 3.
    #[serde(default = "default_synthesis_stage")]
    pub synthesis: StageConfig,
}

fn default_metadata_stage() -> StageConfig {
    StageConfig::new(StageKind::Metadata, "metadata_extraction", "metadata-extractor")
        .with_min_units(1)
        .with_estimated_units(1)
}

fn default_analysis_stage() -> StageConfig {
    StageConfig::new(StageKind::Analysis, "vision_analysis", "vision-analyzer")
        .with_min_units(500)
        .with_estimated_units(1500)
}

fn default_synthesis_stage() -> StageConfig {
    StageConfig::new(StageKind::Synthesis, "result_synthesis", "synthesis-provider")
        .with_min_units(500)
        .with_estimated_units(2000)
}

impl Default for StageTable {
    fn default() -> Self {
        Self {
            metadata: default_metadata_stage(),
            analysis: default_analysis_stage(),
            synthesis: default_synthesis_stage(),
        }
    }
}

impl StageTable {
    /// Returns the config for a stage kind.
    #[must_use]
    pub fn get(&self, kind: StageKind) -> &StageConfig {
        match kind {
            StageKind::Metadata => &self.metadata,
            StageKind::Analysis => &self.analysis,
            StageKind::Synthesis => &self.synthesis,
        }
    }

    /// Iterates the stages in execution order.
    pub fn iter(&self) -> impl Iterator<Item = &StageConfig> {
        [&self.metadata, &self.analysis, &self.synthesis].into_iter()
    }

    /// Number of stages.
    #[must_use]
    pub fn len(&self) -> usize {
        StageKind::ALL.len()
    }

    /// Always false; the table has a fixed size.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        false
    }
}

/// Lifetime of the budget ledger owned by an orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetScope {
    /// The ledger is reset at the start of every run.
    #[default]
    PerRun,
    /// The ledger carries over between runs until `reset()` is called.
    Shared,
}

/// Complete orchestrator configuration.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Retry and backoff behavior.
    #[serde(default)]
    pub retry: RetryConfig,
    /// Circuit breaker thresholds, used when the orchestrator creates its own registry.
    #[serde(default)]
    pub breaker: BreakerConfig,
    /// Budget allocations.
    #[serde(default)]
    pub budget: BudgetConfig,
    /// Budget ledger lifetime.
    #[serde(default)]
    pub budget_scope: BudgetScope,
    /// Quality formula constants.
    #[serde(default)]
    pub quality: QualityWeights,
    /// Stage identities.
    #[serde(default)]
    pub stages: StageTable,
}

impl PipelineConfig {
    /// Creates a default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the retry config.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Sets the budget config.
    #[must_use]
    pub fn with_budget(mut self, budget: BudgetConfig) -> Self {
        self.budget = budget;
        self
    }

    /// Sets the budget scope.
    #[must_use]
    pub fn with_budget_scope(mut self, scope: BudgetScope) -> Self {
        self.budget_scope = scope;
        self
    }

    /// Sets the quality weights.
    #[must_use]
    pub fn with_quality(mut self, quality: QualityWeights) -> Self {
        self.quality = quality;
        self
    }

    /// Parses and validates a JSON configuration.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a JSON configuration file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    /// Checks cross-field constraints.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.retry.max_retries > 10 {
            return Err(ConfigError::invalid("retry.max_retries", "must be at most 10"));
        }
        if self.retry.base_delay_ms > self.retry.max_delay_ms {
            return Err(ConfigError::invalid(
                "retry.base_delay_ms",
                "must not exceed retry.max_delay_ms",
            ));
        }
        if self.retry.attempt_timeout_ms == 0 {
            return Err(ConfigError::invalid("retry.attempt_timeout_ms", "must be positive"));
        }
        if self.breaker.failure_threshold == 0 {
            return Err(ConfigError::invalid("breaker.failure_threshold", "must be positive"));
        }

        let mut seen = HashSet::new();
        for (expected, stage) in StageKind::ALL.iter().zip(self.stages.iter()) {
            let field = format!("stages.{expected}");
            if stage.kind != *expected {
                return Err(ConfigError::invalid(
                    format!("{field}.kind"),
                    format!("expected '{expected}', found '{}'", stage.kind),
                ));
            }
            if stage.stage_id.trim().is_empty() {
                return Err(ConfigError::invalid(format!("{field}.stage_id"), "must not be empty"));
            }
            if !seen.insert(stage.stage_id.as_str()) {
                return Err(ConfigError::invalid(
                    format!("{field}.stage_id"),
                    format!("duplicate stage id '{}'", stage.stage_id),
                ));
            }
            if !self.budget.allocations.contains_key(&stage.provider_id) {
                return Err(ConfigError::invalid(
                    format!("{field}.provider_id"),
                    format!("no budget allocation for provider '{}'", stage.provider_id),
                ));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;
    use std::time::Duration;

    #[test]
    fn test_default_config_is_valid() {
        let config = PipelineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.stages.len(), 3);
        assert_eq!(config.budget_scope, BudgetScope::PerRun);
    }

    #[test]
    fn test_stage_table_order() {
        let table = StageTable::default();
        let kinds: Vec<_> = table.iter().map(|s| s.kind).collect();
        assert_eq!(kinds, StageKind::ALL.to_vec());
        assert_eq!(table.get(StageKind::Analysis).stage_id, "vision_analysis");
    }

    #[test]
    fn test_empty_json_uses_defaults() {
        let config = PipelineConfig::from_json_str("{}").unwrap();
        assert_eq!(config, PipelineConfig::default());
    }

    #[test]
    fn test_partial_json_overrides() {
        let config = PipelineConfig::from_json_str(
            r#"{
                "retry": {"max_retries": 1, "base_delay_ms": 10, "max_delay_ms": 20},
                "breaker": {"failure_threshold": 5},
                "budget_scope": "shared"
            }"#,
        )
        .unwrap();

        assert_eq!(config.retry.max_retries, 1);
        assert_eq!(config.retry.attempt_timeout_ms, 60_000);
        assert_eq!(config.breaker.failure_threshold, 5);
        assert_eq!(config.breaker.cooldown_secs, 300);
        assert_eq!(config.budget_scope, BudgetScope::Shared);
    }

    #[test]
    fn test_rejects_missing_allocation() {
        let mut config = PipelineConfig::default();
        config.stages.analysis.provider_id = "unknown".to_string();

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("stages.analysis.provider_id"));
    }

    #[test]
    fn test_rejects_duplicate_stage_ids() {
        let mut config = PipelineConfig::default();
        config.stages.synthesis.stage_id = config.stages.metadata.stage_id.clone();

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("duplicate stage id"));
    }

    #[test]
    fn test_rejects_misplaced_kind() {
        let mut config = PipelineConfig::default();
        config.stages.metadata.kind = StageKind::Synthesis;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_inverted_delays() {
        let config = PipelineConfig::default()
            .with_retry(RetryConfig::new().with_base_delay_ms(9000));
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { ref field, .. }) if field == "retry.base_delay_ms"
        ));
    }

    #[test]
    fn test_rejects_non_exponential_backoff() {
        let err = PipelineConfig::from_json_str(
            r#"{"retry": {"backoff_strategy": "constant", "jitter_strategy": "full"}}"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
        assert_eq!(
            PipelineConfig::default().retry.backoff_schedule(),
            vec![Duration::from_secs(1), Duration::from_secs(2)]
        );
    }

    #[test]
    fn test_parse_error() {
        let err = PipelineConfig::from_json_str("{not json").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_from_json_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"retry": {{"max_retries": 0}}}}"#).unwrap();

        let config = PipelineConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.retry.max_retries, 0);
    }

    #[test]
    fn test_missing_file() {
        let err = PipelineConfig::from_json_file("/nonexistent/visionflow.json").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
