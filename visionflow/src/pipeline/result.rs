//! Run-scoped record and the public result of a pipeline invocation.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::{
    AnalysisArtifact, PipelineState, QualityMetrics, StageKind, StageOutcome, StageStatusLine,
};
use crate::resilience::BudgetStats;

/// Mutable record of one invocation.
///
/// Outcomes are only ever appended; the record is finalized once, at
/// consolidation.
#[derive(Debug, Clone)]
pub struct PipelineRun {
    run_id: Uuid,
    asset_ref: String,
    state: PipelineState,
    outcomes: Vec<StageOutcome>,
    quality: QualityMetrics,
    is_partial: bool,
    artifact: Option<AnalysisArtifact>,
}

impl PipelineRun {
    /// Creates a run in the `Init` state.
    #[must_use]
    pub fn new(run_id: Uuid, asset_ref: impl Into<String>) -> Self {
        Self {
            run_id,
            asset_ref: asset_ref.into(),
            state: PipelineState::Init,
            outcomes: Vec::new(),
            quality: QualityMetrics::default(),
            is_partial: true,
            artifact: None,
        }
    }

    /// Run identifier.
    #[must_use]
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Asset reference the run analyzes.
    #[must_use]
    pub fn asset_ref(&self) -> &str {
        &self.asset_ref
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Enters the state that runs `kind`.
    pub fn begin_stage(&mut self, kind: StageKind) -> PipelineState {
        self.state = kind.state();
        self.state
    }

    /// Jumps to `Consolidate`, skipping any stages not yet run.
    pub fn enter_consolidation(&mut self) {
        self.state = PipelineState::Consolidate;
    }

    /// Appends one stage outcome.
    pub fn record(&mut self, outcome: StageOutcome) {
        debug_assert!(self.state.is_stage(), "outcome recorded in state {}", self.state);
        self.outcomes.push(outcome);
    }

    /// Outcomes recorded so far, in stage order.
    #[must_use]
    pub fn outcomes(&self) -> &[StageOutcome] {
        &self.outcomes
    }

    /// Number of successful stages so far.
    #[must_use]
    pub fn succeeded_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.succeeded).count()
    }

    /// Consolidated artifact, once finalized.
    #[must_use]
    pub fn artifact(&self) -> Option<&AnalysisArtifact> {
        self.artifact.as_ref()
    }

    /// Records the consolidation result and resolves the terminal state.
    pub fn finalize(
        &mut self,
        artifact: AnalysisArtifact,
        quality: QualityMetrics,
        total_stages: usize,
    ) -> PipelineState {
        let succeeded = self.succeeded_count();
        self.quality = quality;
        self.is_partial = succeeded < total_stages;
        self.artifact = Some(artifact);
        self.state = PipelineState::terminal(succeeded, total_stages);
        self.state
    }

    /// Converts the finalized run into the public result.
    #[must_use]
    pub fn into_result(self, cancelled: bool, persisted: bool, budget: BudgetStats) -> PipelineResult {
        debug_assert!(self.state.is_terminal(), "run converted in state {}", self.state);
        let succeeded = self.succeeded_count() > 0;
        let status_lines: Vec<StageStatusLine> =
            self.outcomes.iter().map(StageOutcome::status_line).collect();

        let error_summary = if succeeded {
            None
        } else if cancelled && self.outcomes.is_empty() {
            Some("Run was cancelled before any stage completed".to_string())
        } else {
            let lines: Vec<String> = status_lines.iter().map(ToString::to_string).collect();
            Some(format!("All stages failed: {}", lines.join("; ")))
        };

        PipelineResult {
            run_id: self.run_id,
            succeeded,
            artifact: self.artifact,
            error_summary,
            outcomes: self.outcomes,
            quality_metrics: self.quality,
            is_partial: self.is_partial,
            state: self.state,
            cancelled,
            persisted,
            status_lines,
            budget,
        }
    }
}

/// Result of one pipeline invocation.
///
/// `succeeded` is true when at least one stage succeeded; `is_partial` is
/// true when at least one did not.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineResult {
    /// Run identifier (UUID v7).
    pub run_id: Uuid,
    /// At least one stage succeeded.
    pub succeeded: bool,
    /// The consolidated artifact.
    pub artifact: Option<AnalysisArtifact>,
    /// Why the run failed, when it did.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_summary: Option<String>,
    /// One outcome per attempted stage, in stage order.
    pub outcomes: Vec<StageOutcome>,
    /// Quality metrics of the run.
    pub quality_metrics: QualityMetrics,
    /// Fewer than all stages succeeded.
    pub is_partial: bool,
    /// Terminal state.
    pub state: PipelineState,
    /// The run was stopped by its cancellation token.
    pub cancelled: bool,
    /// The persistence sink accepted the result.
    pub persisted: bool,
    /// Per-stage audit lines.
    pub status_lines: Vec<StageStatusLine>,
    /// Budget statistics at the end of the run.
    pub budget: BudgetStats,
}

impl PipelineResult {
    /// Number of successful stages.
    #[must_use]
    pub fn succeeded_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.succeeded).count()
    }

    /// Total retries across all stages.
    #[must_use]
    pub fn total_retries(&self) -> u32 {
        self.outcomes.iter().map(|o| o.retries_used).sum()
    }

    /// Total units consumed across all stages.
    #[must_use]
    pub fn total_consumed_units(&self) -> u64 {
        self.outcomes.iter().map(|o| o.consumed_units).sum()
    }

    /// Serializes the result to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::StagePayload;
    use crate::errors::ErrorKind;
    use chrono::Utc;

    fn outcome(kind: StageKind, ok: bool) -> StageOutcome {
        if ok {
            StageOutcome::success(kind, kind.to_string(), "p", Utc::now(), StagePayload::None, 10, 1)
        } else {
            StageOutcome::failure(
                kind,
                kind.to_string(),
                "p",
                Utc::now(),
                ErrorKind::BreakerOpen,
                StagePayload::None,
                0,
            )
        }
    }

    fn finalized(mask: [bool; 3]) -> PipelineRun {
        let mut run = PipelineRun::new(Uuid::now_v7(), "s3://bucket/a.png");
        for (kind, ok) in StageKind::ALL.into_iter().zip(mask) {
            assert_eq!(run.begin_stage(kind), kind.state());
            run.record(outcome(kind, ok));
        }
        assert_eq!(run.state(), PipelineState::Stage3);
        run.enter_consolidation();
        assert_eq!(run.state(), PipelineState::Consolidate);
        let artifact = AnalysisArtifact::skeleton("a", "a.png");
        run.finalize(artifact, QualityMetrics::default(), 3);
        run
    }

    #[test]
    fn test_terminal_states() {
        assert_eq!(finalized([true, true, true]).state(), PipelineState::Completed);
        assert_eq!(finalized([true, false, true]).state(), PipelineState::PartiallyCompleted);
        assert_eq!(finalized([false, false, false]).state(), PipelineState::Failed);
    }

    #[test]
    fn test_into_result_success() {
        let result = finalized([true, false, true]).into_result(false, true, BudgetStats::default());

        assert!(result.succeeded);
        assert!(result.is_partial);
        assert!(result.error_summary.is_none());
        assert_eq!(result.succeeded_count(), 2);
        assert_eq!(result.total_retries(), 2);
        assert_eq!(result.total_consumed_units(), 20);
        assert_eq!(result.status_lines.len(), 3);
    }

    #[test]
    fn test_into_result_failure_has_summary() {
        let result = finalized([false, false, false]).into_result(false, false, BudgetStats::default());

        assert!(!result.succeeded);
        let summary = result.error_summary.unwrap();
        assert!(summary.contains("metadata [p]: breaker_open"));
    }

    #[test]
    fn test_result_serializes() {
        let result = finalized([true, true, true]).into_result(false, false, BudgetStats::default());
        let json = result.to_json().unwrap();
        assert!(json.contains("\"state\":\"completed\""));
    }
}
