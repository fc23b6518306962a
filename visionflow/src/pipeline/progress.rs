//! Progress notifications emitted while a run advances.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Stage id reported by the final notification of a run.
pub const CONSOLIDATE_STAGE_ID: &str = "consolidate";

/// Snapshot of a run's progress, delivered after each stage transition and
/// once more after consolidation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressUpdate {
    /// Stage that just finished, or [`CONSOLIDATE_STAGE_ID`].
    pub stage_id: String,
    /// Rough completion percentage, 0..=100.
    pub percent: u8,
    /// Human-readable status message.
    pub message: String,
    /// Successful stages so far.
    pub succeeded_count: usize,
    /// Total stages in the pipeline.
    pub total_stages: usize,
    /// Overall quality score of the outcomes recorded so far.
    pub quality_score_so_far: u8,
}

impl ProgressUpdate {
    /// Returns true if this is the last update of the run.
    #[must_use]
    pub fn is_final(&self) -> bool {
        self.stage_id == CONSOLIDATE_STAGE_ID
    }
}

/// Caller-supplied progress callback.
pub type ProgressCallback = Arc<dyn Fn(&ProgressUpdate) + Send + Sync>;

/// Percentage reported after `completed` of `total` stages.
///
/// Stages share the first 90 points; consolidation takes the run to 100.
#[must_use]
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
pub(crate) fn stage_percent(completed: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    ((completed as f64 / total as f64) * 90.0).round().clamp(0.0, 90.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_percent() {
        assert_eq!(stage_percent(0, 3), 0);
        assert_eq!(stage_percent(1, 3), 30);
        assert_eq!(stage_percent(2, 3), 60);
        assert_eq!(stage_percent(3, 3), 90);
        assert_eq!(stage_percent(1, 0), 0);
    }

    #[test]
    fn test_is_final() {
        let update = ProgressUpdate {
            stage_id: CONSOLIDATE_STAGE_ID.to_string(),
            percent: 100,
            message: "done".to_string(),
            succeeded_count: 3,
            total_stages: 3,
            quality_score_so_far: 93,
        };
        assert!(update.is_final());
    }
}
