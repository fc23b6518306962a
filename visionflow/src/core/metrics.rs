//! Quality metrics derived from stage outcomes.

use serde::{Deserialize, Serialize};

/// Health/quality scores of a run, each in 0..=100.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct QualityMetrics {
    /// Share of stages that succeeded.
    pub completeness: u8,
    /// Stage-weighted informational contribution of the successful stages.
    pub data_richness: u8,
    /// Tier derived from the number of successful stages.
    pub analysis_depth: u8,
    /// Rounded mean of the three scores above.
    pub overall: u8,
}

impl QualityMetrics {
    /// Returns true if every score lies in 0..=100.
    #[must_use]
    pub fn is_bounded(&self) -> bool {
        [
            self.completeness,
            self.data_richness,
            self.analysis_depth,
            self.overall,
        ]
        .iter()
        .all(|v| *v <= 100)
    }
}
