//! Quality scoring of stage outcomes.

use serde::{Deserialize, Serialize};

use crate::core::{QualityMetrics, StageKind, StageOutcome};

/// Data-richness contribution of each successful stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RichnessWeights {
    /// Contribution of a successful metadata stage.
    pub metadata: u8,
    /// Contribution of a successful analysis stage.
    pub analysis: u8,
    /// Contribution of a successful synthesis stage.
    pub synthesis: u8,
}

impl Default for RichnessWeights {
    fn default() -> Self {
        Self {
            metadata: 30,
            analysis: 40,
            synthesis: 30,
        }
    }
}

impl RichnessWeights {
    /// Weight for one stage kind.
    #[must_use]
    pub fn weight(&self, kind: StageKind) -> u8 {
        match kind {
            StageKind::Metadata => self.metadata,
            StageKind::Analysis => self.analysis,
            StageKind::Synthesis => self.synthesis,
        }
    }
}

/// Analysis-depth tiers keyed by the number of successful stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepthTiers {
    /// No stage succeeded.
    pub none: u8,
    /// Exactly one stage succeeded.
    pub single: u8,
    /// Two or more stages succeeded.
    pub multiple: u8,
}

impl Default for DepthTiers {
    fn default() -> Self {
        Self {
            none: 20,
            single: 50,
            multiple: 80,
        }
    }
}

impl DepthTiers {
    /// Tier value for a success count.
    #[must_use]
    pub fn tier(&self, succeeded_count: usize) -> u8 {
        match succeeded_count {
            0 => self.none,
            1 => self.single,
            _ => self.multiple,
        }
    }
}

/// Tunable constants of the quality formulas.
///
/// The defaults are heuristics; callers may retune them freely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct QualityWeights {
    /// Per-stage richness contributions.
    #[serde(default)]
    pub richness: RichnessWeights,
    /// Depth tiers.
    #[serde(default)]
    pub depth: DepthTiers,
}

/// Derives [`QualityMetrics`] from a list of outcomes.
#[derive(Debug, Clone, Copy, Default)]
pub struct QualityScorer {
    weights: QualityWeights,
}

#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
fn rounded_percent(numerator: f64, denominator: f64) -> u8 {
    if denominator <= 0.0 {
        return 0;
    }
    (numerator / denominator * 100.0).round().clamp(0.0, 100.0) as u8
}

impl QualityScorer {
    /// Creates a scorer with the given weights.
    #[must_use]
    pub fn new(weights: QualityWeights) -> Self {
        Self { weights }
    }

    /// Returns the weights in use.
    #[must_use]
    pub fn weights(&self) -> &QualityWeights {
        &self.weights
    }

    /// Scores `outcomes` against a pipeline of `total_stages` stages.
    ///
    /// Stages that have not run yet count as not succeeded, which makes the
    /// same function usable for intermediate progress scores.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn score(&self, outcomes: &[StageOutcome], total_stages: usize) -> QualityMetrics {
        let succeeded: Vec<&StageOutcome> = outcomes.iter().filter(|o| o.succeeded).collect();
        let succeeded_count = succeeded.len();

        let completeness = rounded_percent(succeeded_count as f64, total_stages as f64);

        let richness_sum: u32 = succeeded
            .iter()
            .map(|o| u32::from(self.weights.richness.weight(o.stage_kind)))
            .sum();
        let data_richness = u8::try_from(richness_sum.min(100)).unwrap_or(100);

        let analysis_depth = self.weights.depth.tier(succeeded_count).min(100);

        let sum = f64::from(completeness) + f64::from(data_richness) + f64::from(analysis_depth);
        let overall = rounded_percent(sum, 300.0);

        QualityMetrics {
            completeness,
            data_richness,
            analysis_depth,
            overall,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::StagePayload;
    use crate::errors::ErrorKind;
    use chrono::Utc;

    fn outcome(kind: StageKind, succeeded: bool) -> StageOutcome {
        if succeeded {
            StageOutcome::success(kind, kind.to_string(), "p", Utc::now(), StagePayload::None, 0, 0)
        } else {
            StageOutcome::failure(
                kind,
                kind.to_string(),
                "p",
                Utc::now(),
                ErrorKind::StageFailed,
                StagePayload::None,
                2,
            )
        }
    }

    fn outcomes(mask: [bool; 3]) -> Vec<StageOutcome> {
        StageKind::ALL
            .iter()
            .zip(mask)
            .map(|(kind, ok)| outcome(*kind, ok))
            .collect()
    }

    fn expected(weights: &QualityWeights, mask: [bool; 3]) -> QualityMetrics {
        let count = mask.iter().filter(|b| **b).count();
        let completeness = (count as f64 / 3.0 * 100.0).round() as u8;
        let richness: u32 = StageKind::ALL
            .iter()
            .zip(mask)
            .filter(|(_, ok)| *ok)
            .map(|(k, _)| u32::from(weights.richness.weight(*k)))
            .sum();
        let richness = richness.min(100) as u8;
        let depth = weights.depth.tier(count);
        let overall = ((f64::from(completeness) + f64::from(richness) + f64::from(depth)) / 3.0)
            .round() as u8;
        QualityMetrics {
            completeness,
            data_richness: richness,
            analysis_depth: depth,
            overall,
        }
    }

    const MASKS: [[bool; 3]; 8] = [
        [false, false, false],
        [true, false, false],
        [false, true, false],
        [false, false, true],
        [true, true, false],
        [true, false, true],
        [false, true, true],
        [true, true, true],
    ];

    #[test]
    fn test_formulas_hold_for_every_combination() {
        let scorer = QualityScorer::default();
        for mask in MASKS {
            let metrics = scorer.score(&outcomes(mask), 3);
            assert_eq!(metrics, expected(scorer.weights(), mask), "mask {mask:?}");
            assert!(metrics.is_bounded());
        }
    }

    #[test]
    fn test_formulas_hold_for_retuned_weights() {
        let weights = QualityWeights {
            richness: RichnessWeights {
                metadata: 10,
                analysis: 60,
                synthesis: 70,
            },
            depth: DepthTiers {
                none: 0,
                single: 40,
                multiple: 100,
            },
        };
        let scorer = QualityScorer::new(weights);

        for mask in MASKS {
            let metrics = scorer.score(&outcomes(mask), 3);
            assert_eq!(metrics, expected(&weights, mask), "mask {mask:?}");
            assert!(metrics.is_bounded());
        }
    }

    #[test]
    fn test_all_succeeded_is_complete() {
        let metrics = QualityScorer::default().score(&outcomes([true, true, true]), 3);
        assert_eq!(metrics.completeness, 100);
    }

    #[test]
    fn test_depth_tiers() {
        let tiers = DepthTiers::default();
        assert!(tiers.tier(0) < tiers.tier(1));
        assert!(tiers.tier(1) < tiers.tier(2));
        assert_eq!(tiers.tier(2), tiers.tier(5));
    }

    #[test]
    fn test_partial_progress_score() {
        let scorer = QualityScorer::default();
        let so_far = vec![outcome(StageKind::Metadata, true)];
        let metrics = scorer.score(&so_far, 3);

        assert_eq!(metrics, expected(scorer.weights(), [true, false, false]));
    }

    #[test]
    fn test_zero_total_stages() {
        let metrics = QualityScorer::default().score(&[], 0);
        assert_eq!(metrics.completeness, 0);
        assert!(metrics.is_bounded());
    }
}
