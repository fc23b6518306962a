//! Merges stage outcomes into one analysis artifact.

use chrono::Utc;

use crate::core::{
    AnalysisArtifact, AnalysisPayload, Priority, QualityMetrics, StageOutcome, StagePayload,
    Suggestion, Summary, SynthesisPayload,
};
use crate::quality::fallback::{filler_annotation, filler_suggestion, filler_summary};

/// Builds the final [`AnalysisArtifact`] from whatever the stages produced.
///
/// Successful outputs are overlaid on an empty skeleton in stage order, so a
/// later stage replaces what an earlier one contributed. Sections that are
/// still empty afterwards get a single filler entry.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResultConsolidator;

impl ResultConsolidator {
    /// Creates a consolidator.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Consolidates `outcomes` for one asset.
    #[must_use]
    pub fn consolidate(
        &self,
        asset_id: &str,
        asset_name: &str,
        outcomes: &[StageOutcome],
        quality: QualityMetrics,
        total_stages: usize,
    ) -> AnalysisArtifact {
        let mut artifact = AnalysisArtifact::skeleton(asset_id, asset_name);

        for outcome in outcomes.iter().filter(|o| o.succeeded) {
            match &outcome.payload {
                StagePayload::Metadata(metadata) => artifact.metadata = metadata.clone(),
                StagePayload::Analysis(analysis) => overlay_analysis(&mut artifact, analysis),
                StagePayload::Synthesis(synthesis) => overlay_synthesis(&mut artifact, synthesis),
                StagePayload::None => {}
            }
        }

        if artifact.annotations.is_empty() {
            artifact.annotations.push(filler_annotation());
        }
        if artifact.suggestions.is_empty() {
            artifact.suggestions.push(filler_suggestion());
        }
        if artifact.summary.is_empty() {
            artifact.summary = filler_summary(asset_name);
        }

        let succeeded = outcomes.iter().filter(|o| o.succeeded).count();
        artifact.is_partial = succeeded < total_stages;
        artifact.quality = quality;
        artifact.stage_statuses = outcomes.iter().map(StageOutcome::status_line).collect();
        artifact.generated_at = Utc::now();
        artifact
    }
}

fn overlay_analysis(artifact: &mut AnalysisArtifact, analysis: &AnalysisPayload) {
    if !analysis.findings.is_empty() {
        artifact.annotations = analysis.findings.iter().map(|f| f.to_annotation()).collect();
    }
    if !analysis.recommendations.is_empty() {
        artifact.suggestions = analysis
            .recommendations
            .iter()
            .map(|r| Suggestion::new(r.clone(), r.clone(), Priority::Medium))
            .collect();
    }
    if !analysis.description.trim().is_empty() {
        artifact.summary = Summary {
            headline: analysis.description.clone(),
            assessment: analysis.description.clone(),
            key_points: analysis
                .findings
                .iter()
                .map(|f| f.description.clone())
                .collect(),
        };
    }
}

fn overlay_synthesis(artifact: &mut AnalysisArtifact, synthesis: &SynthesisPayload) {
    if !synthesis.annotations.is_empty() {
        artifact.annotations.clone_from(&synthesis.annotations);
    }
    if !synthesis.suggestions.is_empty() {
        artifact.suggestions.clone_from(&synthesis.suggestions);
    }
    if !synthesis.summary.is_empty() {
        artifact.summary = synthesis.summary.clone();
    }
}
