//! Fallback payloads for stages that did not complete.
//!
//! Every placeholder is well-typed and flagged `is_fallback`, so downstream
//! stages and the consolidated artifact never see an absent value.

use crate::core::{
    AnalysisPayload, Annotation, Finding, MetadataPayload, Priority, Severity, StageKind,
    StagePayload, Suggestion, Summary, SynthesisPayload,
};

/// Label used on fallback annotations and findings.
pub const INCOMPLETE_LABEL: &str = "analysis_incomplete";

/// Empty-but-well-typed metadata.
#[must_use]
pub fn fallback_metadata() -> MetadataPayload {
    MetadataPayload {
        is_fallback: true,
        ..MetadataPayload::default()
    }
}

/// Analysis with a single informational finding.
#[must_use]
pub fn fallback_analysis() -> AnalysisPayload {
    AnalysisPayload {
        description: String::new(),
        findings: vec![Finding::new(
            INCOMPLETE_LABEL,
            "The vision analysis stage could not complete; findings are unavailable.",
            Severity::Info,
        )],
        recommendations: Vec::new(),
        confidence: 0.0,
        is_fallback: true,
    }
}

/// Synthesis with a single informational annotation and nothing else.
#[must_use]
pub fn fallback_synthesis() -> SynthesisPayload {
    SynthesisPayload {
        annotations: vec![Annotation::info(
            INCOMPLETE_LABEL,
            "The synthesis stage could not complete; results are based on earlier stages only.",
        )],
        suggestions: Vec::new(),
        summary: Summary::default(),
        units_consumed: 0,
        is_fallback: true,
    }
}

/// Fallback payload for a stage kind.
#[must_use]
pub fn fallback_payload(kind: StageKind) -> StagePayload {
    match kind {
        StageKind::Metadata => fallback_metadata().into(),
        StageKind::Analysis => fallback_analysis().into(),
        StageKind::Synthesis => fallback_synthesis().into(),
    }
}

/// Filler annotation for an artifact that received none.
#[must_use]
pub fn filler_annotation() -> Annotation {
    Annotation::info(
        INCOMPLETE_LABEL,
        "No annotations could be produced because the analysis is incomplete.",
    )
}

/// Filler suggestion for an artifact that received none.
#[must_use]
pub fn filler_suggestion() -> Suggestion {
    Suggestion::new(
        "Retry the analysis",
        "The analysis is incomplete. Run it again later for detailed suggestions.",
        Priority::Low,
    )
}

/// Filler summary for an artifact that received none.
#[must_use]
pub fn filler_summary(asset_name: &str) -> Summary {
    Summary {
        headline: format!("Analysis of {asset_name} is incomplete"),
        assessment: "One or more analysis stages did not complete, so this result is limited."
            .to_string(),
        key_points: Vec::new(),
    }
}
