//! The consolidated analysis artifact and its user-facing sections.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::metrics::QualityMetrics;
use super::outcome::StageStatusLine;
use super::payload::MetadataPayload;

/// Severity attached to an annotation or finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Informational only.
    #[default]
    Info,
    /// Minor issue.
    Low,
    /// Noticeable issue.
    Medium,
    /// Significant issue.
    High,
}

/// Priority attached to a suggestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    /// Nice to have.
    #[default]
    Low,
    /// Worth doing.
    Medium,
    /// Should be addressed first.
    High,
}

/// A rectangular image region in normalized coordinates (0.0..=1.0).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Region {
    /// Left edge.
    pub x: f64,
    /// Top edge.
    pub y: f64,
    /// Width.
    pub width: f64,
    /// Height.
    pub height: f64,
}

/// A remark attached to the image, optionally to one region of it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    /// Short label.
    pub label: String,
    /// Longer explanation.
    pub detail: String,
    /// Severity.
    #[serde(default)]
    pub severity: Severity,
    /// Region the annotation refers to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<Region>,
}

impl Annotation {
    /// Creates an informational annotation without a region.
    #[must_use]
    pub fn info(label: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            detail: detail.into(),
            severity: Severity::Info,
            region: None,
        }
    }

    /// Sets the severity.
    #[must_use]
    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    /// Sets the region.
    #[must_use]
    pub fn with_region(mut self, region: Region) -> Self {
        self.region = Some(region);
        self
    }
}

/// An actionable recommendation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestion {
    /// Short title.
    pub title: String,
    /// What to do and why.
    pub detail: String,
    /// Priority.
    #[serde(default)]
    pub priority: Priority,
}

impl Suggestion {
    /// Creates a suggestion.
    #[must_use]
    pub fn new(title: impl Into<String>, detail: impl Into<String>, priority: Priority) -> Self {
        Self {
            title: title.into(),
            detail: detail.into(),
            priority,
        }
    }
}

/// Narrative summary of the analysis.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Summary {
    /// One-line headline.
    #[serde(default)]
    pub headline: String,
    /// Overall assessment paragraph.
    #[serde(default)]
    pub assessment: String,
    /// Bullet points.
    #[serde(default)]
    pub key_points: Vec<String>,
}

impl Summary {
    /// Returns true if no part of the summary carries content.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.headline.trim().is_empty()
            && self.assessment.trim().is_empty()
            && self.key_points.is_empty()
    }
}

/// The single artifact produced by a run, complete or not.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisArtifact {
    /// Caller-supplied asset identifier.
    pub asset_id: String,
    /// Human-readable asset name.
    pub asset_name: String,
    /// Technical metadata (fallback-shaped if extraction failed).
    pub metadata: MetadataPayload,
    /// Annotations. Never empty once consolidated.
    pub annotations: Vec<Annotation>,
    /// Suggestions. Never empty once consolidated.
    pub suggestions: Vec<Suggestion>,
    /// Summary. Never empty once consolidated.
    pub summary: Summary,
    /// Quality metrics of the run that produced the artifact.
    pub quality: QualityMetrics,
    /// True if fewer than all stages succeeded.
    pub is_partial: bool,
    /// One status line per attempted stage.
    pub stage_statuses: Vec<StageStatusLine>,
    /// When consolidation finished.
    pub generated_at: DateTime<Utc>,
}

impl AnalysisArtifact {
    /// Creates the skeleton artifact: every section present and empty.
    #[must_use]
    pub fn skeleton(asset_id: impl Into<String>, asset_name: impl Into<String>) -> Self {
        Self {
            asset_id: asset_id.into(),
            asset_name: asset_name.into(),
            metadata: MetadataPayload::default(),
            annotations: Vec::new(),
            suggestions: Vec::new(),
            summary: Summary::default(),
            quality: QualityMetrics::default(),
            is_partial: true,
            stage_statuses: Vec::new(),
            generated_at: Utc::now(),
        }
    }

    /// Returns true if every user-facing section has content.
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        !self.annotations.is_empty() && !self.suggestions.is_empty() && !self.summary.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skeleton_is_empty_but_present() {
        let artifact = AnalysisArtifact::skeleton("a-1", "photo.png");

        assert!(artifact.annotations.is_empty());
        assert!(artifact.suggestions.is_empty());
        assert!(artifact.summary.is_empty());
        assert!(!artifact.is_well_formed());
    }

    #[test]
    fn test_summary_whitespace_is_empty() {
        let summary = Summary {
            headline: "  ".to_string(),
            assessment: String::new(),
            key_points: vec![],
        };
        assert!(summary.is_empty());
    }

    #[test]
    fn test_annotation_builder() {
        let region = Region { x: 0.1, y: 0.2, width: 0.3, height: 0.4 };
        let annotation = Annotation::info("Glare", "Specular highlight top left")
            .with_severity(Severity::Medium)
            .with_region(region);

        assert_eq!(annotation.severity, Severity::Medium);
        assert_eq!(annotation.region, Some(region));
    }

    #[test]
    fn test_annotation_deserialize_defaults() {
        let annotation: Annotation =
            serde_json::from_str(r#"{"label":"Crop","detail":"Tight crop"}"#).unwrap();
        assert_eq!(annotation.severity, Severity::Info);
        assert!(annotation.region.is_none());
    }
}
