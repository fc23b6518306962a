//! Typed stage payloads.
//!
//! Each stage kind produces exactly one payload type. [`StagePayload`] is the
//! tagged union carried by stage outcomes, so consumers match on it
//! exhaustively instead of probing loosely shaped data.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::artifact::{Annotation, Region, Severity, Suggestion, Summary};
use super::status::StageKind;

/// Technical metadata extracted from the image.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MetadataPayload {
    /// Width in pixels.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    /// Height in pixels.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    /// Container format (e.g. "png").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    /// Size of the encoded asset in bytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_size_bytes: Option<u64>,
    /// Dominant colors as hex strings.
    #[serde(default)]
    pub dominant_colors: Vec<String>,
    /// Free-form properties (EXIF tags, color profile, ...).
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
    /// True if this payload was synthesized because the stage did not complete.
    #[serde(default)]
    pub is_fallback: bool,
}

impl MetadataPayload {
    /// Returns the aspect ratio if both dimensions are known and non-zero.
    #[must_use]
    pub fn aspect_ratio(&self) -> Option<f64> {
        match (self.width, self.height) {
            (Some(w), Some(h)) if h > 0 => Some(f64::from(w) / f64::from(h)),
            _ => None,
        }
    }

    /// Returns true if nothing was extracted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.width.is_none()
            && self.height.is_none()
            && self.format.is_none()
            && self.file_size_bytes.is_none()
            && self.dominant_colors.is_empty()
            && self.properties.is_empty()
    }
}

/// One observation produced by the vision analyzer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    /// Category (composition, lighting, accessibility, ...).
    pub category: String,
    /// What was observed.
    pub description: String,
    /// Severity.
    #[serde(default)]
    pub severity: Severity,
    /// Region the finding refers to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<Region>,
}

impl Finding {
    /// Creates a finding without a region.
    #[must_use]
    pub fn new(
        category: impl Into<String>,
        description: impl Into<String>,
        severity: Severity,
    ) -> Self {
        Self {
            category: category.into(),
            description: description.into(),
            severity,
            region: None,
        }
    }

    /// Converts the finding into an artifact annotation.
    #[must_use]
    pub fn to_annotation(&self) -> Annotation {
        Annotation {
            label: self.category.clone(),
            detail: self.description.clone(),
            severity: self.severity,
            region: self.region,
        }
    }
}

/// Raw findings from the vision/reasoning analyzer.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AnalysisPayload {
    /// Free-text description of the image.
    #[serde(default)]
    pub description: String,
    /// Findings.
    #[serde(default)]
    pub findings: Vec<Finding>,
    /// Recommendations in plain text.
    #[serde(default)]
    pub recommendations: Vec<String>,
    /// Analyzer confidence (0.0..=1.0).
    #[serde(default)]
    pub confidence: f64,
    /// True if this payload was synthesized because the stage did not complete.
    #[serde(default)]
    pub is_fallback: bool,
}

/// Final synthesized view produced by the synthesis provider.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SynthesisPayload {
    /// Annotations.
    #[serde(default)]
    pub annotations: Vec<Annotation>,
    /// Suggestions.
    #[serde(default)]
    pub suggestions: Vec<Suggestion>,
    /// Summary.
    #[serde(default)]
    pub summary: Summary,
    /// Units the provider reports having consumed for this call.
    #[serde(default)]
    pub units_consumed: u64,
    /// True if this payload was synthesized because the stage did not complete.
    #[serde(default)]
    pub is_fallback: bool,
}

/// Output of a stage, tagged by stage kind.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum StagePayload {
    /// Metadata extraction output.
    Metadata(MetadataPayload),
    /// Vision analysis output.
    Analysis(AnalysisPayload),
    /// Synthesis output.
    Synthesis(SynthesisPayload),
    /// No payload.
    #[default]
    None,
}

impl StagePayload {
    /// Returns the stage kind this payload belongs to, if any.
    #[must_use]
    pub fn kind(&self) -> Option<StageKind> {
        match self {
            Self::Metadata(_) => Some(StageKind::Metadata),
            Self::Analysis(_) => Some(StageKind::Analysis),
            Self::Synthesis(_) => Some(StageKind::Synthesis),
            Self::None => None,
        }
    }

    /// Returns true if the payload is a fallback placeholder.
    #[must_use]
    pub fn is_fallback(&self) -> bool {
        match self {
            Self::Metadata(p) => p.is_fallback,
            Self::Analysis(p) => p.is_fallback,
            Self::Synthesis(p) => p.is_fallback,
            Self::None => false,
        }
    }

    /// Returns the metadata payload, if this is one.
    #[must_use]
    pub fn as_metadata(&self) -> Option<&MetadataPayload> {
        match self {
            Self::Metadata(p) => Some(p),
            _ => None,
        }
    }

    /// Returns the analysis payload, if this is one.
    #[must_use]
    pub fn as_analysis(&self) -> Option<&AnalysisPayload> {
        match self {
            Self::Analysis(p) => Some(p),
            _ => None,
        }
    }

    /// Returns the synthesis payload, if this is one.
    #[must_use]
    pub fn as_synthesis(&self) -> Option<&SynthesisPayload> {
        match self {
            Self::Synthesis(p) => Some(p),
            _ => None,
        }
    }
}

impl From<MetadataPayload> for StagePayload {
    fn from(payload: MetadataPayload) -> Self {
        Self::Metadata(payload)
    }
}

impl From<AnalysisPayload> for StagePayload {
    fn from(payload: AnalysisPayload) -> Self {
        Self::Analysis(payload)
    }
}

impl From<SynthesisPayload> for StagePayload {
    fn from(payload: SynthesisPayload) -> Self {
        Self::Synthesis(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_kind() {
        assert_eq!(
            StagePayload::from(MetadataPayload::default()).kind(),
            Some(StageKind::Metadata)
        );
        assert_eq!(
            StagePayload::from(SynthesisPayload::default()).kind(),
            Some(StageKind::Synthesis)
        );
        assert_eq!(StagePayload::None.kind(), None);
    }

    #[test]
    fn test_payload_accessors() {
        let payload = StagePayload::from(AnalysisPayload {
            description: "A red barn".to_string(),
            ..Default::default()
        });

        assert!(payload.as_metadata().is_none());
        assert_eq!(payload.as_analysis().unwrap().description, "A red barn");
    }

    #[test]
    fn test_payload_tagged_serialization() {
        let payload = StagePayload::from(MetadataPayload {
            width: Some(640),
            height: Some(480),
            ..Default::default()
        });
        let json = serde_json::to_value(&payload).unwrap();

        assert_eq!(json["kind"], "metadata");
        assert_eq!(json["data"]["width"], 640);
    }

    #[test]
    fn test_metadata_aspect_ratio() {
        let meta = MetadataPayload {
            width: Some(1920),
            height: Some(1080),
            ..Default::default()
        };
        let ratio = meta.aspect_ratio().unwrap();
        assert!((ratio - 16.0 / 9.0).abs() < 1e-9);

        let zero = MetadataPayload {
            width: Some(10),
            height: Some(0),
            ..Default::default()
        };
        assert!(zero.aspect_ratio().is_none());
    }

    #[test]
    fn test_finding_to_annotation() {
        let finding = Finding::new("lighting", "Underexposed foreground", Severity::High);
        let annotation = finding.to_annotation();

        assert_eq!(annotation.label, "lighting");
        assert_eq!(annotation.severity, Severity::High);
    }
}
