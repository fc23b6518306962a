//! Sample payloads and a ready-made set of mock ports.

use std::collections::BTreeMap;
use std::sync::Arc;

use super::mocks::{MockAnalyzer, MockExtractor, MockSynthesizer, RecordingSink};
use crate::config::PipelineConfig;
use crate::core::{
    AnalysisPayload, AnalysisRequest, Annotation, Finding, MetadataPayload, Priority, Severity,
    Suggestion, Summary, SynthesisPayload,
};
use crate::providers::AnalysisPorts;
use crate::resilience::RetryConfig;

/// Metadata of a 1920x1080 JPEG.
#[must_use]
pub fn sample_metadata() -> MetadataPayload {
    MetadataPayload {
        width: Some(1920),
        height: Some(1080),
        format: Some("jpeg".to_string()),
        file_size_bytes: Some(524_288),
        dominant_colors: vec!["#1e3a5f".to_string(), "#f4a261".to_string()],
        properties: BTreeMap::from([("color_space".to_string(), "sRGB".to_string())]),
        is_fallback: false,
    }
}

/// Analysis with two findings and one recommendation.
#[must_use]
pub fn sample_analysis() -> AnalysisPayload {
    AnalysisPayload {
        description: "A harbor at dusk with boats in the foreground".to_string(),
        findings: vec![
            Finding::new("composition", "Horizon sits on the upper third", Severity::Info),
            Finding::new("lighting", "Foreground is underexposed", Severity::Medium),
        ],
        recommendations: vec!["Brighten the foreground".to_string()],
        confidence: 0.87,
        is_fallback: false,
    }
}

/// Synthesis reporting 1800 consumed units.
#[must_use]
pub fn sample_synthesis() -> SynthesisPayload {
    SynthesisPayload {
        annotations: vec![
            Annotation::info("composition", "Balanced rule-of-thirds layout"),
            Annotation::info("lighting", "Foreground needs about one stop more light")
                .with_severity(Severity::Medium),
        ],
        suggestions: vec![Suggestion::new(
            "Lift shadows",
            "Raise foreground exposure by roughly one stop",
            Priority::High,
        )],
        summary: Summary {
            headline: "Strong composition, dark foreground".to_string(),
            assessment: "The image is well composed; exposure in the foreground is the main issue."
                .to_string(),
            key_points: vec!["rule of thirds".to_string(), "underexposed foreground".to_string()],
        },
        units_consumed: 1800,
        is_fallback: false,
    }
}

/// A request for `harbor.jpg`.
#[must_use]
pub fn sample_request() -> AnalysisRequest {
    AnalysisRequest::new("s3://assets/harbor.jpg", "harbor.jpg", "asset-42")
}

/// Default configuration with millisecond backoff so real-clock tests stay fast.
#[must_use]
pub fn fast_config() -> PipelineConfig {
    PipelineConfig::default().with_retry(
        RetryConfig::new()
            .with_base_delay_ms(1)
            .with_max_delay_ms(5)
            .with_attempt_timeout_ms(1_000),
    )
}

/// Handles to the mocks behind an [`AnalysisPorts`].
#[derive(Debug, Clone)]
pub struct MockPorts {
    /// Stage 1 mock.
    pub extractor: Arc<MockExtractor>,
    /// Stage 2 mock.
    pub analyzer: Arc<MockAnalyzer>,
    /// Stage 3 mock.
    pub synthesizer: Arc<MockSynthesizer>,
    /// Recording sink.
    pub sink: Arc<RecordingSink>,
}

impl Default for MockPorts {
    fn default() -> Self {
        Self::new(
            MockExtractor::new(sample_metadata()),
            MockAnalyzer::new(sample_analysis()),
            MockSynthesizer::new(sample_synthesis()),
        )
    }
}

impl MockPorts {
    /// Wraps the given mocks with a recording sink.
    #[must_use]
    pub fn new(
        extractor: MockExtractor,
        analyzer: MockAnalyzer,
        synthesizer: MockSynthesizer,
    ) -> Self {
        Self {
            extractor: Arc::new(extractor),
            analyzer: Arc::new(analyzer),
            synthesizer: Arc::new(synthesizer),
            sink: Arc::new(RecordingSink::new()),
        }
    }

    /// Ports backed by these mocks, including the recording sink.
    #[must_use]
    pub fn ports(&self) -> AnalysisPorts {
        AnalysisPorts::new(
            self.extractor.clone(),
            self.analyzer.clone(),
            self.synthesizer.clone(),
        )
        .with_sink(self.sink.clone())
    }
}
