//! Bundle of the collaborators an orchestrator needs.

use std::sync::Arc;

use super::{MetadataExtractor, PersistenceSink, SynthesisProvider, VisionAnalyzer};

/// The providers backing the three stages, plus an optional persistence sink.
#[derive(Clone)]
pub struct AnalysisPorts {
    /// Stage 1 provider.
    pub extractor: Arc<dyn MetadataExtractor>,
    /// Stage 2 provider.
    pub analyzer: Arc<dyn VisionAnalyzer>,
    /// Stage 3 provider.
    pub synthesizer: Arc<dyn SynthesisProvider>,
    /// Where finished runs are stored, if anywhere.
    pub sink: Option<Arc<dyn PersistenceSink>>,
}

impl std::fmt::Debug for AnalysisPorts {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalysisPorts")
            .field("has_sink", &self.sink.is_some())
            .finish_non_exhaustive()
    }
}

impl AnalysisPorts {
    /// Creates ports without a persistence sink.
    #[must_use]
    pub fn new(
        extractor: Arc<dyn MetadataExtractor>,
        analyzer: Arc<dyn VisionAnalyzer>,
        synthesizer: Arc<dyn SynthesisProvider>,
    ) -> Self {
        Self {
            extractor,
            analyzer,
            synthesizer,
            sink: None,
        }
    }

    /// Sets the persistence sink.
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn PersistenceSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Returns true if a persistence sink is configured.
    #[must_use]
    pub fn has_sink(&self) -> bool {
        self.sink.is_some()
    }
}
