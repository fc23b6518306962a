//! Collaborator interfaces consumed by the pipeline.
//!
//! Implementations live outside this crate (HTTP clients, storage adapters).
//! None of them retry internally: the stage executor owns retries.

mod ports;

pub use ports::AnalysisPorts;

use async_trait::async_trait;

use crate::core::{
    AnalysisArtifact, AnalysisPayload, MetadataPayload, StageOutcome, SynthesisPayload,
    UserContext,
};
use crate::errors::{PersistenceError, ProviderError};

/// Extracts technical metadata from an image.
#[async_trait]
pub trait MetadataExtractor: Send + Sync {
    /// Extracts metadata for the asset behind `asset_ref`.
    async fn extract(&self, asset_ref: &str) -> Result<MetadataPayload, ProviderError>;
}

/// Runs vision/reasoning analysis over an image.
#[async_trait]
pub trait VisionAnalyzer: Send + Sync {
    /// Analyzes the asset, given the (possibly fallback) metadata.
    async fn analyze(
        &self,
        asset_ref: &str,
        metadata: &MetadataPayload,
        user_context: Option<&UserContext>,
    ) -> Result<AnalysisPayload, ProviderError>;
}

/// Synthesizes the final annotations, suggestions and summary.
#[async_trait]
pub trait SynthesisProvider: Send + Sync {
    /// Synthesizes from the (possibly fallback) metadata and analysis.
    ///
    /// The returned payload reports the units the call consumed.
    async fn synthesize(
        &self,
        asset_ref: &str,
        metadata: &MetadataPayload,
        analysis: &AnalysisPayload,
        user_context: Option<&UserContext>,
    ) -> Result<SynthesisPayload, ProviderError>;
}

/// Best-effort storage for finished runs.
#[async_trait]
pub trait PersistenceSink: Send + Sync {
    /// Stores the artifact and the outcomes that produced it.
    async fn store(
        &self,
        asset_id: &str,
        artifact: &AnalysisArtifact,
        outcomes: &[StageOutcome],
        user_context: Option<&UserContext>,
    ) -> Result<(), PersistenceError>;
}
