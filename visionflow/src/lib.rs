//! # Visionflow
//!
//! A resilient three-stage image analysis pipeline.
//!
//! Visionflow sequences metadata extraction, vision analysis and synthesis
//! against external providers and always returns a well-formed result:
//!
//! - **Stage execution**: per-attempt timeout, exponential backoff and retries
//! - **Circuit breaking**: per-stage failure counters shared across runs
//! - **Budget accounting**: provider-scoped consumption ceilings with a buffer
//! - **Graceful degradation**: typed fallback payloads for failed stages
//! - **Quality scoring**: completeness, richness and depth metrics per run
//! - **Consolidation**: one artifact with every section populated
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use visionflow::prelude::*;
//!
//! let ports = AnalysisPorts::new(extractor, analyzer, synthesizer).with_sink(sink);
//! let orchestrator = PipelineOrchestrator::try_new(PipelineConfig::default(), ports)?
//!     .with_breakers(BreakerRegistry::process_wide());
//!
//! let result = orchestrator
//!     .execute_pipeline(AnalysisRequest::new("s3://assets/a.jpg", "a.jpg", "asset-1"))
//!     .await;
//! assert!(result.artifact.is_some());
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod cancellation;
pub mod config;
pub mod core;
pub mod errors;
pub mod observability;
pub mod pipeline;
pub mod providers;
pub mod quality;
pub mod resilience;
pub mod testing;
pub mod utils;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::cancellation::CancellationToken;
    pub use crate::config::{BudgetScope, PipelineConfig, StageConfig, StageTable};
    pub use crate::core::{
        AnalysisArtifact, AnalysisPayload, AnalysisRequest, MetadataPayload, PipelineState,
        QualityMetrics, StageKind, StageOutcome, StagePayload, SynthesisPayload, UserContext,
    };
    pub use crate::errors::{ConfigError, ErrorKind, PersistenceError, ProviderError};
    pub use crate::observability::{init_tracing, LogFormat};
    pub use crate::pipeline::{PipelineOrchestrator, PipelineResult, ProgressUpdate};
    pub use crate::providers::{
        AnalysisPorts, MetadataExtractor, PersistenceSink, SynthesisProvider, VisionAnalyzer,
    };
    pub use crate::quality::{QualityScorer, QualityWeights};
    pub use crate::resilience::{
        BreakerConfig, BreakerRegistry, BudgetConfig, BudgetLedger, BudgetStats, RetryConfig,
    };
    pub use crate::utils::{generate_run_id, iso_timestamp, Timestamp};
}
