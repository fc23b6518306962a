//! Core domain model types for visionflow.
//!
//! This module contains the data the pipeline moves around:
//! - Stage kind and pipeline state enums
//! - Typed stage payloads
//! - Stage outcomes and audit status lines
//! - Quality metrics and the consolidated artifact

mod artifact;
mod metrics;
mod outcome;
mod payload;
mod request;
mod status;

pub use artifact::{AnalysisArtifact, Annotation, Priority, Region, Severity, Suggestion, Summary};
pub use metrics::QualityMetrics;
pub use outcome::{StageOutcome, StageStatusLine};
pub use payload::{AnalysisPayload, Finding, MetadataPayload, StagePayload, SynthesisPayload};
pub use request::{AnalysisRequest, UserContext};
pub use status::{PipelineState, StageKind};
