//! Pipeline execution.
//!
//! This module provides:
//! - The stage executor (breaker, budget, timeout, retries)
//! - The result consolidator
//! - The orchestrator state machine and its result types
//! - Progress notifications

mod consolidator;
mod executor;
mod orchestrator;
mod progress;
mod result;


pub use consolidator::ResultConsolidator;
pub use executor::{StageExecutor, StageYield};
pub use orchestrator::PipelineOrchestrator;
pub use progress::{ProgressCallback, ProgressUpdate, CONSOLIDATE_STAGE_ID};
pub use result::{PipelineResult, PipelineRun};
