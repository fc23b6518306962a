//! Testing utilities for visionflow pipelines.
//!
//! This module provides:
//! - Scripted mock providers and persistence sinks
//! - Sample payloads and a mock port bundle

mod fixtures;
mod mocks;

pub use fixtures::{
    fast_config, sample_analysis, sample_metadata, sample_request, sample_synthesis, MockPorts,
};
pub use mocks::{
    Behavior, FailingSink, MockAnalyzer, MockExtractor, MockSynthesizer, RecordingSink, StoredRun,
};
