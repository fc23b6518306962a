//! Scripted mock collaborators.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::time::Duration;

use crate::core::{
    AnalysisArtifact, AnalysisPayload, MetadataPayload, StageOutcome, SynthesisPayload,
    UserContext,
};
use crate::errors::{PersistenceError, ProviderError};
use crate::providers::{MetadataExtractor, PersistenceSink, SynthesisProvider, VisionAnalyzer};

/// How a mock provider answers successive calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Behavior {
    /// Every call succeeds.
    #[default]
    Succeed,
    /// The first `n` calls fail, later calls succeed.
    FailFirst(u32),
    /// Every call fails.
    AlwaysFail,
}

#[derive(Debug, Default)]
struct Script {
    behavior: Mutex<Behavior>,
    calls: Mutex<u32>,
    delay: Mutex<Option<Duration>>,
}

impl Script {
    fn with_behavior(behavior: Behavior) -> Self {
        Self {
            behavior: Mutex::new(behavior),
            ..Self::default()
        }
    }

    async fn attempt(&self, provider: &str) -> Result<(), ProviderError> {
        let call = {
            let mut calls = self.calls.lock();
            *calls += 1;
            *calls
        };

        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let fail = match *self.behavior.lock() {
            Behavior::Succeed => false,
            Behavior::FailFirst(n) => call <= n,
            Behavior::AlwaysFail => true,
        };

        if fail {
            Err(ProviderError::transport(format!("{provider} call {call} failed")))
        } else {
            Ok(())
        }
    }

    fn calls(&self) -> u32 {
        *self.calls.lock()
    }
}

/// Mock [`MetadataExtractor`] returning a fixed payload.
#[derive(Debug)]
pub struct MockExtractor {
    payload: MetadataPayload,
    script: Script,
}

impl MockExtractor {
    /// Creates an extractor that always succeeds with `payload`.
    #[must_use]
    pub fn new(payload: MetadataPayload) -> Self {
        Self {
            payload,
            script: Script::default(),
        }
    }

    /// Creates an extractor that always fails.
    #[must_use]
    pub fn failing() -> Self {
        Self {
            payload: MetadataPayload::default(),
            script: Script::with_behavior(Behavior::AlwaysFail),
        }
    }

    /// Sets the call behavior.
    #[must_use]
    pub fn with_behavior(self, behavior: Behavior) -> Self {
        *self.script.behavior.lock() = behavior;
        self
    }

    /// Delays every call by `delay`.
    #[must_use]
    pub fn with_delay(self, delay: Duration) -> Self {
        *self.script.delay.lock() = Some(delay);
        self
    }

    /// Changes the behavior of later calls.
    pub fn set_behavior(&self, behavior: Behavior) {
        *self.script.behavior.lock() = behavior;
    }

    /// Number of calls received.
    #[must_use]
    pub fn call_count(&self) -> u32 {
        self.script.calls()
    }
}

#[async_trait]
impl MetadataExtractor for MockExtractor {
    async fn extract(&self, _asset_ref: &str) -> Result<MetadataPayload, ProviderError> {
        self.script.attempt("extractor").await?;
        Ok(self.payload.clone())
    }
}

/// Mock [`VisionAnalyzer`] that records the metadata it was given.
#[derive(Debug)]
pub struct MockAnalyzer {
    payload: AnalysisPayload,
    script: Script,
    seen_metadata: Mutex<Vec<MetadataPayload>>,
    seen_contexts: Mutex<Vec<Option<UserContext>>>,
}

impl MockAnalyzer {
    /// Creates an analyzer that always succeeds with `payload`.
    #[must_use]
    pub fn new(payload: AnalysisPayload) -> Self {
        Self {
            payload,
            script: Script::default(),
            seen_metadata: Mutex::new(Vec::new()),
            seen_contexts: Mutex::new(Vec::new()),
        }
    }

    /// Creates an analyzer that always fails.
    #[must_use]
    pub fn failing() -> Self {
        Self::new(AnalysisPayload::default()).with_behavior(Behavior::AlwaysFail)
    }

    /// Sets the call behavior.
    #[must_use]
    pub fn with_behavior(self, behavior: Behavior) -> Self {
        *self.script.behavior.lock() = behavior;
        self
    }

    /// Delays every call by `delay`.
    #[must_use]
    pub fn with_delay(self, delay: Duration) -> Self {
        *self.script.delay.lock() = Some(delay);
        self
    }

    /// Changes the behavior of later calls.
    pub fn set_behavior(&self, behavior: Behavior) {
        *self.script.behavior.lock() = behavior;
    }

    /// Number of calls received.
    #[must_use]
    pub fn call_count(&self) -> u32 {
        self.script.calls()
    }

    /// Metadata received by each call.
    #[must_use]
    pub fn seen_metadata(&self) -> Vec<MetadataPayload> {
        self.seen_metadata.lock().clone()
    }

    /// User context received by each call.
    #[must_use]
    pub fn seen_contexts(&self) -> Vec<Option<UserContext>> {
        self.seen_contexts.lock().clone()
    }
}

#[async_trait]
impl VisionAnalyzer for MockAnalyzer {
    async fn analyze(
        &self,
        _asset_ref: &str,
        metadata: &MetadataPayload,
        user_context: Option<&UserContext>,
    ) -> Result<AnalysisPayload, ProviderError> {
        self.seen_metadata.lock().push(metadata.clone());
        self.seen_contexts.lock().push(user_context.cloned());
        self.script.attempt("analyzer").await?;
        Ok(self.payload.clone())
    }
}

/// Mock [`SynthesisProvider`] that records the analysis it was given.
#[derive(Debug)]
pub struct MockSynthesizer {
    payload: SynthesisPayload,
    script: Script,
    seen_analysis: Mutex<Vec<AnalysisPayload>>,
}

impl MockSynthesizer {
    /// Creates a synthesizer that always succeeds with `payload`.
    #[must_use]
    pub fn new(payload: SynthesisPayload) -> Self {
        Self {
            payload,
            script: Script::default(),
            seen_analysis: Mutex::new(Vec::new()),
        }
    }

    /// Creates a synthesizer that always fails.
    #[must_use]
    pub fn failing() -> Self {
        Self::new(SynthesisPayload::default()).with_behavior(Behavior::AlwaysFail)
    }

    /// Sets the call behavior.
    #[must_use]
    pub fn with_behavior(self, behavior: Behavior) -> Self {
        *self.script.behavior.lock() = behavior;
        self
    }

    /// Changes the behavior of later calls.
    pub fn set_behavior(&self, behavior: Behavior) {
        *self.script.behavior.lock() = behavior;
    }

    /// Number of calls received.
    #[must_use]
    pub fn call_count(&self) -> u32 {
        self.script.calls()
    }

    /// Analysis received by each call.
    #[must_use]
    pub fn seen_analysis(&self) -> Vec<AnalysisPayload> {
        self.seen_analysis.lock().clone()
    }
}

#[async_trait]
impl SynthesisProvider for MockSynthesizer {
    async fn synthesize(
        &self,
        _asset_ref: &str,
        _metadata: &MetadataPayload,
        analysis: &AnalysisPayload,
        _user_context: Option<&UserContext>,
    ) -> Result<SynthesisPayload, ProviderError> {
        self.seen_analysis.lock().push(analysis.clone());
        self.script.attempt("synthesizer").await?;
        Ok(self.payload.clone())
    }
}

/// A run handed to a [`RecordingSink`].
#[derive(Debug, Clone)]
pub struct StoredRun {
    /// Asset identifier.
    pub asset_id: String,
    /// Stored artifact.
    pub artifact: AnalysisArtifact,
    /// Stored outcomes.
    pub outcomes: Vec<StageOutcome>,
    /// Stored user context.
    pub user_context: Option<UserContext>,
}

/// Sink that keeps every stored run in memory.
#[derive(Debug, Default)]
pub struct RecordingSink {
    runs: Mutex<Vec<StoredRun>>,
}

impl RecordingSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs stored so far.
    #[must_use]
    pub fn stored(&self) -> Vec<StoredRun> {
        self.runs.lock().clone()
    }
}

#[async_trait]
impl PersistenceSink for RecordingSink {
    async fn store(
        &self,
        asset_id: &str,
        artifact: &AnalysisArtifact,
        outcomes: &[StageOutcome],
        user_context: Option<&UserContext>,
    ) -> Result<(), PersistenceError> {
        self.runs.lock().push(StoredRun {
            asset_id: asset_id.to_string(),
            artifact: artifact.clone(),
            outcomes: outcomes.to_vec(),
            user_context: user_context.cloned(),
        });
        Ok(())
    }
}

/// Sink that rejects every store.
#[derive(Debug, Default)]
pub struct FailingSink {
    attempts: Mutex<u32>,
}

impl FailingSink {
    /// Creates a failing sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of store attempts.
    #[must_use]
    pub fn attempts(&self) -> u32 {
        *self.attempts.lock()
    }
}

#[async_trait]
impl PersistenceSink for FailingSink {
    async fn store(
        &self,
        asset_id: &str,
        _artifact: &AnalysisArtifact,
        _outcomes: &[StageOutcome],
        _user_context: Option<&UserContext>,
    ) -> Result<(), PersistenceError> {
        *self.attempts.lock() += 1;
        Err(PersistenceError::new(asset_id, "storage unavailable"))
    }
}
