//! The pipeline orchestrator.
//!
//! Runs the three stages in order, feeding each stage the real or fallback
//! output of the previous ones, then scores, consolidates and persists the
//! run. A stage failure never stops the sequence; only cancellation does.

use futures::FutureExt;
use parking_lot::{Mutex, RwLock};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use super::consolidator::ResultConsolidator;
use super::executor::{StageExecutor, StageYield};
use super::progress::{stage_percent, ProgressCallback, ProgressUpdate, CONSOLIDATE_STAGE_ID};
use super::result::{PipelineResult, PipelineRun};
use crate::cancellation::CancellationToken;
use crate::config::{BudgetScope, PipelineConfig, StageConfig};
use crate::core::{
    AnalysisArtifact, AnalysisPayload, AnalysisRequest, MetadataPayload, StageKind, StageOutcome,
};
use crate::errors::ConfigError;
use crate::observability::{RunSpanAttributes, StageSpanAttributes};
use crate::providers::AnalysisPorts;
use crate::quality::fallback::{fallback_analysis, fallback_metadata};
use crate::quality::QualityScorer;
use crate::resilience::{BreakerRegistry, BudgetLedger, BudgetStats};
use crate::utils::generate_run_id;

/// Sequences the analysis stages and owns the resilience components.
///
/// One orchestrator may serve many concurrent runs. With
/// [`BudgetScope::PerRun`] each run gets a fresh ledger; with
/// [`BudgetScope::Shared`] all runs charge the same ledger until
/// [`reset`](Self::reset).
pub struct PipelineOrchestrator {
    config: PipelineConfig,
    ports: AnalysisPorts,
    breakers: Arc<BreakerRegistry>,
    budget: RwLock<Arc<BudgetLedger>>,
    scorer: QualityScorer,
    consolidator: ResultConsolidator,
    progress: Option<ProgressCallback>,
    failed_stage_ids: Mutex<HashSet<String>>,
}

impl std::fmt::Debug for PipelineOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineOrchestrator")
            .field("config", &self.config)
            .field("ports", &self.ports)
            .field("breakers", &self.breakers)
            .field("has_progress", &self.progress.is_some())
            .finish_non_exhaustive()
    }
}

impl PipelineOrchestrator {
    /// Creates an orchestrator with its own breaker registry and ledger.
    ///
    /// Use [`with_breakers`](Self::with_breakers) to share breaker state with
    /// other orchestrators, e.g. via [`BreakerRegistry::process_wide`].
    #[must_use]
    pub fn new(config: PipelineConfig, ports: AnalysisPorts) -> Self {
        let breakers = Arc::new(BreakerRegistry::new(config.breaker.clone()));
        let budget = Arc::new(BudgetLedger::new(&config.budget));
        let scorer = QualityScorer::new(config.quality);

        Self {
            config,
            ports,
            breakers,
            budget: RwLock::new(budget),
            scorer,
            consolidator: ResultConsolidator::new(),
            progress: None,
            failed_stage_ids: Mutex::new(HashSet::new()),
        }
    }

    /// Validates `config` and creates an orchestrator.
    pub fn try_new(config: PipelineConfig, ports: AnalysisPorts) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::new(config, ports))
    }

    /// Uses a shared breaker registry.
    #[must_use]
    pub fn with_breakers(mut self, breakers: Arc<BreakerRegistry>) -> Self {
        self.breakers = breakers;
        self
    }

    /// Uses a caller-owned ledger and switches to [`BudgetScope::Shared`].
    #[must_use]
    pub fn with_budget_ledger(mut self, ledger: Arc<BudgetLedger>) -> Self {
        self.budget = RwLock::new(ledger);
        self.config.budget_scope = BudgetScope::Shared;
        self
    }

    /// Registers a progress callback.
    #[must_use]
    pub fn on_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(&ProgressUpdate) + Send + Sync + 'static,
    {
        self.progress = Some(Arc::new(callback));
        self
    }

    /// The configuration in use.
    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// The breaker registry in use.
    #[must_use]
    pub fn breakers(&self) -> &Arc<BreakerRegistry> {
        &self.breakers
    }

    /// Statistics of the current ledger.
    ///
    /// Under [`BudgetScope::PerRun`] this is the ledger of the most recently
    /// started run.
    #[must_use]
    pub fn budget_stats(&self) -> BudgetStats {
        self.budget.read().stats()
    }

    /// Zeroes the ledger and prunes expired breaker entries this orchestrator
    /// recorded failures for.
    ///
    /// Entries still inside their cooldown are kept, as are entries created
    /// by other orchestrators sharing the registry.
    pub fn reset(&self) {
        self.budget.read().reset();

        let mut failed = self.failed_stage_ids.lock();
        let pruned = self
            .breakers
            .prune_expired(failed.iter().map(String::as_str));
        failed.retain(|id| self.breakers.snapshot(id).is_some());

        debug!(pruned, still_tracked = failed.len(), "Orchestrator reset");
    }

    /// Runs the full pipeline for one asset.
    pub async fn execute_pipeline(&self, request: AnalysisRequest) -> PipelineResult {
        self.execute_pipeline_with_cancellation(request, &CancellationToken::new())
            .await
    }

    /// Runs the pipeline, checking `token` before each stage.
    ///
    /// A cancelled run is consolidated from the stages attempted so far and
    /// is not persisted.
    pub async fn execute_pipeline_with_cancellation(
        &self,
        request: AnalysisRequest,
        token: &CancellationToken,
    ) -> PipelineResult {
        let run_id = generate_run_id();
        let span = info_span!("pipeline_run", run_id = %run_id, asset_id = %request.asset_id);
        self.run(run_id, request, token).instrument(span).await
    }

    async fn run(
        &self,
        run_id: Uuid,
        request: AnalysisRequest,
        token: &CancellationToken,
    ) -> PipelineResult {
        let ledger = self.ledger_for_run();
        let executor = StageExecutor::new(
            self.breakers.clone(),
            ledger.clone(),
            self.config.retry.clone(),
        );
        let total = self.config.stages.len();
        let mut run = PipelineRun::new(run_id, &request.asset_ref);
        let mut cancelled = false;

        info!(asset_ref = %request.asset_ref, "Starting pipeline run");

        for kind in StageKind::ALL {
            if token.is_cancelled() {
                cancelled = true;
                info!(
                    reason = %token.reason().unwrap_or_default(),
                    completed_stages = run.outcomes().len(),
                    "Run cancelled, consolidating attempted stages"
                );
                break;
            }

            run.begin_stage(kind);
            let stage = self.config.stages.get(kind);
            let outcome = match kind {
                StageKind::Metadata => self.run_metadata(&executor, stage, &request).await,
                StageKind::Analysis => {
                    let metadata = metadata_of(run.outcomes());
                    self.run_analysis(&executor, stage, &request, &metadata).await
                }
                StageKind::Synthesis => {
                    let metadata = metadata_of(run.outcomes());
                    let analysis = analysis_of(run.outcomes());
                    self.run_synthesis(&executor, stage, &request, &metadata, &analysis)
                        .await
                }
            };

            debug!(
                attributes = ?StageSpanAttributes::from_outcome(&outcome).to_attributes(),
                "Stage recorded"
            );
            if outcome.error_kind.is_some_and(|kind| !kind.is_skip()) {
                self.failed_stage_ids.lock().insert(outcome.stage_id.clone());
            }
            run.record(outcome);
            self.notify_stage(&run, total);
        }

        run.enter_consolidation();
        let quality = self.scorer.score(run.outcomes(), total);
        let artifact = self.consolidator.consolidate(
            &request.asset_id,
            &request.asset_name,
            run.outcomes(),
            quality,
            total,
        );
        let state = run.finalize(artifact, quality, total);

        let persisted = if cancelled {
            false
        } else if let Some(artifact) = run.artifact() {
            self.persist(&request, artifact, run.outcomes()).await
        } else {
            false
        };

        self.notify(ProgressUpdate {
            stage_id: CONSOLIDATE_STAGE_ID.to_string(),
            percent: 100,
            message: format!("Run finished: {state}"),
            succeeded_count: run.succeeded_count(),
            total_stages: total,
            quality_score_so_far: quality.overall,
        });

        let result = run.into_result(cancelled, persisted, ledger.stats());
        info!(
            state = %state,
            succeeded = result.succeeded_count(),
            total,
            overall_quality = quality.overall,
            cancelled,
            persisted,
            "Pipeline run finished"
        );
        debug!(
            attributes = ?RunSpanAttributes::from_result(&result).to_attributes(),
            "Run recorded"
        );
        result
    }

    fn ledger_for_run(&self) -> Arc<BudgetLedger> {
        match self.config.budget_scope {
            BudgetScope::Shared => self.budget.read().clone(),
            BudgetScope::PerRun => {
                let fresh = Arc::new(BudgetLedger::new(&self.config.budget));
                *self.budget.write() = fresh.clone();
                fresh
            }
        }
    }

    async fn run_metadata(
        &self,
        executor: &StageExecutor,
        stage: &StageConfig,
        request: &AnalysisRequest,
    ) -> StageOutcome {
        let extractor = &self.ports.extractor;
        let asset_ref = request.asset_ref.as_str();
        let units = stage.estimated_units;

        executor
            .execute(stage, || {
                extractor
                    .extract(asset_ref)
                    .map(move |r| r.map(|metadata| StageYield::new(metadata, units)))
            })
            .await
    }

    async fn run_analysis(
        &self,
        executor: &StageExecutor,
        stage: &StageConfig,
        request: &AnalysisRequest,
        metadata: &MetadataPayload,
    ) -> StageOutcome {
        let analyzer = &self.ports.analyzer;
        let asset_ref = request.asset_ref.as_str();
        let user_context = request.user_context.as_ref();
        let units = stage.estimated_units;

        executor
            .execute(stage, || {
                analyzer
                    .analyze(asset_ref, metadata, user_context)
                    .map(move |r| r.map(|analysis| StageYield::new(analysis, units)))
            })
            .await
    }

    async fn run_synthesis(
        &self,
        executor: &StageExecutor,
        stage: &StageConfig,
        request: &AnalysisRequest,
        metadata: &MetadataPayload,
        analysis: &AnalysisPayload,
    ) -> StageOutcome {
        let synthesizer = &self.ports.synthesizer;
        let asset_ref = request.asset_ref.as_str();
        let user_context = request.user_context.as_ref();
        let estimated = stage.estimated_units;

        executor
            .execute(stage, || {
                synthesizer
                    .synthesize(asset_ref, metadata, analysis, user_context)
                    .map(move |r| {
                        r.map(|synthesis| {
                            let units = if synthesis.units_consumed > 0 {
                                synthesis.units_consumed
                            } else {
                                estimated
                            };
                            StageYield::new(synthesis, units)
                        })
                    })
            })
            .await
    }

    async fn persist(
        &self,
        request: &AnalysisRequest,
        artifact: &AnalysisArtifact,
        outcomes: &[StageOutcome],
    ) -> bool {
        let Some(sink) = &self.ports.sink else {
            return false;
        };

        match sink
            .store(
                &request.asset_id,
                artifact,
                outcomes,
                request.user_context.as_ref(),
            )
            .await
        {
            Ok(()) => {
                debug!(asset_id = %request.asset_id, "Run persisted");
                true
            }
            Err(error) => {
                warn!(
                    asset_id = %request.asset_id,
                    error = %error,
                    "Failed to persist run, result is still returned"
                );
                false
            }
        }
    }

    fn notify_stage(&self, run: &PipelineRun, total: usize) {
        let Some(last) = run.outcomes().last() else {
            return;
        };
        let message = match last.error_kind {
            None => format!("{} completed", last.stage_id),
            Some(kind) if kind.is_skip() => format!("{} skipped: {kind}", last.stage_id),
            Some(kind) => format!("{} did not complete: {kind}", last.stage_id),
        };

        self.notify(ProgressUpdate {
            stage_id: last.stage_id.clone(),
            percent: stage_percent(last.stage_kind.index() + 1, total),
            message,
            succeeded_count: run.succeeded_count(),
            total_stages: total,
            quality_score_so_far: self.scorer.score(run.outcomes(), total).overall,
        });
    }

    fn notify(&self, update: ProgressUpdate) {
        if let Some(callback) = &self.progress {
            callback(&update);
        }
    }
}

/// Metadata produced by stage 1, real or fallback.
fn metadata_of(outcomes: &[StageOutcome]) -> MetadataPayload {
    outcomes
        .iter()
        .find_map(|o| o.payload.as_metadata().cloned())
        .unwrap_or_else(fallback_metadata)
}

/// Analysis produced by stage 2, real or fallback.
fn analysis_of(outcomes: &[StageOutcome]) -> AnalysisPayload {
    outcomes
        .iter()
        .find_map(|o| o.payload.as_analysis().cloned())
        .unwrap_or_else(fallback_analysis)
}
