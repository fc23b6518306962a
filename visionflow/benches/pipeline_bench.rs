//! Benchmarks for scoring and consolidation.

use chrono::Utc;
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use visionflow::core::{StageKind, StageOutcome};
use visionflow::errors::ErrorKind;
use visionflow::pipeline::ResultConsolidator;
use visionflow::quality::{fallback_payload, QualityScorer};
use visionflow::testing::{sample_analysis, sample_metadata, sample_synthesis};

fn outcomes(synthesis_ok: bool) -> Vec<StageOutcome> {
    let now = Utc::now();
    let synthesis = if synthesis_ok {
        StageOutcome::success(
            StageKind::Synthesis,
            "result_synthesis",
            "synthesis-provider",
            now,
            sample_synthesis().into(),
            1800,
            0,
        )
    } else {
        StageOutcome::failure(
            StageKind::Synthesis,
            "result_synthesis",
            "synthesis-provider",
            now,
            ErrorKind::StageFailed,
            fallback_payload(StageKind::Synthesis),
            2,
        )
    };

    vec![
        StageOutcome::success(
            StageKind::Metadata,
            "metadata_extraction",
            "metadata-extractor",
            now,
            sample_metadata().into(),
            1,
            0,
        ),
        StageOutcome::success(
            StageKind::Analysis,
            "vision_analysis",
            "vision-analyzer",
            now,
            sample_analysis().into(),
            1500,
            0,
        ),
        synthesis,
    ]
}

fn scoring_benchmark(c: &mut Criterion) {
    let scorer = QualityScorer::default();
    let complete = outcomes(true);

    c.bench_function("score_complete_run", |b| {
        b.iter(|| scorer.score(black_box(&complete), 3))
    });
}

fn consolidation_benchmark(c: &mut Criterion) {
    let scorer = QualityScorer::default();
    let consolidator = ResultConsolidator::new();

    for (name, synthesis_ok) in [("consolidate_complete", true), ("consolidate_partial", false)] {
        let run = outcomes(synthesis_ok);
        let quality = scorer.score(&run, 3);
        c.bench_function(name, |b| {
            b.iter(|| consolidator.consolidate("asset-1", "harbor.jpg", black_box(&run), quality, 3))
        });
    }
}

criterion_group!(benches, scoring_benchmark, consolidation_benchmark);
criterion_main!(benches);
