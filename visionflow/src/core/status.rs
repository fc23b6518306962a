//! Stage kind and pipeline state enums.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The kind of analysis a stage performs.
///
/// Stages always run in declaration order: metadata, then analysis, then synthesis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    /// Technical metadata extraction (dimensions, format, palette).
    Metadata,
    /// Vision/reasoning analysis of the image content.
    Analysis,
    /// Synthesis of annotations, suggestions and a summary.
    Synthesis,
}

impl StageKind {
    /// All stage kinds in execution order.
    pub const ALL: [Self; 3] = [Self::Metadata, Self::Analysis, Self::Synthesis];

    /// Zero-based position of the stage in the pipeline.
    #[must_use]
    pub fn index(&self) -> usize {
        match self {
            Self::Metadata => 0,
            Self::Analysis => 1,
            Self::Synthesis => 2,
        }
    }

    /// The pipeline state that runs this stage.
    #[must_use]
    pub fn state(&self) -> PipelineState {
        match self {
            Self::Metadata => PipelineState::Stage1,
            Self::Analysis => PipelineState::Stage2,
            Self::Synthesis => PipelineState::Stage3,
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Metadata => write!(f, "metadata"),
            Self::Analysis => write!(f, "analysis"),
            Self::Synthesis => write!(f, "synthesis"),
        }
    }
}

/// State of one orchestrator invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    /// Run created, nothing attempted yet.
    #[default]
    Init,
    /// Metadata extraction.
    Stage1,
    /// Vision analysis.
    Stage2,
    /// Synthesis.
    Stage3,
    /// Scoring and consolidation.
    Consolidate,
    /// Every stage succeeded.
    Completed,
    /// At least one stage succeeded, at least one did not.
    PartiallyCompleted,
    /// No stage succeeded.
    Failed,
}

impl PipelineState {
    /// Resolves the terminal state from the number of successful stages.
    #[must_use]
    pub fn terminal(succeeded_count: usize, total_stages: usize) -> Self {
        if succeeded_count == 0 {
            Self::Failed
        } else if succeeded_count >= total_stages {
            Self::Completed
        } else {
            Self::PartiallyCompleted
        }
    }

    /// Returns true if the state ends the run.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::PartiallyCompleted | Self::Failed)
    }

    /// Returns true if the state is one of the three stage states.
    #[must_use]
    pub fn is_stage(&self) -> bool {
        matches!(self, Self::Stage1 | Self::Stage2 | Self::Stage3)
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Init => write!(f, "init"),
            Self::Stage1 => write!(f, "stage1"),
            Self::Stage2 => write!(f, "stage2"),
            Self::Stage3 => write!(f, "stage3"),
            Self::Consolidate => write!(f, "consolidate"),
            Self::Completed => write!(f, "completed"),
            Self::PartiallyCompleted => write!(f, "partially_completed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}
