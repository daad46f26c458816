//! Pipeline error types

use thiserror::Error;

use crate::checkpoint::CheckpointError;
use crate::domain::{Rule, RunId};
use crate::graph::{GraphError, Stage};
use crate::llm::LlmError;
use crate::revision::{RevisionPhase, RouteError};

/// Errors that stop a run
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Model call failed in {stage}: {source}")]
    Model {
        stage: Stage,
        #[source]
        source: LlmError,
    },

    #[error("Malformed {stage} output: {reason}")]
    Malformed { stage: Stage, reason: String },

    #[error(
        "Validation does not cover every rule exactly once (missing: {missing:?}, duplicated: {duplicated:?}, unrecognised: {unrecognised:?})"
    )]
    IncompleteValidation {
        missing: Vec<Rule>,
        duplicated: Vec<Rule>,
        unrecognised: Vec<String>,
    },

    #[error(transparent)]
    Route(#[from] RouteError),

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error("Recipe cannot move from {from:?} to {to:?}")]
    InvalidPhase { from: Option<RevisionPhase>, to: RevisionPhase },

    #[error("Stage {0} was already run")]
    StageRevisited(Stage),

    #[error("Failed to render {stage} prompt: {message}")]
    Prompt { stage: Stage, message: String },

    #[error("No checkpoint for run {0}")]
    UnknownRun(RunId),

    #[error(transparent)]
    Checkpoint(#[from] CheckpointError),
}

impl PipelineError {
    /// Whether resuming the run could get past this error
    pub fn is_retryable(&self) -> bool {
        match self {
            PipelineError::Model { source, .. } => source.is_retryable(),
            PipelineError::Checkpoint(_) => true,
            _ => false,
        }
    }

    /// Stage the error happened in, when there is one
    pub fn stage(&self) -> Option<Stage> {
        match self {
            PipelineError::Model { stage, .. }
            | PipelineError::Malformed { stage, .. }
            | PipelineError::Prompt { stage, .. }
            | PipelineError::StageRevisited(stage) => Some(*stage),
            PipelineError::IncompleteValidation { .. } => Some(Stage::Validate),
            _ => None,
        }
    }
}
