//! Checkpoint store messages
//!
//! Commands and responses for the actor pattern.

use thiserror::Error;
use tokio::sync::oneshot;

use crate::domain::RunId;
use crate::pipeline::PipelineState;

/// Errors from checkpoint operations
#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("Snapshot for run {found} stored under run {expected}")]
    RunMismatch { expected: RunId, found: RunId },

    #[error("Channel error")]
    ChannelError,
}

/// Response from checkpoint operations
pub type CheckpointResponse<T> = Result<T, CheckpointError>;

/// Commands sent to the checkpoint actor
#[derive(Debug)]
pub enum CheckpointCommand {
    Put {
        run_id: RunId,
        state: Box<PipelineState>,
        reply: oneshot::Sender<CheckpointResponse<()>>,
    },
    Get {
        run_id: RunId,
        reply: oneshot::Sender<CheckpointResponse<Option<PipelineState>>>,
    },
    History {
        run_id: RunId,
        reply: oneshot::Sender<CheckpointResponse<Vec<PipelineState>>>,
    },
    List {
        reply: oneshot::Sender<CheckpointResponse<Vec<PipelineState>>>,
    },
    Shutdown,
}
