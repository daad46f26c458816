//! CheckpointStore - actor that owns run snapshots

use std::collections::HashMap;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

use crate::domain::RunId;
use crate::pipeline::PipelineState;

use super::messages::{CheckpointCommand, CheckpointError, CheckpointResponse};

/// Handle to send commands to the checkpoint actor
#[derive(Clone)]
pub struct CheckpointStore {
    tx: mpsc::Sender<CheckpointCommand>,
}

impl CheckpointStore {
    /// Spawn a new checkpoint actor on the current runtime
    pub fn spawn() -> Self {
        debug!("CheckpointStore::spawn: called");
        let (tx, rx) = mpsc::channel(64);
        tokio::spawn(actor_loop(rx));
        info!("CheckpointStore spawned");
        Self { tx }
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<CheckpointResponse<T>>) -> CheckpointCommand,
    ) -> CheckpointResponse<T> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(build(reply_tx))
            .await
            .map_err(|_| CheckpointError::ChannelError)?;
        reply_rx.await.map_err(|_| CheckpointError::ChannelError)?
    }

    /// Append a snapshot for `run_id`
    pub async fn put(&self, run_id: &RunId, state: PipelineState) -> CheckpointResponse<()> {
        debug!(%run_id, cursor = %state.cursor, "put: called");
        let run_id = run_id.clone();
        self.request(|reply| CheckpointCommand::Put {
            run_id,
            state: Box::new(state),
            reply,
        })
        .await
    }

    /// Latest snapshot for a run
    pub async fn get(&self, run_id: &RunId) -> CheckpointResponse<Option<PipelineState>> {
        debug!(%run_id, "get: called");
        let run_id = run_id.clone();
        self.request(|reply| CheckpointCommand::Get { run_id, reply }).await
    }

    /// Every snapshot for a run, oldest first
    pub async fn history(&self, run_id: &RunId) -> CheckpointResponse<Vec<PipelineState>> {
        debug!(%run_id, "history: called");
        let run_id = run_id.clone();
        self.request(|reply| CheckpointCommand::History { run_id, reply }).await
    }

    /// Latest snapshot of every run, ordered by run id
    pub async fn list(&self) -> CheckpointResponse<Vec<PipelineState>> {
        debug!("list: called");
        self.request(|reply| CheckpointCommand::List { reply }).await
    }

    /// Stop the actor
    pub async fn shutdown(&self) -> CheckpointResponse<()> {
        debug!("shutdown: called");
        self.tx
            .send(CheckpointCommand::Shutdown)
            .await
            .map_err(|_| CheckpointError::ChannelError)
    }
}

async fn actor_loop(mut rx: mpsc::Receiver<CheckpointCommand>) {
    debug!("actor_loop: called");
    let mut runs: HashMap<RunId, Vec<PipelineState>> = HashMap::new();

    while let Some(cmd) = rx.recv().await {
        match cmd {
            CheckpointCommand::Put { run_id, state, reply } => {
                debug!(%run_id, "actor_loop: Put command");
                let result = if state.run_id != run_id {
                    Err(CheckpointError::RunMismatch {
                        expected: run_id,
                        found: state.run_id.clone(),
                    })
                } else {
                    runs.entry(run_id).or_default().push(*state);
                    Ok(())
                };
                let _ = reply.send(result);
            }

            CheckpointCommand::Get { run_id, reply } => {
                debug!(%run_id, "actor_loop: Get command");
                let latest = runs.get(&run_id).and_then(|h| h.last()).cloned();
                let _ = reply.send(Ok(latest));
            }

            CheckpointCommand::History { run_id, reply } => {
                debug!(%run_id, "actor_loop: History command");
                let history = runs.get(&run_id).cloned().unwrap_or_default();
                let _ = reply.send(Ok(history));
            }

            CheckpointCommand::List { reply } => {
                debug!(runs = runs.len(), "actor_loop: List command");
                let mut latest: Vec<PipelineState> = runs.values().filter_map(|h| h.last()).cloned().collect();
                latest.sort_by(|a, b| a.run_id.cmp(&b.run_id));
                let _ = reply.send(Ok(latest));
            }

            CheckpointCommand::Shutdown => {
                info!("CheckpointStore shutting down");
                break;
            }
        }
    }

    debug!("CheckpointStore actor stopped");
}
