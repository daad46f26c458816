//! Stage orchestrator
//!
//! Runs one meal-planning pass over the stage graph:
//!
//! ```text
//! START -> generate -> validate -> [fail? -> edit -> shop : shop] -> END
//! ```
//!
//! Stages communicate only through `PipelineState`. After every completed
//! stage the state is appended to the checkpoint store, so a run that fails
//! on a model call can be resumed from the stage that failed.

mod error;
mod stages;
mod state;

pub use error::PipelineError;
pub use state::{DegradedStage, PipelineState, RunStatus};

use std::path::Path;
use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, error, info};

use crate::checkpoint::CheckpointStore;
use crate::config::{Config, PipelineConfig};
use crate::domain::{RunId, UserPreferences};
use crate::events::{EventBus, PipelineEvent};
use crate::graph::{Stage, TransitionTable};
use crate::llm::{CallLimits, LlmClient};
use crate::prompts::PromptLoader;
use crate::revision::{RevisionPhase, decide};
use crate::rules::RuleBook;

/// The meal-planning pipeline and its collaborators
pub struct Pipeline {
    client: Arc<dyn LlmClient>,
    prompts: PromptLoader,
    rules: RuleBook,
    checkpoints: CheckpointStore,
    events: Option<Arc<EventBus>>,
    settings: PipelineConfig,
    limits: CallLimits,
    graph: TransitionTable,
    /// Fixed date for the seasonal prompt; today when unset
    today: Option<NaiveDate>,
}

impl Pipeline {
    /// Pipeline with embedded prompts and default rules and settings
    pub fn new(client: Arc<dyn LlmClient>, checkpoints: CheckpointStore) -> Result<Self, PipelineError> {
        debug!(model = client.model(), "Pipeline::new: called");
        Ok(Self {
            client,
            prompts: PromptLoader::embedded_only(),
            rules: RuleBook::default(),
            checkpoints,
            events: None,
            settings: PipelineConfig::default(),
            limits: CallLimits::default(),
            graph: TransitionTable::meal_planning()?,
            today: None,
        })
    }

    /// Pipeline configured from a loaded `Config`
    ///
    /// Prompt overrides are looked up under `root`.
    pub fn from_config(
        config: &Config,
        client: Arc<dyn LlmClient>,
        checkpoints: CheckpointStore,
        root: impl AsRef<Path>,
    ) -> Result<Self, PipelineError> {
        debug!(root = ?root.as_ref(), "Pipeline::from_config: called");
        Ok(Self::new(client, checkpoints)?
            .with_prompts(PromptLoader::new(root, config.prompts.dir.clone()))
            .with_rules(RuleBook::from_config(&config.rules))
            .with_settings(config.pipeline.clone())
            .with_limits(CallLimits::from_config(&config.llm)))
    }

    pub fn with_prompts(mut self, prompts: PromptLoader) -> Self {
        self.prompts = prompts;
        self
    }

    pub fn with_rules(mut self, rules: RuleBook) -> Self {
        self.rules = rules;
        self
    }

    pub fn with_settings(mut self, settings: PipelineConfig) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_limits(mut self, limits: CallLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_events(mut self, events: Arc<EventBus>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn with_date(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    pub fn checkpoints(&self) -> &CheckpointStore {
        &self.checkpoints
    }

    /// Run a fresh pipeline for `prefs`
    pub async fn run(&self, prefs: UserPreferences) -> Result<PipelineState, PipelineError> {
        self.run_with_id(RunId::generate(), prefs).await
    }

    pub async fn run_with_id(&self, run_id: RunId, prefs: UserPreferences) -> Result<PipelineState, PipelineError> {
        info!(%run_id, "Starting meal-planning run");
        let state = PipelineState::new(run_id.clone(), prefs);
        self.emit(PipelineEvent::RunStarted { run_id: run_id.clone() });
        self.checkpoints.put(&run_id, state.clone()).await?;
        self.drive(state).await
    }

    /// Continue a checkpointed run from its cursor
    ///
    /// A finished run is returned as it is.
    pub async fn resume(&self, run_id: &RunId) -> Result<PipelineState, PipelineError> {
        debug!(%run_id, "resume: called");
        let state = self
            .checkpoints
            .get(run_id)
            .await?
            .ok_or_else(|| PipelineError::UnknownRun(run_id.clone()))?;
        if state.is_finished() {
            debug!(%run_id, status = %state.status, "resume: run already finished");
            return Ok(state);
        }
        info!(%run_id, cursor = %state.cursor, "Resuming run");
        self.drive(state).await
    }

    async fn drive(&self, mut state: PipelineState) -> Result<PipelineState, PipelineError> {
        match self.advance(&mut state).await {
            Ok(()) => {
                info!(
                    run_id = %state.run_id,
                    status = %state.status,
                    recipe = %state.recipe.name,
                    degraded = state.degraded.len(),
                    "Run finished"
                );
                self.emit(PipelineEvent::RunCompleted {
                    run_id: state.run_id.clone(),
                    status: state.status,
                });
                Ok(state)
            }
            Err(e) => {
                error!(run_id = %state.run_id, cursor = %state.cursor, error = %e, "Run failed");
                self.emit(PipelineEvent::RunFailed {
                    run_id: state.run_id.clone(),
                    stage: e.stage().or(Some(state.cursor)),
                    error: e.to_string(),
                });
                Err(e)
            }
        }
    }

    /// Execute stages until the cursor reaches END
    async fn advance(&self, state: &mut PipelineState) -> Result<(), PipelineError> {
        while !state.cursor.is_terminal() {
            let stage = state.cursor;
            if state.trail.contains(&stage) {
                return Err(PipelineError::StageRevisited(stage));
            }
            debug!(run_id = %state.run_id, %stage, "advance: entering stage");
            self.emit(PipelineEvent::StageStarted {
                run_id: state.run_id.clone(),
                stage,
            });

            self.execute(stage, state).await?;

            let route = if self.graph.branches_at(stage) {
                let phase = state.phase.unwrap_or(RevisionPhase::Generated);
                let route = decide(
                    phase,
                    state.recipe_revision,
                    state.validation.as_ref(),
                    self.settings.empty_validation,
                )?;
                info!(run_id = %state.run_id, ?route, "Routing after {}", stage);
                Some(route)
            } else {
                None
            };

            state.trail.push(stage);
            state.cursor = self.graph.next(stage, route)?;
            if state.cursor.is_terminal() {
                state.trail.push(state.cursor);
                state.finish();
            } else {
                state.touch();
            }
            self.checkpoints.put(&state.run_id, state.clone()).await?;
        }
        Ok(())
    }

    async fn execute(&self, stage: Stage, state: &mut PipelineState) -> Result<(), PipelineError> {
        match stage {
            Stage::Start | Stage::End => Ok(()),
            Stage::Generate => self.generate(state).await,
            Stage::Validate => self.validate(state).await,
            Stage::Edit => self.edit(state).await,
            Stage::Shop => self.shop(state).await,
        }
    }

    fn emit(&self, event: PipelineEvent) {
        if let Some(bus) = &self.events {
            bus.emit(event);
        }
    }
}
