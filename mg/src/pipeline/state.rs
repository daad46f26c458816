//! Pipeline state - everything a run knows, snapshotted after every stage

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::{Recipe, RunId, ShoppingList, UserPreferences, ValidationReport};
use crate::graph::Stage;
use crate::revision::RevisionPhase;

use super::error::PipelineError;

/// Longest raw-output excerpt kept for a degraded stage
const EXCERPT_CHARS: usize = 200;

/// Overall outcome of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Running,
    Completed,
    /// Finished, but at least one stage fell back to a sentinel value
    Degraded,
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RunStatus::Running => "running",
            RunStatus::Completed => "completed",
            RunStatus::Degraded => "degraded",
        };
        write!(f, "{}", s)
    }
}

/// A stage whose output could not be used
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DegradedStage {
    pub stage: Stage,
    pub reason: String,
    /// Start of the raw model output, empty when the model was not called
    pub excerpt: String,
}

/// State of one pipeline run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineState {
    pub run_id: RunId,

    /// Input preferences, never changed by a stage
    pub prefs: UserPreferences,

    /// Current recipe; the empty sentinel until generation succeeds
    pub recipe: Recipe,

    /// Bumped every time the recipe is replaced
    pub recipe_revision: u32,

    /// Recipe as it was before the editor replaced it
    pub draft: Option<Recipe>,

    /// Report for the current recipe revision
    pub validation: Option<ValidationReport>,

    /// Reports for earlier revisions, oldest first
    pub superseded: Vec<ValidationReport>,

    pub shopping_list: ShoppingList,

    /// None until the generator has run
    pub phase: Option<RevisionPhase>,

    /// Next stage to execute
    pub cursor: Stage,

    /// Stages completed so far, in order
    pub trail: Vec<Stage>,

    pub degraded: Vec<DegradedStage>,

    pub status: RunStatus,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PipelineState {
    pub fn new(run_id: RunId, prefs: UserPreferences) -> Self {
        debug!(%run_id, "PipelineState::new: called");
        let now = Utc::now();
        Self {
            run_id,
            prefs,
            recipe: Recipe::default(),
            recipe_revision: 0,
            draft: None,
            validation: None,
            superseded: Vec::new(),
            shopping_list: ShoppingList::new(),
            phase: None,
            cursor: Stage::Start,
            trail: Vec::new(),
            degraded: Vec::new(),
            status: RunStatus::Running,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.cursor.is_terminal() && self.status != RunStatus::Running
    }

    pub fn is_degraded(&self) -> bool {
        !self.degraded.is_empty()
    }

    pub fn was_edited(&self) -> bool {
        self.phase == Some(RevisionPhase::Edited)
    }

    /// Move the recipe to a new phase
    ///
    /// The first phase must be GENERATED; after that only the transitions
    /// the revision controller allows are accepted.
    pub fn enter_phase(&mut self, to: RevisionPhase) -> Result<(), PipelineError> {
        debug!(run_id = %self.run_id, from = ?self.phase, ?to, "enter_phase: called");
        let allowed = match self.phase {
            None => to == RevisionPhase::Generated,
            Some(from) => RevisionPhase::is_valid_transition(from, to),
        };
        if !allowed {
            return Err(PipelineError::InvalidPhase { from: self.phase, to });
        }
        self.phase = Some(to);
        Ok(())
    }

    /// Replace the recipe with an edited one, keeping the old one as draft
    ///
    /// The current report no longer describes the recipe, so it moves to
    /// `superseded`.
    pub fn replace_recipe(&mut self, recipe: Recipe) {
        debug!(run_id = %self.run_id, revision = self.recipe_revision, "replace_recipe: called");
        let previous = std::mem::replace(&mut self.recipe, recipe);
        self.draft = Some(previous);
        self.recipe_revision += 1;
        if let Some(report) = self.validation.take() {
            self.superseded.push(report);
        }
    }

    pub fn record_degraded(&mut self, stage: Stage, reason: impl Into<String>, raw: &str) {
        let excerpt: String = raw.chars().take(EXCERPT_CHARS).collect();
        self.degraded.push(DegradedStage {
            stage,
            reason: reason.into(),
            excerpt,
        });
    }

    pub fn degraded_stages(&self) -> Vec<Stage> {
        self.degraded.iter().map(|d| d.stage).collect()
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Mark the run as done
    pub fn finish(&mut self) {
        self.status = if self.is_degraded() {
            RunStatus::Degraded
        } else {
            RunStatus::Completed
        };
        self.touch();
    }
}
