//! Event types for pipeline activity

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{Rule, RunId};
use crate::graph::Stage;
use crate::pipeline::RunStatus;

/// Everything observable about a run
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PipelineEvent {
    RunStarted {
        run_id: RunId,
    },
    StageStarted {
        run_id: RunId,
        stage: Stage,
    },
    RecipeGenerated {
        run_id: RunId,
        recipe: String,
        ingredients: usize,
    },
    /// Fired for the validator's report and again for a re-check after editing
    RecipeValidated {
        run_id: RunId,
        recipe_revision: u32,
        failed: Vec<Rule>,
    },
    RecipeEdited {
        run_id: RunId,
        recipe: String,
        recipe_revision: u32,
        addressed: Vec<Rule>,
    },
    ShoppingListReady {
        run_id: RunId,
        departments: usize,
        items: usize,
    },
    StageDegraded {
        run_id: RunId,
        stage: Stage,
        reason: String,
    },
    RunCompleted {
        run_id: RunId,
        status: RunStatus,
    },
    RunFailed {
        run_id: RunId,
        stage: Option<Stage>,
        error: String,
    },
}

impl PipelineEvent {
    pub fn run_id(&self) -> &RunId {
        match self {
            PipelineEvent::RunStarted { run_id }
            | PipelineEvent::StageStarted { run_id, .. }
            | PipelineEvent::RecipeGenerated { run_id, .. }
            | PipelineEvent::RecipeValidated { run_id, .. }
            | PipelineEvent::RecipeEdited { run_id, .. }
            | PipelineEvent::ShoppingListReady { run_id, .. }
            | PipelineEvent::StageDegraded { run_id, .. }
            | PipelineEvent::RunCompleted { run_id, .. }
            | PipelineEvent::RunFailed { run_id, .. } => run_id,
        }
    }

    pub fn event_type(&self) -> &'static str {
        match self {
            PipelineEvent::RunStarted { .. } => "RunStarted",
            PipelineEvent::StageStarted { .. } => "StageStarted",
            PipelineEvent::RecipeGenerated { .. } => "RecipeGenerated",
            PipelineEvent::RecipeValidated { .. } => "RecipeValidated",
            PipelineEvent::RecipeEdited { .. } => "RecipeEdited",
            PipelineEvent::ShoppingListReady { .. } => "ShoppingListReady",
            PipelineEvent::StageDegraded { .. } => "StageDegraded",
            PipelineEvent::RunCompleted { .. } => "RunCompleted",
            PipelineEvent::RunFailed { .. } => "RunFailed",
        }
    }

    /// True for the last event a run emits
    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineEvent::RunCompleted { .. } | PipelineEvent::RunFailed { .. })
    }
}

/// One line of a JSONL event log
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EventLogEntry {
    #[serde(rename = "ts")]
    pub timestamp: DateTime<Utc>,
    pub event: PipelineEvent,
}

impl EventLogEntry {
    pub fn new(event: PipelineEvent) -> Self {
        Self {
            timestamp: Utc::now(),
            event,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_tagging() {
        let event = PipelineEvent::RecipeValidated {
            run_id: RunId::from("r1"),
            recipe_revision: 0,
            failed: vec![Rule::AllergenSafety],
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "RecipeValidated");
        assert_eq!(json["run_id"], "r1");
        assert_eq!(json["failed"][0], "allergenSafetyRule");
        assert_eq!(event.event_type(), "RecipeValidated");
        assert_eq!(event.run_id().as_str(), "r1");
    }

    #[test]
    fn test_terminal_events() {
        let done = PipelineEvent::RunCompleted {
            run_id: RunId::from("r1"),
            status: RunStatus::Completed,
        };
        let started = PipelineEvent::StageStarted {
            run_id: RunId::from("r1"),
            stage: Stage::Shop,
        };
        assert!(done.is_terminal());
        assert!(!started.is_terminal());
    }

    #[test]
    fn test_log_entry_roundtrip() {
        let entry = EventLogEntry::new(PipelineEvent::StageDegraded {
            run_id: RunId::from("r1"),
            stage: Stage::Generate,
            reason: "invalid JSON".to_string(),
        });
        let line = serde_json::to_string(&entry).unwrap();
        assert!(line.contains("\"ts\""));
        let back: EventLogEntry = serde_json::from_str(&line).unwrap();
        assert_eq!(back.event, entry.event);
    }
}
