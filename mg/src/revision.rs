//! Revision controller: decides whether a validated recipe is edited or shopped

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::domain::{ValidationReport, ValidationResult};

/// Where the pipeline goes after validation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Route {
    Edit,
    Shop,
}

/// Lifecycle of the current recipe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RevisionPhase {
    Generated,
    Validated,
    Edited,
}

impl RevisionPhase {
    /// Legal phase changes; there is only one revision pass
    pub fn is_valid_transition(from: RevisionPhase, to: RevisionPhase) -> bool {
        matches!(
            (from, to),
            (RevisionPhase::Generated, RevisionPhase::Validated) | (RevisionPhase::Validated, RevisionPhase::Edited)
        )
    }
}

/// How to route a validation that produced no results
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmptyValidationPolicy {
    /// Send the recipe to the editor
    #[default]
    Revise,
    /// Treat as passing and go to shopping
    Proceed,
    /// Fail the run
    Abort,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    #[error("Validation produced no results and the policy is abort")]
    EmptyAborted,

    #[error("Validation report is for recipe revision {report_revision}, current revision is {recipe_revision}")]
    Stale { report_revision: u32, recipe_revision: u32 },

    #[error("Cannot route a recipe in phase {0:?}")]
    WrongPhase(RevisionPhase),
}

/// Route from a result set: any failure edits, all passes shop
pub fn route(results: &[ValidationResult], policy: EmptyValidationPolicy) -> Result<Route, RouteError> {
    debug!(count = results.len(), ?policy, "route: called");
    if results.is_empty() {
        return match policy {
            EmptyValidationPolicy::Revise => Ok(Route::Edit),
            EmptyValidationPolicy::Proceed => Ok(Route::Shop),
            EmptyValidationPolicy::Abort => Err(RouteError::EmptyAborted),
        };
    }
    if results.iter().any(|r| !r.passed()) {
        Ok(Route::Edit)
    } else {
        Ok(Route::Shop)
    }
}

/// Route with the phase and revision checks applied
///
/// A recipe that was already edited always goes to shopping. A report must
/// belong to the current recipe revision; a missing report counts as empty.
pub fn decide(
    phase: RevisionPhase,
    recipe_revision: u32,
    report: Option<&ValidationReport>,
    policy: EmptyValidationPolicy,
) -> Result<Route, RouteError> {
    debug!(?phase, recipe_revision, has_report = report.is_some(), "decide: called");
    match phase {
        RevisionPhase::Generated => Err(RouteError::WrongPhase(phase)),
        RevisionPhase::Edited => Ok(Route::Shop),
        RevisionPhase::Validated => match report {
            None => route(&[], policy),
            Some(report) if report.recipe_revision != recipe_revision => Err(RouteError::Stale {
                report_revision: report.recipe_revision,
                recipe_revision,
            }),
            Some(report) => route(&report.results, policy),
        },
    }
}
