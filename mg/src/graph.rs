//! Stage graph
//!
//! The pipeline's control flow as an explicit transition table:
//!
//! ```text
//! START -> generate -> validate -> [fail? -> edit -> shop : shop] -> END
//! ```
//!
//! Tables are checked when built, so a running pipeline can only ever follow
//! an acyclic path with one outcome per (stage, condition).

use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::revision::Route;

/// A node in the pipeline graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Start,
    Generate,
    Validate,
    Edit,
    Shop,
    End,
}

impl Stage {
    pub const ALL: [Stage; 6] = [
        Stage::Start,
        Stage::Generate,
        Stage::Validate,
        Stage::Edit,
        Stage::Shop,
        Stage::End,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Start => "start",
            Stage::Generate => "generate",
            Stage::Validate => "validate",
            Stage::Edit => "edit",
            Stage::Shop => "shop",
            Stage::End => "end",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Stage::End)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Edge guard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Condition {
    Always,
    /// The router chose to edit
    Failures,
    /// The router chose to shop
    NoFailures,
}

impl Condition {
    fn admits(&self, route: Option<Route>) -> bool {
        match self {
            Condition::Always => true,
            Condition::Failures => route == Some(Route::Edit),
            Condition::NoFailures => route == Some(Route::Shop),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: Stage,
    pub when: Condition,
    pub to: Stage,
}

impl Transition {
    pub const fn new(from: Stage, when: Condition, to: Stage) -> Self {
        Self { from, when, to }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error("Duplicate transition from {from} when {when:?}")]
    DuplicateRow { from: Stage, when: Condition },

    #[error("Conditions out of {0} are not exhaustive")]
    NonExhaustive(Stage),

    #[error("Stage {0} mixes unconditional and conditional transitions")]
    MixedConditions(Stage),

    #[error("Terminal stage has an outgoing transition")]
    TerminalOutgoing,

    #[error("END may only be reached from shop, found a transition from {0}")]
    EndNotFromShop(Stage),

    #[error("Transition into START from {0}")]
    IncomingToStart(Stage),

    #[error("Cycle through stage {0}")]
    Cycle(Stage),

    #[error("Stage {0} is not reachable from START")]
    Unreachable(Stage),

    #[error("No transition from {from} for route {route:?}")]
    NoTransition { from: Stage, route: Option<Route> },
}

/// Validated transition table
#[derive(Debug, Clone)]
pub struct TransitionTable {
    rows: Vec<Transition>,
}

impl TransitionTable {
    /// Build and check a table
    pub fn new(rows: Vec<Transition>) -> Result<Self, GraphError> {
        debug!(rows = rows.len(), "TransitionTable::new: called");
        let mut seen: HashSet<(Stage, Condition)> = HashSet::new();
        let mut by_stage: HashMap<Stage, Vec<Condition>> = HashMap::new();

        for row in &rows {
            if !seen.insert((row.from, row.when)) {
                return Err(GraphError::DuplicateRow {
                    from: row.from,
                    when: row.when,
                });
            }
            if row.from.is_terminal() {
                return Err(GraphError::TerminalOutgoing);
            }
            if row.to == Stage::End && row.from != Stage::Shop {
                return Err(GraphError::EndNotFromShop(row.from));
            }
            if row.to == Stage::Start {
                return Err(GraphError::IncomingToStart(row.from));
            }
            by_stage.entry(row.from).or_default().push(row.when);
        }

        for stage in Stage::ALL.into_iter().filter(|s| !s.is_terminal()) {
            let Some(conditions) = by_stage.get(&stage) else {
                return Err(GraphError::NonExhaustive(stage));
            };
            let unconditional = conditions.contains(&Condition::Always);
            if unconditional && conditions.len() > 1 {
                return Err(GraphError::MixedConditions(stage));
            }
            let branched =
                conditions.contains(&Condition::Failures) && conditions.contains(&Condition::NoFailures);
            if !unconditional && !branched {
                return Err(GraphError::NonExhaustive(stage));
            }
        }

        let table = Self { rows };
        table.check_acyclic_and_reachable()?;
        Ok(table)
    }

    /// The meal-planning graph
    pub fn meal_planning() -> Result<Self, GraphError> {
        use Condition::*;
        use Stage::*;
        Self::new(vec![
            Transition::new(Start, Always, Generate),
            Transition::new(Generate, Always, Validate),
            Transition::new(Validate, Failures, Edit),
            Transition::new(Validate, NoFailures, Shop),
            Transition::new(Edit, Always, Shop),
            Transition::new(Shop, Always, End),
        ])
    }

    fn successors(&self, stage: Stage) -> impl Iterator<Item = Stage> + '_ {
        self.rows.iter().filter(move |r| r.from == stage).map(|r| r.to)
    }

    fn check_acyclic_and_reachable(&self) -> Result<(), GraphError> {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            Visiting,
            Done,
        }

        fn visit(table: &TransitionTable, stage: Stage, marks: &mut HashMap<Stage, Mark>) -> Result<(), GraphError> {
            match marks.get(&stage) {
                Some(Mark::Done) => return Ok(()),
                Some(Mark::Visiting) => return Err(GraphError::Cycle(stage)),
                None => {}
            }
            marks.insert(stage, Mark::Visiting);
            for next in table.successors(stage) {
                visit(table, next, marks)?;
            }
            marks.insert(stage, Mark::Done);
            Ok(())
        }

        let mut marks = HashMap::new();
        visit(self, Stage::Start, &mut marks)?;
        if let Some(missing) = Stage::ALL.into_iter().find(|s| !marks.contains_key(s)) {
            return Err(GraphError::Unreachable(missing));
        }
        Ok(())
    }

    /// Next stage out of `from`; `route` is required after a branching stage
    pub fn next(&self, from: Stage, route: Option<Route>) -> Result<Stage, GraphError> {
        let next = self
            .rows
            .iter()
            .find(|r| r.from == from && r.when.admits(route))
            .map(|r| r.to)
            .ok_or(GraphError::NoTransition { from, route })?;
        debug!(%from, ?route, %next, "TransitionTable::next: resolved");
        Ok(next)
    }

    /// True when leaving `from` needs a routing decision
    pub fn branches_at(&self, from: Stage) -> bool {
        self.rows.iter().any(|r| r.from == from && r.when != Condition::Always)
    }

    pub fn rows(&self) -> &[Transition] {
        &self.rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use Condition::*;
    use Stage::*;

    fn standard_rows() -> Vec<Transition> {
        TransitionTable::meal_planning().unwrap().rows().to_vec()
    }

    #[test]
    fn test_meal_planning_paths() {
        let table = TransitionTable::meal_planning().unwrap();
        assert_eq!(table.next(Start, None).unwrap(), Generate);
        assert_eq!(table.next(Generate, None).unwrap(), Validate);
        assert_eq!(table.next(Validate, Some(Route::Edit)).unwrap(), Edit);
        assert_eq!(table.next(Validate, Some(Route::Shop)).unwrap(), Shop);
        assert_eq!(table.next(Edit, None).unwrap(), Shop);
        assert_eq!(table.next(Shop, None).unwrap(), End);
        assert!(table.branches_at(Validate));
        assert!(!table.branches_at(Generate));
    }

    #[test]
    fn test_branch_without_route_fails() {
        let table = TransitionTable::meal_planning().unwrap();
        assert_eq!(
            table.next(Validate, None),
            Err(GraphError::NoTransition {
                from: Validate,
                route: None
            })
        );
        assert!(table.next(End, None).is_err());
    }

    #[test]
    fn test_rejects_cycle() {
        let mut rows = standard_rows();
        rows.retain(|r| r.from != Edit);
        rows.push(Transition::new(Edit, Always, Validate));
        assert_eq!(TransitionTable::new(rows).unwrap_err(), GraphError::Cycle(Validate));
    }

    #[test]
    fn test_rejects_duplicate_row() {
        let mut rows = standard_rows();
        rows.push(Transition::new(Generate, Always, Shop));
        assert_eq!(
            TransitionTable::new(rows).unwrap_err(),
            GraphError::DuplicateRow {
                from: Generate,
                when: Always
            }
        );
    }

    #[test]
    fn test_rejects_non_exhaustive_branch() {
        let mut rows = standard_rows();
        rows.retain(|r| !(r.from == Validate && r.when == NoFailures));
        assert_eq!(TransitionTable::new(rows).unwrap_err(), GraphError::NonExhaustive(Validate));
    }

    #[test]
    fn test_rejects_mixed_conditions() {
        let mut rows = standard_rows();
        rows.push(Transition::new(Validate, Always, Shop));
        assert_eq!(TransitionTable::new(rows).unwrap_err(), GraphError::MixedConditions(Validate));
    }

    #[test]
    fn test_rejects_end_not_from_shop() {
        let mut rows = standard_rows();
        rows.retain(|r| r.from != Edit);
        rows.push(Transition::new(Edit, Always, End));
        assert_eq!(TransitionTable::new(rows).unwrap_err(), GraphError::EndNotFromShop(Edit));
    }

    #[test]
    fn test_rejects_unreachable_stage() {
        let mut rows = standard_rows();
        rows.retain(|r| !(r.from == Validate && r.when == Failures));
        rows.push(Transition::new(Validate, Failures, Shop));
        assert_eq!(TransitionTable::new(rows).unwrap_err(), GraphError::Unreachable(Edit));
    }

    #[test]
    fn test_stage_serde_names() {
        assert_eq!(serde_json::to_string(&Validate).unwrap(), "\"validate\"");
        assert_eq!(Shop.to_string(), "shop");
    }
}
