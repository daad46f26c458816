//! Compliance rules
//!
//! Each `Rule` is an independently evaluable check of a recipe against the
//! user's preferences. `RuleBook` carries the thresholds; `evaluate` runs
//! every rule deterministically.

mod evaluator;
mod matching;

pub use evaluator::{Completeness, check_completeness, evaluate, evaluate_rule};

use crate::config::RulesConfig;
use crate::domain::Rule;

/// Allowed relative deviation from calorie and protein targets
pub const DEFAULT_TOLERANCE: f64 = 0.15;

/// Thresholds and seasoning list used by the evaluator
#[derive(Debug, Clone)]
pub struct RuleBook {
    pub tolerance: f64,
    pub max_ingredients: usize,
    pub max_minutes: u32,
    /// Seasoning phrases, pre-tokenized
    seasonings: Vec<Vec<String>>,
}

impl RuleBook {
    pub fn from_config(config: &RulesConfig) -> Self {
        tracing::debug!(
            tolerance = config.tolerance,
            max_ingredients = config.max_ingredients,
            max_minutes = config.max_minutes,
            "RuleBook::from_config: called"
        );
        Self {
            tolerance: config.tolerance,
            max_ingredients: config.max_ingredients,
            max_minutes: config.max_minutes,
            seasonings: config
                .seasonings
                .iter()
                .map(|s| matching::tokens(s))
                .filter(|t| !t.is_empty())
                .collect(),
        }
    }

    /// True when the ingredient does not count towards the ingredient limit
    pub fn is_seasoning(&self, ingredient: &str) -> bool {
        matching::is_seasoning(ingredient, &self.seasonings)
    }

    /// One-line statement of a rule with this book's thresholds
    pub fn describe(&self, rule: Rule) -> String {
        let pct = (self.tolerance * 100.0).round();
        match rule {
            Rule::IngredientCount => format!(
                "Recipe must contain {} or fewer main ingredients, excluding oils, salt, pepper and basic seasonings",
                self.max_ingredients
            ),
            Rule::CalorieCompliance => format!("Total calories must be within ±{}% of target", pct),
            Rule::ProteinCompliance => format!("Total protein must be within ±{}% of target", pct),
            Rule::AllergenSafety => "No listed allergens can be present in any form".to_string(),
            Rule::DietaryCompliance => "Recipe must follow all specified dietary guidelines".to_string(),
            Rule::IngredientRestriction => "No disliked or restricted ingredients can be present".to_string(),
            Rule::TimeManagement => format!("Recipe must be completable in {} minutes or less", self.max_minutes),
        }
    }
}

impl Default for RuleBook {
    fn default() -> Self {
        Self::from_config(&RulesConfig::default())
    }
}

/// What the editor should do about a failed rule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CorrectiveAction {
    pub action: &'static str,
    pub method: &'static str,
}

pub fn corrective_action(rule: Rule) -> CorrectiveAction {
    let (action, method) = match rule {
        Rule::CalorieCompliance => (
            "Adjust portions of two main ingredients while maintaining flavor balance and texture",
            "Calculate the percentage difference from target and adjust the highest-calorie ingredients proportionally",
        ),
        Rule::ProteinCompliance => (
            "Increase the main protein portion",
            "Calculate the required protein increase and adjust the portion accordingly",
        ),
        Rule::AllergenSafety => (
            "Remove and replace allergenic ingredients",
            "Use substitutes with similar texture and flavor profiles",
        ),
        Rule::IngredientRestriction => (
            "Remove and replace restricted ingredients",
            "Substitute allowed ingredients that serve a similar culinary function",
        ),
        Rule::DietaryCompliance => (
            "Remove and replace non-compliant ingredients",
            "Use alternatives that meet the dietary guidelines while keeping the dish intact",
        ),
        Rule::IngredientCount => (
            "Remove unnecessary ingredients",
            "Eliminate ingredients whose function is served by others in the recipe",
        ),
        Rule::TimeManagement => (
            "Streamline preparation steps",
            "Combine compatible steps or remove optional ones",
        ),
    };
    CorrectiveAction { action, method }
}
