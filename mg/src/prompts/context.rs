//! Render contexts for the stage templates

use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use tracing::debug;

use crate::domain::{DEPARTMENTS, Recipe, Rule, UserPreferences};
use crate::rules::{RuleBook, corrective_action};

/// Fields every stage shares
#[derive(Debug, Clone, Serialize)]
struct Targets {
    calories: String,
    protein: String,
    allergens: String,
    dietary: String,
    disliked: String,
}

impl Targets {
    fn from_prefs(prefs: &UserPreferences) -> Self {
        Self {
            calories: format_number(prefs.calories_per_meal),
            protein: format_number(prefs.protein_per_meal),
            allergens: prefs.allergens_joined(),
            dietary: prefs.dietary_preferences.join(", "),
            disliked: prefs.disliked_foods.join(", "),
        }
    }
}

/// 500.0 renders as "500", 22.5 as "22.5"
fn format_number(n: f64) -> String {
    if n.fract() == 0.0 { format!("{}", n as i64) } else { format!("{}", n) }
}

fn recipe_json(recipe: &Recipe) -> String {
    serde_json::to_string_pretty(recipe).unwrap_or_else(|_| format!("{:?}", recipe))
}

/// A rule as shown to the model
#[derive(Debug, Clone, Serialize)]
pub struct RuleLine {
    pub name: &'static str,
    pub description: String,
    pub action: &'static str,
    pub method: &'static str,
}

impl RuleLine {
    fn new(rule: Rule, book: &RuleBook) -> Self {
        let fix = corrective_action(rule);
        Self {
            name: rule.as_str(),
            description: book.describe(rule),
            action: fix.action,
            method: fix.method,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GenerateContext {
    #[serde(flatten)]
    targets: Targets,
    liked: String,
    location: String,
    month: String,
    max_minutes: u32,
    requirements: Vec<String>,
}

impl GenerateContext {
    /// `today` sets the season; callers pass `Local::now().date_naive()`
    pub fn new(prefs: &UserPreferences, book: &RuleBook, today: NaiveDate) -> Self {
        debug!(%today, location = %prefs.location, "GenerateContext::new: called");
        let month = today.format("%B").to_string();
        debug!(month = %month, month_number = today.month(), "GenerateContext::new: season");
        Self {
            targets: Targets::from_prefs(prefs),
            liked: prefs.liked_foods.join(", "),
            location: prefs.location.clone(),
            month,
            max_minutes: book.max_minutes,
            requirements: vec![
                format!(
                    "Contain {} main ingredients or less (excluding oils, salt, pepper and basic seasonings)",
                    book.max_ingredients
                ),
                format!(
                    "Meet the calorie and protein targets within {}%",
                    (book.tolerance * 100.0).round()
                ),
                "Use simple techniques and only basic kitchen equipment".to_string(),
                "Focus on readily available seasonal ingredients".to_string(),
                format!("Be completable within {} minutes", book.max_minutes),
                "Avoid all listed allergens and ingredients".to_string(),
                "Give every ingredient its calories, protein and flavor profile".to_string(),
                "Use everyday measurements and clear, encouraging instructions".to_string(),
            ],
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ValidateContext {
    #[serde(flatten)]
    targets: Targets,
    rules: Vec<RuleLine>,
    recipe: String,
}

impl ValidateContext {
    pub fn new(recipe: &Recipe, prefs: &UserPreferences, book: &RuleBook) -> Self {
        debug!(recipe = %recipe.name, "ValidateContext::new: called");
        Self {
            targets: Targets::from_prefs(prefs),
            rules: Rule::ALL.into_iter().map(|r| RuleLine::new(r, book)).collect(),
            recipe: recipe_json(recipe),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EditContext {
    #[serde(flatten)]
    targets: Targets,
    failures: Vec<RuleLine>,
    tolerance_pct: String,
    max_ingredients: usize,
    max_minutes: u32,
    recipe: String,
}

impl EditContext {
    pub fn new(recipe: &Recipe, failures: &[Rule], prefs: &UserPreferences, book: &RuleBook) -> Self {
        debug!(recipe = %recipe.name, failures = failures.len(), "EditContext::new: called");
        Self {
            targets: Targets::from_prefs(prefs),
            failures: failures.iter().map(|r| RuleLine::new(*r, book)).collect(),
            tolerance_pct: format_number((book.tolerance * 100.0).round()),
            max_ingredients: book.max_ingredients,
            max_minutes: book.max_minutes,
            recipe: recipe_json(recipe),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ShopContext {
    departments: Vec<&'static str>,
    recipe: String,
}

impl ShopContext {
    pub fn new(recipe: &Recipe) -> Self {
        debug!(recipe = %recipe.name, "ShopContext::new: called");
        Self {
            departments: DEPARTMENTS.to_vec(),
            recipe: recipe_json(recipe),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(500.0), "500");
        assert_eq!(format_number(22.5), "22.5");
    }

    #[test]
    fn test_generate_context_month() {
        let prefs = UserPreferences {
            location: "California".to_string(),
            ..Default::default()
        };
        let date = NaiveDate::from_ymd_opt(2024, 12, 7).unwrap();
        let ctx = GenerateContext::new(&prefs, &RuleBook::default(), date);
        assert_eq!(ctx.month, "December");
        assert_eq!(ctx.location, "California");
        assert_eq!(ctx.max_minutes, 20);
    }

    #[test]
    fn test_edit_context_lists_only_failures() {
        let ctx = EditContext::new(
            &Recipe::default(),
            &[Rule::AllergenSafety],
            &UserPreferences::default(),
            &RuleBook::default(),
        );
        assert_eq!(ctx.failures.len(), 1);
        assert_eq!(ctx.failures[0].name, "allergenSafetyRule");
        assert_eq!(ctx.tolerance_pct, "15");
    }

    #[test]
    fn test_targets_flatten() {
        let prefs = UserPreferences {
            calories_per_meal: 500.0,
            allergens: vec!["peanuts".to_string(), "tree nuts".to_string()],
            ..Default::default()
        };
        let ctx = ValidateContext::new(&Recipe::default(), &prefs, &RuleBook::default());
        let json = serde_json::to_value(&ctx).unwrap();
        assert_eq!(json["calories"], "500");
        assert_eq!(json["allergens"], "peanuts, tree nuts");
        assert_eq!(json["rules"].as_array().unwrap().len(), 7);
    }
}
