//! Recipe and ingredient types

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::flexible_string;

/// One ingredient line of a recipe
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ingredient {
    pub name: String,

    /// Free-form amount ("6", "1/4", "a pinch")
    #[serde(deserialize_with = "flexible_string")]
    pub quantity: String,

    #[serde(default, deserialize_with = "flexible_string")]
    pub unit: String,

    #[serde(default)]
    pub calories: f64,

    #[serde(default)]
    pub protein: f64,

    #[serde(default)]
    pub flavor_profile: String,
}

impl Ingredient {
    /// Create an ingredient with just a name, quantity and unit
    pub fn new(name: impl Into<String>, quantity: impl Into<String>, unit: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            quantity: quantity.into(),
            unit: unit.into(),
            ..Default::default()
        }
    }
}

/// A complete recipe as produced by the generator or the editor
///
/// `Recipe::default()` is the empty sentinel that stands in for a
/// generation whose output could not be parsed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipe {
    pub name: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub tips: String,

    /// Total calories for the meal
    pub calories: f64,

    /// Total protein (grams) for the meal
    pub protein: f64,

    pub ingredients: Vec<Ingredient>,

    /// Free-text total time ("15 minutes", "1 hr 5 min")
    #[serde(deserialize_with = "flexible_string")]
    pub cook_time: String,

    pub instructions: Vec<String>,

    #[serde(default)]
    pub dietary_tags: Vec<String>,

    #[serde(default)]
    pub allergens: Vec<String>,
}

impl Recipe {
    /// True for the sentinel recipe (nothing was generated)
    pub fn is_empty(&self) -> bool {
        self.name.trim().is_empty() && self.ingredients.is_empty()
    }

    /// Check the fields serde cannot enforce
    ///
    /// Returns a reason when the recipe is structurally unusable.
    pub fn shape_problem(&self) -> Option<String> {
        debug!(name = %self.name, ingredients = self.ingredients.len(), "Recipe::shape_problem: called");
        if self.name.trim().is_empty() {
            return Some("recipe has no name".to_string());
        }
        if self.ingredients.is_empty() {
            return Some("recipe has no ingredients".to_string());
        }
        if let Some(idx) = self.ingredients.iter().position(|i| i.name.trim().is_empty()) {
            return Some(format!("ingredient #{} has no name", idx + 1));
        }
        if !self.calories.is_finite() || !self.protein.is_finite() {
            return Some("recipe totals are not finite numbers".to_string());
        }
        None
    }
}
