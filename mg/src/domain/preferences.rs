//! User preferences - the immutable input of a pipeline run

use std::path::Path;

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// What the user wants from a meal
///
/// Loaded once per run and never mutated by a stage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserPreferences {
    /// Target calories for one meal
    pub calories_per_meal: f64,

    /// Target protein (grams) for one meal
    pub protein_per_meal: f64,

    /// Allergens that must not appear in any form
    pub allergens: Vec<String>,

    /// Dietary guidelines the recipe must follow (e.g. "vegetarian")
    pub dietary_preferences: Vec<String>,

    /// Foods the user enjoys
    pub liked_foods: Vec<String>,

    /// Foods that must not appear
    pub disliked_foods: Vec<String>,

    /// Region used for seasonal ingredient choice
    pub location: String,
}

impl UserPreferences {
    /// Load preferences from a YAML or JSON file
    ///
    /// JSON is a subset of YAML, so one parser covers both.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!(?path, "UserPreferences::load: called");
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read preferences from {}", path.display()))?;
        let prefs: Self = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse preferences in {}", path.display()))?;
        debug!(
            calories = prefs.calories_per_meal,
            protein = prefs.protein_per_meal,
            allergens = prefs.allergens.len(),
            "UserPreferences::load: parsed"
        );
        Ok(prefs)
    }

    /// Comma-joined allergen list for prompt rendering
    pub fn allergens_joined(&self) -> String {
        self.allergens.join(", ")
    }
}
