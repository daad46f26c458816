//! Domain types for mealgraph
//!
//! The data carried between pipeline stages: the user's preferences, the
//! recipe the model produces, the per-rule validation results and the
//! shopping list. Wire names follow the camelCase JSON the prompts ask the
//! model to emit.

mod id;
mod preferences;
mod recipe;
mod shopping;
mod validation;

pub use id::RunId;
pub use preferences::UserPreferences;
pub use recipe::{Ingredient, Recipe};
pub use shopping::{DEPARTMENTS, ShoppingItem, ShoppingList};
pub use validation::{Rule, RuleStatus, ValidationReport, ValidationResult, ValidationSource};

use serde::{Deserialize, Deserializer};

/// Deserialize a free-form quantity that the model may emit as a JSON number
/// or a string ("1/4", "2", 3.5).
pub(crate) fn flexible_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    match value {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        serde_json::Value::Null => Ok(String::new()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number, got {}",
            other
        ))),
    }
}
