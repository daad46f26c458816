//! Stage output parsing
//!
//! Turns raw model text into typed stage outputs. Parsing never panics and
//! never guesses silently: anything that cannot be read as the expected
//! shape comes back as `StageOutput::Malformed` with the raw text and a
//! reason, and the pipeline decides what to do with it.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;
use tracing::{debug, warn};

use crate::domain::{Recipe, Rule, RuleStatus, ShoppingItem, ShoppingList, ValidationResult};

static CODE_FENCE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"```(?:json)?").expect("Invalid code fence pattern"));

/// Result of parsing one stage's model output
#[derive(Debug, Clone, PartialEq)]
pub enum StageOutput<T> {
    Parsed(T),
    Malformed { raw: String, reason: String },
}

impl<T> StageOutput<T> {
    fn malformed(raw: &str, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        warn!(%reason, raw_len = raw.len(), "StageOutput: malformed model output");
        StageOutput::Malformed {
            raw: raw.to_string(),
            reason,
        }
    }

    pub fn is_parsed(&self) -> bool {
        matches!(self, StageOutput::Parsed(_))
    }

    pub fn parsed(self) -> Option<T> {
        match self {
            StageOutput::Parsed(v) => Some(v),
            StageOutput::Malformed { .. } => None,
        }
    }
}

/// Validation results as read from the model, before completeness checks
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedValidation {
    pub results: Vec<ValidationResult>,
    /// Rule names the model produced that are not in the fixed set
    pub unrecognised: Vec<String>,
}

/// Remove markdown code fences and surrounding whitespace
pub fn strip_code_fences(raw: &str) -> String {
    CODE_FENCE.replace_all(raw, "").trim().to_string()
}

/// Parse model text as JSON, tolerating fences and prose around the payload
fn parse_json(raw: &str) -> Result<Value, String> {
    let cleaned = strip_code_fences(raw);
    if cleaned.is_empty() {
        return Err("empty output".to_string());
    }
    match serde_json::from_str(&cleaned) {
        Ok(value) => Ok(value),
        Err(first) => {
            // Retry on the outermost object or array
            let start = cleaned.find(['{', '[']);
            let end = cleaned.rfind(['}', ']']);
            match (start, end) {
                (Some(s), Some(e)) if e > s => {
                    debug!(start = s, end = e, "parse_json: retrying on embedded payload");
                    serde_json::from_str(&cleaned[s..=e]).map_err(|_| format!("invalid JSON: {}", first))
                }
                _ => Err(format!("invalid JSON: {}", first)),
            }
        }
    }
}

/// Unwrap `{"<key>": payload}` envelopes the model sometimes adds
fn unwrap_envelope<'a>(value: &'a Value, keys: &[&str]) -> &'a Value {
    if let Value::Object(map) = value {
        for key in keys {
            if let Some(inner) = map.get(*key) {
                debug!(%key, "unwrap_envelope: unwrapped");
                return inner;
            }
        }
    }
    value
}

/// Parse a recipe: an object, or an array whose first element is taken
pub fn parse_recipe(raw: &str) -> StageOutput<Recipe> {
    debug!(raw_len = raw.len(), "parse_recipe: called");
    let value = match parse_json(raw) {
        Ok(v) => v,
        Err(reason) => return StageOutput::malformed(raw, reason),
    };
    let value = unwrap_envelope(&value, &["recipe", "recipes"]);

    let candidate = match value {
        Value::Array(items) => {
            if items.len() > 1 {
                warn!(count = items.len(), "parse_recipe: model returned several recipes, taking the first");
            }
            match items.first() {
                Some(first) => first.clone(),
                None => return StageOutput::malformed(raw, "empty recipe array"),
            }
        }
        Value::Object(_) => value.clone(),
        other => return StageOutput::malformed(raw, format!("expected recipe object, got {}", json_kind(other))),
    };

    let recipe: Recipe = match serde_json::from_value(candidate) {
        Ok(r) => r,
        Err(e) => return StageOutput::malformed(raw, format!("recipe does not match schema: {}", e)),
    };
    if let Some(problem) = recipe.shape_problem() {
        return StageOutput::malformed(raw, problem);
    }
    StageOutput::Parsed(recipe)
}

/// Parse validation results: `[{rule, status}]`, `{rule: status}` or either nested one level
pub fn parse_validation(raw: &str) -> StageOutput<ParsedValidation> {
    debug!(raw_len = raw.len(), "parse_validation: called");
    let value = match parse_json(raw) {
        Ok(v) => v,
        Err(reason) => return StageOutput::malformed(raw, reason),
    };
    let value = unwrap_envelope(&value, &["validationResults", "validationRules", "results"]);

    let mut pairs: Vec<(String, Value)> = Vec::new();
    match value {
        Value::Array(items) => {
            for item in items {
                match item {
                    Value::Object(obj) if obj.contains_key("rule") => {
                        let rule = obj.get("rule").and_then(Value::as_str).unwrap_or_default().to_string();
                        pairs.push((rule, obj.get("status").cloned().unwrap_or(Value::Null)));
                    }
                    // [[{rule, status}...]] and [{rule: status}] shapes
                    Value::Array(inner) => {
                        for entry in inner {
                            if let Value::Object(obj) = entry {
                                let rule = obj.get("rule").and_then(Value::as_str).unwrap_or_default().to_string();
                                pairs.push((rule, obj.get("status").cloned().unwrap_or(Value::Null)));
                            }
                        }
                    }
                    Value::Object(obj) => {
                        pairs.extend(obj.iter().map(|(k, v)| (k.clone(), v.clone())));
                    }
                    other => {
                        return StageOutput::malformed(
                            raw,
                            format!("expected validation entry, got {}", json_kind(other)),
                        );
                    }
                }
            }
        }
        Value::Object(obj) => pairs.extend(obj.iter().map(|(k, v)| (k.clone(), v.clone()))),
        other => {
            return StageOutput::malformed(raw, format!("expected validation results, got {}", json_kind(other)));
        }
    }

    let mut results = Vec::with_capacity(pairs.len());
    let mut unrecognised = Vec::new();
    for (name, status) in pairs {
        let Ok(rule) = name.parse::<Rule>() else {
            unrecognised.push(name);
            continue;
        };
        let status = match status_from_value(&status) {
            Some(s) => s,
            None => return StageOutput::malformed(raw, format!("unreadable status for {}: {}", rule, status)),
        };
        results.push(ValidationResult::new(rule, status));
    }

    StageOutput::Parsed(ParsedValidation { results, unrecognised })
}

fn status_from_value(value: &Value) -> Option<RuleStatus> {
    match value {
        Value::String(s) => s.parse().ok(),
        Value::Bool(b) => Some(RuleStatus::from_bool(*b)),
        Value::Object(obj) => obj.get("status").and_then(status_from_value),
        _ => None,
    }
}

/// Parse a shopping list: a department map, or an array of maps merged in order
pub fn parse_shopping_list(raw: &str) -> StageOutput<ShoppingList> {
    debug!(raw_len = raw.len(), "parse_shopping_list: called");
    let value = match parse_json(raw) {
        Ok(v) => v,
        Err(reason) => return StageOutput::malformed(raw, reason),
    };
    let value = unwrap_envelope(&value, &["shoppingList", "shopping_list"]);

    let maps: Vec<&serde_json::Map<String, Value>> = match value {
        Value::Object(map) => vec![map],
        Value::Array(items) => {
            let mut maps = Vec::with_capacity(items.len());
            for item in items {
                match unwrap_envelope(item, &["shoppingList", "shopping_list"]) {
                    Value::Object(map) => maps.push(map),
                    other => {
                        return StageOutput::malformed(
                            raw,
                            format!("expected department map, got {}", json_kind(other)),
                        );
                    }
                }
            }
            maps
        }
        other => return StageOutput::malformed(raw, format!("expected shopping list, got {}", json_kind(other))),
    };

    let mut list = ShoppingList::new();
    for map in maps {
        for (department, entries) in map {
            // {"Produce": [...]} or {"produce": {"items": [...]}}
            let entries = unwrap_envelope(entries, &["items"]);
            let Value::Array(entries) = entries else {
                return StageOutput::malformed(raw, format!("department {} is not a list", department));
            };
            let mut items = Vec::with_capacity(entries.len());
            for entry in entries {
                match shopping_item(entry) {
                    Some(item) => items.push(item),
                    None => {
                        return StageOutput::malformed(raw, format!("unreadable item in department {}", department));
                    }
                }
            }
            list.extend_department(department.clone(), items);
        }
    }

    if list.is_empty() {
        return StageOutput::malformed(raw, "shopping list has no items");
    }
    StageOutput::Parsed(list)
}

fn shopping_item(entry: &Value) -> Option<ShoppingItem> {
    let obj = entry.as_object()?;
    let item = obj.get("item").or_else(|| obj.get("name")).and_then(Value::as_str)?.to_string();
    if item.trim().is_empty() {
        return None;
    }

    // quantity may be "2", 2, or {"amount": 2, "unit": "cups"}
    let (quantity, nested_unit) = match obj.get("quantity") {
        Some(Value::Object(q)) => (
            q.get("amount").map(scalar_string).unwrap_or_default(),
            q.get("unit").map(scalar_string),
        ),
        Some(v) => (scalar_string(v), None),
        None => (String::new(), None),
    };
    let unit = obj.get("unit").map(scalar_string).or(nested_unit).unwrap_or_default();

    Some(ShoppingItem { item, quantity, unit })
}

fn scalar_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
