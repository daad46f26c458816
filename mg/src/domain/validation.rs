//! Rule identifiers and validation results

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The fixed set of compliance rules, in canonical evaluation order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Rule {
    #[serde(rename = "ingredientCountRule")]
    IngredientCount,
    #[serde(rename = "calorieComplianceRule")]
    CalorieCompliance,
    #[serde(rename = "proteinComplianceRule")]
    ProteinCompliance,
    #[serde(rename = "allergenSafetyRule")]
    AllergenSafety,
    #[serde(rename = "dietaryComplianceRule")]
    DietaryCompliance,
    #[serde(rename = "ingredientRestrictionRule")]
    IngredientRestriction,
    #[serde(rename = "timeManagementRule")]
    TimeManagement,
}

impl Rule {
    /// Every rule, in canonical order
    pub const ALL: [Rule; 7] = [
        Rule::IngredientCount,
        Rule::CalorieCompliance,
        Rule::ProteinCompliance,
        Rule::AllergenSafety,
        Rule::DietaryCompliance,
        Rule::IngredientRestriction,
        Rule::TimeManagement,
    ];

    /// Wire name used in prompts and model output
    pub fn as_str(&self) -> &'static str {
        match self {
            Rule::IngredientCount => "ingredientCountRule",
            Rule::CalorieCompliance => "calorieComplianceRule",
            Rule::ProteinCompliance => "proteinComplianceRule",
            Rule::AllergenSafety => "allergenSafetyRule",
            Rule::DietaryCompliance => "dietaryComplianceRule",
            Rule::IngredientRestriction => "ingredientRestrictionRule",
            Rule::TimeManagement => "timeManagementRule",
        }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Rule {
    type Err = String;

    /// Accepts the wire name case-insensitively, with or without the `Rule` suffix
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        let wanted = wanted.strip_suffix("rule").unwrap_or(wanted.as_str());
        Rule::ALL
            .into_iter()
            .find(|rule| {
                let name = rule.as_str().to_lowercase();
                name.strip_suffix("rule").unwrap_or(name.as_str()) == wanted
            })
            .ok_or_else(|| format!("unknown rule: {}", s))
    }
}

/// Outcome of one rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleStatus {
    Pass,
    Fail,
}

impl RuleStatus {
    pub fn from_bool(passed: bool) -> Self {
        if passed { Self::Pass } else { Self::Fail }
    }

    pub fn is_fail(&self) -> bool {
        matches!(self, Self::Fail)
    }
}

impl fmt::Display for RuleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pass => write!(f, "pass"),
            Self::Fail => write!(f, "fail"),
        }
    }
}

impl FromStr for RuleStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pass" | "passed" | "ok" | "true" => Ok(Self::Pass),
            "fail" | "failed" | "false" => Ok(Self::Fail),
            other => Err(format!("unknown rule status: {}", other)),
        }
    }
}

/// One rule's verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub rule: Rule,
    pub status: RuleStatus,
}

impl ValidationResult {
    pub fn new(rule: Rule, status: RuleStatus) -> Self {
        Self { rule, status }
    }

    pub fn passed(&self) -> bool {
        !self.status.is_fail()
    }
}

/// Where a report came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationSource {
    Local,
    Model,
}

/// A result set tied to the recipe revision it was computed against
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub results: Vec<ValidationResult>,
    pub recipe_revision: u32,
    pub source: ValidationSource,
}

impl ValidationReport {
    pub fn new(results: Vec<ValidationResult>, recipe_revision: u32, source: ValidationSource) -> Self {
        Self {
            results,
            recipe_revision,
            source,
        }
    }

    /// Rules that failed, in report order
    pub fn failures(&self) -> Vec<Rule> {
        self.results.iter().filter(|r| !r.passed()).map(|r| r.rule).collect()
    }

    pub fn all_passed(&self) -> bool {
        !self.results.is_empty() && self.results.iter().all(ValidationResult::passed)
    }

    pub fn status_of(&self, rule: Rule) -> Option<RuleStatus> {
        self.results.iter().find(|r| r.rule == rule).map(|r| r.status)
    }
}
