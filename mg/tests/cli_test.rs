//! CLI tests for the `mg` binary
//!
//! Only commands that never reach a model are exercised here.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// `mg` isolated from the user's config and log directories
fn mg(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("mg").expect("mg binary should build");
    cmd.current_dir(home.path())
        .env("HOME", home.path())
        .env("XDG_CONFIG_HOME", home.path().join("config"))
        .env("XDG_DATA_HOME", home.path().join("data"))
        .env_remove("RUST_LOG");
    cmd
}

const PREFS: &str = r#"
caloriesPerMeal: 450
proteinPerMeal: 25
allergens: [peanuts]
dietaryPreferences: [vegetarian]
likedFoods: [tomatoes]
dislikedFoods: [mushrooms]
location: Texas
"#;

const GOOD_RECIPE: &str = r#"{
  "name": "Tomato White Bean Skillet",
  "calories": 470,
  "protein": 24,
  "ingredients": [
    {"name": "white beans", "quantity": "1", "unit": "can"},
    {"name": "cherry tomatoes", "quantity": "2", "unit": "cups"},
    {"name": "spinach", "quantity": "2", "unit": "cups"},
    {"name": "olive oil", "quantity": "1", "unit": "tbsp"},
    {"name": "salt", "quantity": "1", "unit": "pinch"}
  ],
  "cookTime": "15 minutes",
  "instructions": ["Blister the tomatoes", "Add beans and spinach"],
  "dietaryTags": ["vegetarian"]
}"#;

fn write_inputs(home: &TempDir, recipe: &str) {
    std::fs::write(home.path().join("prefs.yml"), PREFS).unwrap();
    std::fs::write(home.path().join("recipe.json"), recipe).unwrap();
}

#[test]
fn test_rules_lists_every_rule() {
    let home = TempDir::new().unwrap();
    mg(&home)
        .arg("rules")
        .assert()
        .success()
        .stdout(predicate::str::contains("ingredientCountRule"))
        .stdout(predicate::str::contains("timeManagementRule"))
        .stdout(predicate::str::contains("20 minutes or less"));
}

#[test]
fn test_rules_reflects_config() {
    let home = TempDir::new().unwrap();
    std::fs::write(
        home.path().join(".mealgraph.yml"),
        "rules:\n  max-minutes: 45\n  tolerance: 0.1\n",
    )
    .unwrap();
    mg(&home)
        .arg("rules")
        .assert()
        .success()
        .stdout(predicate::str::contains("45 minutes or less"))
        .stdout(predicate::str::contains("±10%"));
}

#[test]
fn test_check_passing_recipe_json() {
    let home = TempDir::new().unwrap();
    write_inputs(&home, GOOD_RECIPE);
    let output = mg(&home)
        .args(["check", "--prefs", "prefs.yml", "--recipe", "recipe.json", "--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let results = report["results"].as_array().unwrap();
    assert_eq!(results.len(), 7);
    assert!(results.iter().all(|r| r["status"] == "pass"));
    assert_eq!(report["source"], "local");
}

#[test]
fn test_check_reports_failures() {
    let home = TempDir::new().unwrap();
    let with_peanuts = GOOD_RECIPE.replace("white beans", "roasted peanuts");
    write_inputs(&home, &with_peanuts);
    mg(&home)
        .args(["check", "-p", "prefs.yml", "-r", "recipe.json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("FAIL"))
        .stdout(predicate::str::contains("allergenSafetyRule"));
}

#[test]
fn test_check_rejects_unusable_recipe() {
    let home = TempDir::new().unwrap();
    write_inputs(&home, r#"{"name": "Nothing", "ingredients": []}"#);
    mg(&home)
        .args(["check", "-p", "prefs.yml", "-r", "recipe.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not usable"));
}

#[test]
fn test_run_requires_api_key() {
    let home = TempDir::new().unwrap();
    write_inputs(&home, GOOD_RECIPE);
    mg(&home)
        .env_remove("OPENAI_API_KEY")
        .args(["run", "--prefs", "prefs.yml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("OPENAI_API_KEY"));
}

#[test]
fn test_unknown_format_rejected() {
    let home = TempDir::new().unwrap();
    mg(&home)
        .args(["check", "-p", "a", "-r", "b", "--format", "table"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown format"));
}
