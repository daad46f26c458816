//! Deterministic rule evaluation

use std::collections::HashMap;

use tracing::debug;

use super::RuleBook;
use super::matching::{contains_phrase, contains_unqualified, is_placeholder, normalize_label, parse_minutes, tokens};
use crate::domain::{Recipe, Rule, RuleStatus, UserPreferences, ValidationResult};

const MEAT: &[&str] = &[
    "chicken", "beef", "pork", "lamb", "turkey", "duck", "bacon", "ham", "sausage", "veal", "steak", "prosciutto",
    "salami", "pepperoni", "chorizo", "venison", "gelatin", "lard",
];

const SEAFOOD: &[&str] = &[
    "fish", "salmon", "tuna", "cod", "tilapia", "halibut", "trout", "anchovy", "sardine", "mackerel", "shrimp",
    "prawn", "crab", "lobster", "scallop", "clam", "mussel", "oyster", "squid", "octopus",
];

const SHELLFISH: &[&str] = &[
    "shellfish", "shrimp", "prawn", "crab", "lobster", "scallop", "clam", "mussel", "oyster",
];

const DAIRY: &[&str] = &[
    "milk", "cheese", "butter", "cream", "yogurt", "ghee", "whey", "parmesan", "mozzarella", "feta", "ricotta",
    "cheddar", "buttermilk",
];

const WHEAT: &[&str] = &[
    "wheat", "flour", "bread", "pasta", "couscous", "semolina", "bulgur", "farro", "spelt", "seitan", "breadcrumb",
    "tortilla", "pita", "crouton", "noodle",
];

const GLUTEN_GRAINS: &[&str] = &["wheat", "barley", "rye", "couscous", "semolina", "bulgur", "farro", "spelt", "seitan"];

const TREE_NUTS: &[&str] = &[
    "tree nut", "almond", "walnut", "cashew", "pecan", "pistachio", "hazelnut", "macadamia", "pine nut",
    "brazil nut",
];

const ANIMAL_PRODUCTS: &[&str] = &["egg", "honey", "mayonnaise"];

const SOY: &[&str] = &["soy", "tofu", "edamame", "tempeh", "miso"];

/// Words that turn a dairy term into a plant-based one
const PLANT_MILKS: &[&str] = &[
    "coconut", "almond", "oat", "soy", "rice", "cashew", "hemp", "pea", "plant based", "vegan", "non dairy",
    "dairy free",
];

/// Spreads and fats named "butter" that contain no dairy
const BUTTER_LOOKALIKES: &[&str] = &[
    "peanut", "nut", "almond", "cashew", "sunflower", "sunflower seed", "cocoa", "cacao", "shea", "apple",
    "pumpkin", "vegan", "plant based", "dairy free",
];

/// Grains and flours that stand in for wheat
const WHEAT_FREE: &[&str] = &[
    "corn", "rice", "almond", "coconut", "chickpea", "cassava", "tapioca", "potato", "lentil", "bean", "glass",
    "konjac", "gluten free",
];

/// Qualifiers that make an ingredient phrase no longer mean the conflicting food
fn exempt_qualifiers(phrase: &str) -> &'static [&'static str] {
    match tokens(phrase).join(" ").as_str() {
        "milk" | "cream" | "yogurt" | "cheese" => PLANT_MILKS,
        "butter" => BUTTER_LOOKALIKES,
        "flour" | "bread" | "pasta" | "noodle" | "tortilla" | "breadcrumb" | "pita" | "crouton" => WHEAT_FREE,
        _ => &[],
    }
}

/// True when an ingredient name contains `phrase` as the food it names
fn names_food(ingredient: &str, phrase: &str) -> bool {
    contains_unqualified(ingredient, phrase, exempt_qualifiers(phrase))
}

/// Ingredient phrases implied by an allergen name
fn allergen_family(allergen: &str) -> Vec<&str> {
    match normalize_label(allergen).as_str() {
        "peanut" | "peanuts" => vec!["peanut"],
        "treenut" | "treenuts" | "nut" | "nuts" => TREE_NUTS.to_vec(),
        "dairy" | "milk" | "lactose" => DAIRY.to_vec(),
        "egg" | "eggs" => vec!["egg", "mayonnaise"],
        "wheat" => WHEAT.to_vec(),
        "gluten" => [WHEAT, GLUTEN_GRAINS].concat(),
        "soy" | "soya" => SOY.to_vec(),
        "shellfish" => SHELLFISH.to_vec(),
        "fish" => SEAFOOD.iter().copied().filter(|s| !SHELLFISH.contains(s)).collect(),
        "sesame" => vec!["sesame", "tahini"],
        _ => vec![],
    }
}

/// Ingredient phrases a diet forbids
fn diet_conflicts(diet: &str) -> Vec<&'static str> {
    match diet {
        "vegetarian" => [MEAT, SEAFOOD].concat(),
        "vegan" | "plantbased" => [MEAT, SEAFOOD, DAIRY, ANIMAL_PRODUCTS].concat(),
        "pescatarian" | "pescetarian" => MEAT.to_vec(),
        "dairyfree" => DAIRY.to_vec(),
        "glutenfree" => GLUTEN_GRAINS.to_vec(),
        _ => vec![],
    }
}

/// Evaluate every rule against the recipe, in canonical order
pub fn evaluate(recipe: &Recipe, prefs: &UserPreferences, book: &RuleBook) -> Vec<ValidationResult> {
    debug!(recipe = %recipe.name, "evaluate: called");
    let results: Vec<ValidationResult> = Rule::ALL
        .into_iter()
        .map(|rule| ValidationResult::new(rule, evaluate_rule(rule, recipe, prefs, book)))
        .collect();
    debug!(
        failed = results.iter().filter(|r| !r.passed()).count(),
        "evaluate: done"
    );
    results
}

/// Evaluate a single rule
pub fn evaluate_rule(rule: Rule, recipe: &Recipe, prefs: &UserPreferences, book: &RuleBook) -> RuleStatus {
    let passed = match rule {
        Rule::IngredientCount => ingredient_count_ok(recipe, book),
        Rule::CalorieCompliance => within_tolerance(recipe.calories, prefs.calories_per_meal, book.tolerance),
        Rule::ProteinCompliance => within_tolerance(recipe.protein, prefs.protein_per_meal, book.tolerance),
        Rule::AllergenSafety => allergen_safe(recipe, prefs),
        Rule::DietaryCompliance => diet_compliant(recipe, prefs),
        Rule::IngredientRestriction => restrictions_respected(recipe, prefs),
        Rule::TimeManagement => time_ok(recipe, book),
    };
    debug!(%rule, passed, "evaluate_rule: result");
    RuleStatus::from_bool(passed)
}

fn ingredient_count_ok(recipe: &Recipe, book: &RuleBook) -> bool {
    let main = recipe
        .ingredients
        .iter()
        .filter(|i| !book.is_seasoning(&i.name))
        .count();
    debug!(main, max = book.max_ingredients, "ingredient_count_ok: counted");
    main <= book.max_ingredients
}

/// `|actual - target| <= tolerance * target`; a non-positive target disables the check
fn within_tolerance(actual: f64, target: f64, tolerance: f64) -> bool {
    if target <= 0.0 {
        return true;
    }
    actual.is_finite() && (actual - target).abs() <= tolerance * target + 1e-9
}

fn allergen_safe(recipe: &Recipe, prefs: &UserPreferences) -> bool {
    prefs.allergens.iter().filter(|a| !is_placeholder(a)).all(|allergen| {
        let mut phrases = allergen_family(allergen);
        phrases.push(allergen.as_str());

        let declared = recipe
            .allergens
            .iter()
            .filter(|d| !is_placeholder(d))
            .any(|d| phrases.iter().any(|p| contains_phrase(d, p) || contains_phrase(p, d)));
        let in_ingredients = recipe
            .ingredients
            .iter()
            .any(|i| phrases.iter().any(|p| names_food(&i.name, p)));

        if declared || in_ingredients {
            debug!(%allergen, declared, in_ingredients, "allergen_safe: allergen present");
            false
        } else {
            true
        }
    })
}

fn diet_compliant(recipe: &Recipe, prefs: &UserPreferences) -> bool {
    let tags: Vec<String> = recipe.dietary_tags.iter().map(|t| normalize_label(t)).collect();
    prefs.dietary_preferences.iter().filter(|d| !is_placeholder(d)).all(|diet| {
        let diet = normalize_label(diet);
        // A vegan recipe satisfies a vegetarian or dairy-free guideline
        let tagged = tags.iter().any(|t| {
            *t == diet || (t == "vegan" && matches!(diet.as_str(), "vegetarian" | "dairyfree" | "pescatarian"))
        });
        let conflict = diet_conflicts(&diet)
            .into_iter()
            .find(|c| recipe.ingredients.iter().any(|i| names_food(&i.name, c)));
        if let Some(c) = conflict {
            debug!(%diet, conflict = c, "diet_compliant: conflicting ingredient");
        }
        tagged && conflict.is_none()
    })
}

fn restrictions_respected(recipe: &Recipe, prefs: &UserPreferences) -> bool {
    prefs
        .disliked_foods
        .iter()
        .filter(|d| !is_placeholder(d))
        .all(|disliked| !recipe.ingredients.iter().any(|i| contains_phrase(&i.name, disliked)))
}

fn time_ok(recipe: &Recipe, book: &RuleBook) -> bool {
    match parse_minutes(&recipe.cook_time) {
        Some(minutes) => minutes <= book.max_minutes,
        None => {
            debug!(cook_time = %recipe.cook_time, "time_ok: unreadable cook time");
            false
        }
    }
}

/// Coverage of a model-produced result set
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Completeness {
    pub missing: Vec<Rule>,
    pub duplicated: Vec<Rule>,
}

impl Completeness {
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty() && self.duplicated.is_empty()
    }
}

/// Check that a result set covers every rule exactly once
pub fn check_completeness(results: &[ValidationResult]) -> Completeness {
    let mut counts: HashMap<Rule, usize> = HashMap::new();
    for r in results {
        *counts.entry(r.rule).or_default() += 1;
    }
    Completeness {
        missing: Rule::ALL.into_iter().filter(|r| !counts.contains_key(r)).collect(),
        duplicated: Rule::ALL
            .into_iter()
            .filter(|r| counts.get(r).is_some_and(|n| *n > 1))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Ingredient;
    use proptest::prelude::*;

    fn prefs() -> UserPreferences {
        UserPreferences {
            calories_per_meal: 500.0,
            protein_per_meal: 20.0,
            allergens: vec!["peanuts".to_string(), "tree nuts".to_string()],
            dietary_preferences: vec!["vegetarian".to_string()],
            liked_foods: vec![],
            disliked_foods: vec!["garlic".to_string(), "onions".to_string()],
            location: "California".to_string(),
        }
    }

    fn toast() -> Recipe {
        Recipe {
            name: "Tomato and White Bean Toast".to_string(),
            calories: 500.0,
            protein: 20.0,
            ingredients: vec![
                Ingredient::new("crusty bread", "2", "slices"),
                Ingredient::new("canned white beans", "15", "oz"),
                Ingredient::new("ripe tomatoes", "2", "medium"),
                Ingredient::new("fresh basil", "1/4", "cup"),
                Ingredient::new("olive oil", "2", "tbsp"),
                Ingredient::new("kosher salt", "1/2", "tsp"),
            ],
            cook_time: "10 minutes".to_string(),
            instructions: vec!["Toast the bread".to_string()],
            dietary_tags: vec!["vegetarian".to_string(), "dairy-free".to_string()],
            allergens: vec!["wheat".to_string()],
            ..Default::default()
        }
    }

    #[test]
    fn test_all_pass() {
        let results = evaluate(&toast(), &prefs(), &RuleBook::default());
        assert_eq!(results.len(), Rule::ALL.len());
        assert!(results.iter().all(|r| r.passed()), "{:?}", results);
    }

    #[test]
    fn test_canonical_order() {
        let results = evaluate(&toast(), &prefs(), &RuleBook::default());
        let rules: Vec<Rule> = results.iter().map(|r| r.rule).collect();
        assert_eq!(rules, Rule::ALL.to_vec());
    }

    #[test]
    fn test_ingredient_count_excludes_seasonings() {
        let mut recipe = toast();
        recipe.ingredients.push(Ingredient::new("black pepper", "1/4", "tsp"));
        recipe.ingredients.push(Ingredient::new("lemon", "1", "whole"));
        recipe.ingredients.push(Ingredient::new("arugula", "1", "cup"));
        // 6 main ingredients plus seasonings
        assert_eq!(
            evaluate_rule(Rule::IngredientCount, &recipe, &prefs(), &RuleBook::default()),
            RuleStatus::Pass
        );

        recipe.ingredients.push(Ingredient::new("cucumber", "1", "whole"));
        assert_eq!(
            evaluate_rule(Rule::IngredientCount, &recipe, &prefs(), &RuleBook::default()),
            RuleStatus::Fail
        );
    }

    #[test]
    fn test_calorie_tolerance_boundaries() {
        let book = RuleBook::default();
        let mut recipe = toast();
        for (calories, expected) in [
            (600.0, RuleStatus::Fail),
            (550.0, RuleStatus::Pass),
            (575.0, RuleStatus::Pass),
            (425.0, RuleStatus::Pass),
            (424.0, RuleStatus::Fail),
        ] {
            recipe.calories = calories;
            assert_eq!(
                evaluate_rule(Rule::CalorieCompliance, &recipe, &prefs(), &book),
                expected,
                "calories {}",
                calories
            );
        }
    }

    #[test]
    fn test_zero_target_disables_nutrition_rule() {
        let mut p = prefs();
        p.protein_per_meal = 0.0;
        let mut recipe = toast();
        recipe.protein = 80.0;
        assert_eq!(
            evaluate_rule(Rule::ProteinCompliance, &recipe, &p, &RuleBook::default()),
            RuleStatus::Pass
        );
    }

    #[test]
    fn test_allergen_in_ingredient_name() {
        let mut recipe = toast();
        recipe.ingredients.push(Ingredient::new("roasted peanuts", "2", "tbsp"));
        assert_eq!(
            evaluate_rule(Rule::AllergenSafety, &recipe, &prefs(), &RuleBook::default()),
            RuleStatus::Fail
        );
    }

    #[test]
    fn test_allergen_family_and_declared() {
        let mut recipe = toast();
        recipe.ingredients.push(Ingredient::new("toasted almonds", "2", "tbsp"));
        assert_eq!(
            evaluate_rule(Rule::AllergenSafety, &recipe, &prefs(), &RuleBook::default()),
            RuleStatus::Fail
        );

        let mut p = prefs();
        p.allergens = vec!["wheat".to_string()];
        assert_eq!(
            evaluate_rule(Rule::AllergenSafety, &toast(), &p, &RuleBook::default()),
            RuleStatus::Fail
        );
    }

    #[test]
    fn test_declared_none_is_ignored() {
        let mut recipe = toast();
        recipe.allergens = vec!["none".to_string()];
        recipe.ingredients[0] = Ingredient::new("corn tortillas", "2", "whole");
        let mut p = prefs();
        p.allergens = vec!["none".to_string(), "sesame".to_string()];
        assert_eq!(
            evaluate_rule(Rule::AllergenSafety, &recipe, &p, &RuleBook::default()),
            RuleStatus::Pass
        );
    }

    #[test]
    fn test_dietary_requires_tag() {
        let mut recipe = toast();
        recipe.dietary_tags = vec!["dairy-free".to_string()];
        assert_eq!(
            evaluate_rule(Rule::DietaryCompliance, &recipe, &prefs(), &RuleBook::default()),
            RuleStatus::Fail
        );
    }

    #[test]
    fn test_dietary_label_normalization_and_vegan_cover() {
        let mut p = prefs();
        p.dietary_preferences = vec!["Dairy Free".to_string()];
        assert_eq!(
            evaluate_rule(Rule::DietaryCompliance, &toast(), &p, &RuleBook::default()),
            RuleStatus::Pass
        );

        let mut recipe = toast();
        recipe.dietary_tags = vec!["Vegan".to_string()];
        assert_eq!(
            evaluate_rule(Rule::DietaryCompliance, &recipe, &prefs(), &RuleBook::default()),
            RuleStatus::Pass
        );
    }

    #[test]
    fn test_dietary_conflicting_ingredient() {
        let mut recipe = toast();
        recipe.ingredients.push(Ingredient::new("chicken thighs", "6", "oz"));
        assert_eq!(
            evaluate_rule(Rule::DietaryCompliance, &recipe, &prefs(), &RuleBook::default()),
            RuleStatus::Fail
        );
    }

    fn with_ingredient(name: &str) -> Recipe {
        let mut recipe = toast();
        recipe.ingredients[0] = Ingredient::new(name, "1", "cup");
        recipe.allergens = vec![];
        recipe.dietary_tags = vec!["vegan".to_string()];
        recipe
    }

    fn only(field: &str, value: &str) -> UserPreferences {
        let mut p = prefs();
        p.allergens = vec![];
        p.dietary_preferences = vec![];
        match field {
            "allergen" => p.allergens = vec![value.to_string()],
            _ => p.dietary_preferences = vec![value.to_string()],
        }
        p
    }

    #[test]
    fn test_plant_milks_and_butters_are_vegan() {
        let vegan = only("diet", "vegan");
        for name in ["coconut milk", "unsweetened almond milk", "oat milk", "peanut butter", "cocoa butter"] {
            assert_eq!(
                evaluate_rule(Rule::DietaryCompliance, &with_ingredient(name), &vegan, &RuleBook::default()),
                RuleStatus::Pass,
                "{name}"
            );
        }
        for name in ["whole milk", "unsalted butter", "heavy cream"] {
            assert_eq!(
                evaluate_rule(Rule::DietaryCompliance, &with_ingredient(name), &vegan, &RuleBook::default()),
                RuleStatus::Fail,
                "{name}"
            );
        }
    }

    #[test]
    fn test_wheat_free_grains_pass_wheat_allergy() {
        let wheat = only("allergen", "wheat");
        for name in ["corn tortillas", "rice noodles", "almond flour", "gluten-free bread", "chickpea pasta"] {
            assert_eq!(
                evaluate_rule(Rule::AllergenSafety, &with_ingredient(name), &wheat, &RuleBook::default()),
                RuleStatus::Pass,
                "{name}"
            );
        }
        for name in ["flour tortillas", "egg noodles", "all-purpose flour", "whole wheat bread"] {
            assert_eq!(
                evaluate_rule(Rule::AllergenSafety, &with_ingredient(name), &wheat, &RuleBook::default()),
                RuleStatus::Fail,
                "{name}"
            );
        }
    }

    #[test]
    fn test_gluten_free_label_is_not_gluten() {
        let gluten = only("allergen", "gluten");
        assert_eq!(
            evaluate_rule(Rule::AllergenSafety, &with_ingredient("gluten-free bread"), &gluten, &RuleBook::default()),
            RuleStatus::Pass
        );
        assert_eq!(
            evaluate_rule(Rule::AllergenSafety, &with_ingredient("pearl barley"), &gluten, &RuleBook::default()),
            RuleStatus::Fail
        );
    }

    #[test]
    fn test_plant_qualifier_keeps_its_own_allergen() {
        let nuts = only("allergen", "tree nuts");
        assert_eq!(
            evaluate_rule(Rule::AllergenSafety, &with_ingredient("almond milk"), &nuts, &RuleBook::default()),
            RuleStatus::Fail
        );
        let peanuts = only("allergen", "peanuts");
        assert_eq!(
            evaluate_rule(Rule::AllergenSafety, &with_ingredient("peanut butter"), &peanuts, &RuleBook::default()),
            RuleStatus::Fail
        );
        let dairy = only("allergen", "Milk");
        assert_eq!(
            evaluate_rule(Rule::AllergenSafety, &with_ingredient("coconut milk"), &dairy, &RuleBook::default()),
            RuleStatus::Pass
        );
    }

    #[test]
    fn test_disliked_ingredient() {
        let mut recipe = toast();
        recipe.ingredients.push(Ingredient::new("red onion", "1/2", "whole"));
        assert_eq!(
            evaluate_rule(Rule::IngredientRestriction, &recipe, &prefs(), &RuleBook::default()),
            RuleStatus::Fail
        );

        // garlic powder is still garlic
        let mut recipe = toast();
        recipe.ingredients.push(Ingredient::new("garlic powder", "1", "tsp"));
        assert_eq!(
            evaluate_rule(Rule::IngredientRestriction, &recipe, &prefs(), &RuleBook::default()),
            RuleStatus::Fail
        );
    }

    #[test]
    fn test_time_rule() {
        let book = RuleBook::default();
        let mut recipe = toast();
        recipe.cook_time = "25 minutes".to_string();
        assert_eq!(evaluate_rule(Rule::TimeManagement, &recipe, &prefs(), &book), RuleStatus::Fail);
        recipe.cook_time = "20 minutes".to_string();
        assert_eq!(evaluate_rule(Rule::TimeManagement, &recipe, &prefs(), &book), RuleStatus::Pass);
        recipe.cook_time = "Total 20 minutes (5 minutes prep, 15 minutes cook)".to_string();
        assert_eq!(evaluate_rule(Rule::TimeManagement, &recipe, &prefs(), &book), RuleStatus::Pass);
        recipe.cook_time = "a little while".to_string();
        assert_eq!(evaluate_rule(Rule::TimeManagement, &recipe, &prefs(), &book), RuleStatus::Fail);
    }

    #[test]
    fn test_completeness() {
        let full = evaluate(&toast(), &prefs(), &RuleBook::default());
        assert!(check_completeness(&full).is_complete());

        let mut partial = full.clone();
        partial.remove(0);
        partial.push(ValidationResult::new(Rule::TimeManagement, RuleStatus::Pass));
        let report = check_completeness(&partial);
        assert_eq!(report.missing, vec![Rule::IngredientCount]);
        assert_eq!(report.duplicated, vec![Rule::TimeManagement]);
        assert!(!report.is_complete());

        assert_eq!(check_completeness(&[]).missing.len(), Rule::ALL.len());
    }

    fn arb_recipe() -> impl Strategy<Value = Recipe> {
        let names = prop::sample::select(vec![
            "chicken breast", "peanuts", "olive oil", "salt", "spinach", "garlic", "tofu", "bread", "rice",
            "black pepper", "almonds", "lentils",
        ]);
        (
            prop::collection::vec(names, 0..12),
            0.0f64..1500.0,
            0.0f64..120.0,
            prop::sample::select(vec!["10 minutes", "45 min", "1 hour", "soon", "20"]),
            prop::collection::vec(prop::sample::select(vec!["vegan", "vegetarian", "gluten-free"]), 0..3),
        )
            .prop_map(|(ings, calories, protein, cook_time, tags)| Recipe {
                name: "generated".to_string(),
                calories,
                protein,
                ingredients: ings.into_iter().map(|n| Ingredient::new(n, "1", "cup")).collect(),
                cook_time: cook_time.to_string(),
                dietary_tags: tags.into_iter().map(String::from).collect(),
                ..Default::default()
            })
    }

    proptest! {
        #[test]
        fn prop_one_result_per_rule(recipe in arb_recipe(), calories in 0.0f64..1000.0) {
            let mut p = prefs();
            p.calories_per_meal = calories;
            let results = evaluate(&recipe, &p, &RuleBook::default());
            prop_assert!(check_completeness(&results).is_complete());
            prop_assert_eq!(results.len(), Rule::ALL.len());
        }

        #[test]
        fn prop_evaluation_is_idempotent(recipe in arb_recipe()) {
            let book = RuleBook::default();
            let first = evaluate(&recipe, &prefs(), &book);
            let second = evaluate(&recipe, &prefs(), &book);
            prop_assert_eq!(first, second);
        }
    }
}
