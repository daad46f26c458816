//! Shopping list grouped by store department

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::flexible_string;

/// Departments the shop prompt asks the model to group by
pub const DEPARTMENTS: &[&str] = &[
    "Produce",
    "Meat and Seafood",
    "Dairy and Eggs",
    "Bakery",
    "Pantry/Dry Goods",
    "Frozen Foods",
    "Canned Goods",
    "Condiments and Spices",
    "Beverages",
];

/// One line on the shopping list
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShoppingItem {
    pub item: String,

    #[serde(default, deserialize_with = "flexible_string")]
    pub quantity: String,

    #[serde(default, deserialize_with = "flexible_string")]
    pub unit: String,
}

/// Department name -> ordered items
///
/// Departments iterate in name order; items keep the order the model gave.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShoppingList(pub BTreeMap<String, Vec<ShoppingItem>>);

impl ShoppingList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.values().all(|items| items.is_empty())
    }

    /// Total number of items across every department
    pub fn item_count(&self) -> usize {
        self.0.values().map(Vec::len).sum()
    }

    /// Append items to a department, creating it if needed
    pub fn extend_department(&mut self, department: impl Into<String>, items: Vec<ShoppingItem>) {
        self.0.entry(department.into()).or_default().extend(items);
    }

    pub fn departments(&self) -> impl Iterator<Item = (&String, &Vec<ShoppingItem>)> {
        self.0.iter()
    }
}
