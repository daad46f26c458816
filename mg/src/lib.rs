//! mealgraph - LLM-driven meal planning
//!
//! A recipe moves through a small stage graph: it is generated by a model,
//! checked against the user's nutritional and dietary rules, edited once if
//! any rule fails, and finally turned into a shopping list grouped by store
//! department.
//!
//! # Modules
//!
//! - [`domain`] - preferences, recipes, validation results, shopping lists
//! - [`rules`] - deterministic rule evaluator
//! - [`schema`] - parsing model output into tagged stage outputs
//! - [`revision`] - routing between edit and shop
//! - [`graph`] - the checked stage transition table
//! - [`pipeline`] - the orchestrator and its state
//! - [`checkpoint`] - in-memory snapshot store actor
//! - [`events`] - broadcast bus and JSONL logger
//! - [`llm`] - model client trait and providers
//! - [`prompts`] - Handlebars prompt templates
//! - [`config`] - configuration types and loading
//! - [`cli`] - command-line interface

pub mod checkpoint;
pub mod cli;
pub mod config;
pub mod domain;
pub mod events;
pub mod graph;
pub mod llm;
pub mod pipeline;
pub mod prompts;
pub mod revision;
pub mod rules;
pub mod schema;

pub use checkpoint::{CheckpointError, CheckpointStore};
pub use config::{Config, LlmConfig, MalformedPolicy, PipelineConfig, ValidationMode};
pub use domain::{
    Ingredient, Recipe, Rule, RuleStatus, RunId, ShoppingItem, ShoppingList, UserPreferences, ValidationReport,
    ValidationResult,
};
pub use events::{EventBus, PipelineEvent};
pub use graph::{Stage, TransitionTable};
pub use llm::{LlmClient, LlmError, ScriptedClient, create_client};
pub use pipeline::{Pipeline, PipelineError, PipelineState, RunStatus};
pub use revision::{EmptyValidationPolicy, Route};
pub use rules::{DEFAULT_TOLERANCE, RuleBook, evaluate};
pub use schema::StageOutput;
