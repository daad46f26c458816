//! The four stage bodies and the helpers they share

use chrono::Local;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::{MalformedPolicy, ValidationMode};
use crate::domain::{Recipe, Rule, ShoppingList, ValidationReport, ValidationSource};
use crate::events::PipelineEvent;
use crate::graph::Stage;
use crate::llm;
use crate::prompts::{EditContext, GenerateContext, ShopContext, ValidateContext};
use crate::revision::RevisionPhase;
use crate::rules::{check_completeness, evaluate};
use crate::schema::{self, StageOutput};

use super::{Pipeline, PipelineError, PipelineState};

impl Pipeline {
    pub(super) async fn generate(&self, state: &mut PipelineState) -> Result<(), PipelineError> {
        debug!(run_id = %state.run_id, "generate: called");
        let today = self.today.unwrap_or_else(|| Local::now().date_naive());
        let ctx = GenerateContext::new(&state.prefs, &self.rules, today);
        let prompt = self.render(Stage::Generate, &ctx)?;
        let raw = self.call(Stage::Generate, &prompt).await?;

        let recipe = match schema::parse_recipe(&raw) {
            StageOutput::Parsed(recipe) => recipe,
            StageOutput::Malformed { raw, reason } => {
                self.degrade(state, Stage::Generate, reason, &raw)?;
                Recipe::default()
            }
        };

        info!(
            run_id = %state.run_id,
            recipe = %recipe.name,
            ingredients = recipe.ingredients.len(),
            "Recipe generated"
        );
        self.emit(PipelineEvent::RecipeGenerated {
            run_id: state.run_id.clone(),
            recipe: recipe.name.clone(),
            ingredients: recipe.ingredients.len(),
        });
        state.recipe = recipe;
        state.recipe_revision = 0;
        state.enter_phase(RevisionPhase::Generated)
    }

    pub(super) async fn validate(&self, state: &mut PipelineState) -> Result<(), PipelineError> {
        debug!(run_id = %state.run_id, mode = ?self.settings.validation_mode, "validate: called");
        let revision = state.recipe_revision;

        let report = if state.recipe.is_empty() {
            self.skip(state, Stage::Validate, "no recipe to validate");
            let source = match self.settings.validation_mode {
                ValidationMode::Local => ValidationSource::Local,
                ValidationMode::Model => ValidationSource::Model,
            };
            ValidationReport::new(Vec::new(), revision, source)
        } else {
            match self.settings.validation_mode {
                ValidationMode::Local => ValidationReport::new(
                    evaluate(&state.recipe, &state.prefs, &self.rules),
                    revision,
                    ValidationSource::Local,
                ),
                ValidationMode::Model => self.validate_with_model(state).await?,
            }
        };

        let failed = report.failures();
        info!(
            run_id = %state.run_id,
            results = report.results.len(),
            failed = failed.len(),
            source = ?report.source,
            "Recipe validated"
        );
        self.emit(PipelineEvent::RecipeValidated {
            run_id: state.run_id.clone(),
            recipe_revision: revision,
            failed,
        });
        state.validation = Some(report);
        state.enter_phase(RevisionPhase::Validated)
    }

    async fn validate_with_model(&self, state: &mut PipelineState) -> Result<ValidationReport, PipelineError> {
        let ctx = ValidateContext::new(&state.recipe, &state.prefs, &self.rules);
        let prompt = self.render(Stage::Validate, &ctx)?;
        let raw = self.call(Stage::Validate, &prompt).await?;

        let results = match schema::parse_validation(&raw) {
            StageOutput::Parsed(parsed) if parsed.results.is_empty() && parsed.unrecognised.is_empty() => {
                // Routed by the empty-validation policy
                warn!(run_id = %state.run_id, "Validator returned no results");
                Vec::new()
            }
            StageOutput::Parsed(parsed) => {
                let coverage = check_completeness(&parsed.results);
                if !coverage.is_complete() || !parsed.unrecognised.is_empty() {
                    return Err(PipelineError::IncompleteValidation {
                        missing: coverage.missing,
                        duplicated: coverage.duplicated,
                        unrecognised: parsed.unrecognised,
                    });
                }
                parsed.results
            }
            StageOutput::Malformed { raw, reason } => {
                self.degrade(state, Stage::Validate, reason, &raw)?;
                Vec::new()
            }
        };
        Ok(ValidationReport::new(results, state.recipe_revision, ValidationSource::Model))
    }

    pub(super) async fn edit(&self, state: &mut PipelineState) -> Result<(), PipelineError> {
        debug!(run_id = %state.run_id, revision = state.recipe_revision, "edit: called");
        let failures = state.validation.as_ref().map(|r| r.failures()).unwrap_or_default();
        // An empty report only gets here under the revise policy: review every rule
        let addressed = if failures.is_empty() { Rule::ALL.to_vec() } else { failures };

        if state.recipe.is_empty() {
            self.skip(state, Stage::Edit, "no recipe to edit");
        } else {
            let ctx = EditContext::new(&state.recipe, &addressed, &state.prefs, &self.rules);
            let prompt = self.render(Stage::Edit, &ctx)?;
            let raw = self.call(Stage::Edit, &prompt).await?;
            match schema::parse_recipe(&raw) {
                StageOutput::Parsed(edited) => state.replace_recipe(edited),
                // The unedited recipe stays in place
                StageOutput::Malformed { raw, reason } => self.degrade(state, Stage::Edit, reason, &raw)?,
            }
        }
        state.enter_phase(RevisionPhase::Edited)?;

        if state.draft.is_none() {
            return Ok(());
        }
        info!(
            run_id = %state.run_id,
            recipe = %state.recipe.name,
            revision = state.recipe_revision,
            addressed = addressed.len(),
            "Recipe edited"
        );
        self.emit(PipelineEvent::RecipeEdited {
            run_id: state.run_id.clone(),
            recipe: state.recipe.name.clone(),
            recipe_revision: state.recipe_revision,
            addressed,
        });

        if self.settings.revalidate_after_edit {
            let report = ValidationReport::new(
                evaluate(&state.recipe, &state.prefs, &self.rules),
                state.recipe_revision,
                ValidationSource::Local,
            );
            let failed = report.failures();
            if !failed.is_empty() {
                warn!(run_id = %state.run_id, ?failed, "Edited recipe still fails rules");
            }
            self.emit(PipelineEvent::RecipeValidated {
                run_id: state.run_id.clone(),
                recipe_revision: state.recipe_revision,
                failed,
            });
            state.validation = Some(report);
        }
        Ok(())
    }

    pub(super) async fn shop(&self, state: &mut PipelineState) -> Result<(), PipelineError> {
        debug!(run_id = %state.run_id, recipe = %state.recipe.name, "shop: called");
        if state.recipe.is_empty() {
            self.skip(state, Stage::Shop, "no recipe to shop for");
            return Ok(());
        }

        let ctx = ShopContext::new(&state.recipe);
        let prompt = self.render(Stage::Shop, &ctx)?;
        let raw = self.call(Stage::Shop, &prompt).await?;
        let list = match schema::parse_shopping_list(&raw) {
            StageOutput::Parsed(list) => list,
            StageOutput::Malformed { raw, reason } => {
                self.degrade(state, Stage::Shop, reason, &raw)?;
                ShoppingList::new()
            }
        };

        info!(
            run_id = %state.run_id,
            departments = list.0.len(),
            items = list.item_count(),
            "Shopping list ready"
        );
        self.emit(PipelineEvent::ShoppingListReady {
            run_id: state.run_id.clone(),
            departments: list.0.len(),
            items: list.item_count(),
        });
        state.shopping_list = list;
        Ok(())
    }

    /// Render the template named after `stage`
    fn render<C: Serialize>(&self, stage: Stage, ctx: &C) -> Result<String, PipelineError> {
        self.prompts
            .render(stage.as_str(), ctx)
            .map_err(|e| PipelineError::Prompt {
                stage,
                message: e.to_string(),
            })
    }

    async fn call(&self, stage: Stage, prompt: &str) -> Result<String, PipelineError> {
        debug!(%stage, prompt_len = prompt.len(), "call: called");
        llm::invoke(self.client.as_ref(), prompt, self.limits)
            .await
            .map_err(|source| {
                warn!(%stage, error = %source, retryable = source.is_retryable(), "Model call failed");
                PipelineError::Model { stage, source }
            })
    }

    /// Apply the malformed-output policy
    fn degrade(&self, state: &mut PipelineState, stage: Stage, reason: String, raw: &str) -> Result<(), PipelineError> {
        match self.settings.on_malformed {
            MalformedPolicy::Abort => Err(PipelineError::Malformed { stage, reason }),
            MalformedPolicy::Degrade => {
                warn!(run_id = %state.run_id, %stage, %reason, "Stage output malformed, continuing degraded");
                self.emit(PipelineEvent::StageDegraded {
                    run_id: state.run_id.clone(),
                    stage,
                    reason: reason.clone(),
                });
                state.record_degraded(stage, reason, raw);
                Ok(())
            }
        }
    }

    /// Record a stage that had nothing to work on
    fn skip(&self, state: &mut PipelineState, stage: Stage, reason: &str) {
        warn!(run_id = %state.run_id, %stage, %reason, "Skipping stage");
        self.emit(PipelineEvent::StageDegraded {
            run_id: state.run_id.clone(),
            stage,
            reason: reason.to_string(),
        });
        state.record_degraded(stage, reason, "");
    }
}
