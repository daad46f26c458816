//! Prompt Loader
//!
//! Loads prompt templates from files or falls back to embedded defaults.

use std::path::{Path, PathBuf};

use eyre::{Result, eyre};
use handlebars::Handlebars;
use serde::Serialize;
use tracing::{debug, info};

use super::embedded;

/// Loads and renders prompt templates
pub struct PromptLoader {
    hbs: Handlebars<'static>,
    /// Directories searched in order before the embedded fallback
    search_dirs: Vec<PathBuf>,
}

fn engine() -> Handlebars<'static> {
    let mut hbs = Handlebars::new();
    // Prompts carry JSON; HTML escaping would mangle quotes
    hbs.register_escape_fn(handlebars::no_escape);
    hbs
}

impl PromptLoader {
    /// Create a loader rooted at `root`
    ///
    /// Searches `override_dir` (if any), then `root/.mealgraph/prompts`,
    /// then `root/prompts`. Missing directories are skipped.
    pub fn new(root: impl AsRef<Path>, override_dir: Option<PathBuf>) -> Self {
        let root = root.as_ref();
        debug!(?root, ?override_dir, "PromptLoader::new: called");

        let candidates = override_dir
            .into_iter()
            .chain([root.join(".mealgraph/prompts"), root.join("prompts")]);
        let search_dirs: Vec<PathBuf> = candidates
            .filter(|dir| {
                let exists = dir.is_dir();
                debug!(?dir, %exists, "PromptLoader::new: checking directory");
                exists
            })
            .collect();

        Self {
            hbs: engine(),
            search_dirs,
        }
    }

    /// Create a loader that only uses embedded prompts (for testing)
    pub fn embedded_only() -> Self {
        debug!("PromptLoader::embedded_only: called");
        Self {
            hbs: engine(),
            search_dirs: Vec::new(),
        }
    }

    /// Load a template by name, first match in the search chain wins
    fn load_template(&self, name: &str) -> Result<String> {
        debug!(%name, "PromptLoader::load_template: called");
        for dir in &self.search_dirs {
            let path = dir.join(format!("{}.pmt", name));
            if path.exists() {
                debug!(?path, "PromptLoader::load_template: found override");
                return std::fs::read_to_string(&path)
                    .map_err(|e| eyre!("Failed to read prompt {}: {}", path.display(), e));
            }
        }

        if let Some(content) = embedded::get_embedded(name) {
            debug!(%name, "PromptLoader::load_template: using embedded");
            return Ok(content.to_string());
        }

        Err(eyre!("Prompt template not found: {}", name))
    }

    /// Render a template with the given context
    pub fn render<C: Serialize>(&self, template_name: &str, context: &C) -> Result<String> {
        debug!(%template_name, "PromptLoader::render: called");
        let template = self.load_template(template_name)?;
        let rendered = self
            .hbs
            .render_template(&template, context)
            .map_err(|e| eyre!("Failed to render template {}: {}", template_name, e))?;
        info!(template = %template_name, len = rendered.len(), "Rendered prompt");
        Ok(rendered)
    }
}
