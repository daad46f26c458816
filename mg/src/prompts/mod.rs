//! Prompt Template System
//!
//! Loads and renders the `.pmt` templates that drive each stage.
//!
//! Template loading chain:
//! 1. `prompts.dir` from config, when set
//! 2. `.mealgraph/prompts/{name}.pmt` (user override)
//! 3. `prompts/{name}.pmt` (repo default)
//! 4. Embedded fallback in code
//!
//! Templates use Handlebars syntax for variable substitution.

mod context;
pub mod embedded;
mod loader;

pub use context::{EditContext, GenerateContext, RuleLine, ShopContext, ValidateContext};
pub use loader::PromptLoader;
