//! mealgraph configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::revision::EmptyValidationPolicy;
use crate::rules::DEFAULT_TOLERANCE;

/// Main mealgraph configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// LLM provider configuration
    pub llm: LlmConfig,

    /// Rule thresholds
    pub rules: RulesConfig,

    /// Stage behaviour
    pub pipeline: PipelineConfig,

    /// Prompt template overrides
    pub prompts: PromptsConfig,

    /// Log level used when the CLI does not pass one
    #[serde(rename = "log-level")]
    pub log_level: Option<String>,
}

impl Config {
    /// Validate configuration before use
    ///
    /// Checks thresholds and that the API key environment variable is set.
    /// Call this early in startup to fail fast with clear error messages.
    pub fn validate(&self) -> Result<()> {
        self.rules.validate()?;
        if std::env::var(self.llm.api_key_env()).is_err() {
            return Err(eyre::eyre!(
                "LLM API key not found. Set the {} environment variable.",
                self.llm.api_key_env()
            ));
        }
        Ok(())
    }

    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Project-local config: .mealgraph.yml
        let local_config = PathBuf::from(".mealgraph.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        // User config: ~/.config/mealgraph/mealgraph.yml
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("mealgraph").join("mealgraph.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;
        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;
        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}

/// LLM provider configuration
///
/// `model`, `api-key-env` and `base-url` fall back to the provider's
/// defaults when unset, so `provider: anthropic` alone is a working config.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Provider name: "openai" or "anthropic"
    pub provider: String,

    /// Model identifier
    pub model: Option<String>,

    /// Environment variable containing the API key
    #[serde(rename = "api-key-env")]
    pub api_key_env: Option<String>,

    /// API base URL
    #[serde(rename = "base-url")]
    pub base_url: Option<String>,

    /// Maximum tokens per response
    #[serde(rename = "max-tokens")]
    pub max_tokens: u32,

    /// Per-call timeout in milliseconds
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,
}

/// Built-in settings for a known provider
struct ProviderDefaults {
    model: &'static str,
    api_key_env: &'static str,
    base_url: &'static str,
}

const OPENAI_DEFAULTS: ProviderDefaults = ProviderDefaults {
    model: "gpt-4o-mini",
    api_key_env: "OPENAI_API_KEY",
    base_url: "https://api.openai.com",
};

const ANTHROPIC_DEFAULTS: ProviderDefaults = ProviderDefaults {
    model: "claude-sonnet-4-20250514",
    api_key_env: "ANTHROPIC_API_KEY",
    base_url: "https://api.anthropic.com",
};

impl LlmConfig {
    fn provider_defaults(&self) -> &'static ProviderDefaults {
        match self.provider.as_str() {
            "anthropic" => &ANTHROPIC_DEFAULTS,
            _ => &OPENAI_DEFAULTS,
        }
    }

    /// Model identifier, or the provider's default model
    pub fn model(&self) -> &str {
        self.model.as_deref().unwrap_or(self.provider_defaults().model)
    }

    /// Environment variable holding the API key, or the provider's usual one
    pub fn api_key_env(&self) -> &str {
        self.api_key_env.as_deref().unwrap_or(self.provider_defaults().api_key_env)
    }

    /// API base URL, or the provider's public endpoint
    pub fn base_url(&self) -> &str {
        self.base_url.as_deref().unwrap_or(self.provider_defaults().base_url)
    }

    /// Read the API key from the configured environment variable
    pub fn get_api_key(&self) -> Result<String> {
        let var = self.api_key_env();
        std::env::var(var).context(format!("{} is not set", var))
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: None,
            api_key_env: None,
            base_url: None,
            max_tokens: 4096,
            timeout_ms: 120_000,
        }
    }
}

/// Rule thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RulesConfig {
    /// Allowed relative deviation from calorie and protein targets
    pub tolerance: f64,

    /// Maximum main ingredients (seasonings excluded)
    #[serde(rename = "max-ingredients")]
    pub max_ingredients: usize,

    /// Maximum total preparation and cooking time
    #[serde(rename = "max-minutes")]
    pub max_minutes: u32,

    /// Ingredient phrases that do not count towards the ingredient limit
    pub seasonings: Vec<String>,
}

impl RulesConfig {
    pub fn validate(&self) -> Result<()> {
        if !(0.0..1.0).contains(&self.tolerance) {
            return Err(eyre::eyre!("rules.tolerance must be in [0, 1), got {}", self.tolerance));
        }
        if self.max_ingredients == 0 {
            return Err(eyre::eyre!("rules.max-ingredients must be at least 1"));
        }
        if self.max_minutes == 0 {
            return Err(eyre::eyre!("rules.max-minutes must be at least 1"));
        }
        Ok(())
    }
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_TOLERANCE,
            max_ingredients: 6,
            max_minutes: 20,
            seasonings: default_seasonings(),
        }
    }
}

fn default_seasonings() -> Vec<String> {
    [
        "oil",
        "olive oil",
        "salt",
        "sea salt",
        "kosher salt",
        "pepper",
        "black pepper",
        "white pepper",
        "ground pepper",
        "peppercorns",
        "red pepper flakes",
        "seasoning",
        "spice",
        "cumin",
        "paprika",
        "oregano",
        "thyme",
        "chili powder",
        "garlic powder",
        "onion powder",
        "cinnamon",
        "turmeric",
        "water",
        "cooking spray",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

/// Which component judges the recipe in the validate stage
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationMode {
    /// Deterministic rule evaluator, no model call
    #[default]
    Local,
    /// Ask the model and check its result set for completeness
    Model,
}

/// What a stage does with output it cannot parse
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MalformedPolicy {
    /// Substitute a sentinel value, record the stage as degraded and continue
    #[default]
    Degrade,
    /// Fail the run
    Abort,
}

/// Stage behaviour
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    #[serde(rename = "validation-mode")]
    pub validation_mode: ValidationMode,

    #[serde(rename = "on-malformed")]
    pub on_malformed: MalformedPolicy,

    #[serde(rename = "empty-validation")]
    pub empty_validation: EmptyValidationPolicy,

    /// Re-check the edited recipe with the local evaluator inside the edit stage
    #[serde(rename = "revalidate-after-edit")]
    pub revalidate_after_edit: bool,
}

/// Prompt template overrides
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptsConfig {
    /// Directory searched before the built-in override chain
    pub dir: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.llm.provider, "openai");
        assert_eq!(config.llm.model(), "gpt-4o-mini");
        assert_eq!(config.llm.api_key_env(), "OPENAI_API_KEY");
        assert_eq!(config.llm.base_url(), "https://api.openai.com");
        assert_eq!(config.rules.max_ingredients, 6);
        assert_eq!(config.rules.max_minutes, 20);
        assert_eq!(config.rules.tolerance, DEFAULT_TOLERANCE);
        assert_eq!(config.pipeline.validation_mode, ValidationMode::Local);
        assert_eq!(config.pipeline.on_malformed, MalformedPolicy::Degrade);
        assert_eq!(config.pipeline.empty_validation, EmptyValidationPolicy::Revise);
        assert!(!config.pipeline.revalidate_after_edit);
    }

    #[test]
    fn test_load_explicit_path_kebab_keys() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            "llm:\n  provider: anthropic\n  api-key-env: MY_KEY\n  timeout-ms: 5000\n\
             rules:\n  max-ingredients: 8\n  tolerance: 0.1\n\
             pipeline:\n  validation-mode: model\n  on-malformed: abort\n  empty-validation: proceed\n  revalidate-after-edit: true\n\
             log-level: debug"
        )
        .unwrap();

        let config = Config::load(Some(&file.path().to_path_buf())).unwrap();
        assert_eq!(config.llm.provider, "anthropic");
        assert_eq!(config.llm.api_key_env(), "MY_KEY");
        assert_eq!(config.llm.timeout_ms, 5000);
        assert_eq!(config.llm.model(), "claude-sonnet-4-20250514");
        assert_eq!(config.llm.base_url(), "https://api.anthropic.com");
        assert_eq!(config.rules.max_ingredients, 8);
        assert_eq!(config.rules.max_minutes, 20);
        assert_eq!(config.pipeline.validation_mode, ValidationMode::Model);
        assert_eq!(config.pipeline.on_malformed, MalformedPolicy::Abort);
        assert_eq!(config.pipeline.empty_validation, EmptyValidationPolicy::Proceed);
        assert!(config.pipeline.revalidate_after_edit);
        assert_eq!(config.log_level.as_deref(), Some("debug"));
    }

    #[test]
    fn test_anthropic_provider_defaults() {
        let config: Config = serde_yaml::from_str("llm:\n  provider: anthropic\n").unwrap();
        assert_eq!(config.llm.api_key_env(), "ANTHROPIC_API_KEY");
        assert_eq!(config.llm.base_url(), "https://api.anthropic.com");
        assert_eq!(config.llm.model(), "claude-sonnet-4-20250514");
    }

    #[test]
    fn test_explicit_llm_settings_override_provider_defaults() {
        let config: Config = serde_yaml::from_str(
            "llm:\n  provider: anthropic\n  model: claude-3-5-haiku-latest\n  base-url: http://localhost:8080\n",
        )
        .unwrap();
        assert_eq!(config.llm.model(), "claude-3-5-haiku-latest");
        assert_eq!(config.llm.base_url(), "http://localhost:8080");
        assert_eq!(config.llm.api_key_env(), "ANTHROPIC_API_KEY");
    }

    #[test]
    fn test_load_explicit_missing_file_errors() {
        let path = PathBuf::from("/nonexistent/mealgraph.yml");
        assert!(Config::load(Some(&path)).is_err());
    }

    #[test]
    fn test_rules_validate() {
        let mut rules = RulesConfig::default();
        assert!(rules.validate().is_ok());
        rules.tolerance = 1.5;
        assert!(rules.validate().is_err());
        rules.tolerance = 0.1;
        rules.max_ingredients = 0;
        assert!(rules.validate().is_err());
    }

    #[test]
    #[serial]
    fn test_validate_requires_api_key() {
        let mut config = Config::default();
        config.llm.api_key_env = Some("MEALGRAPH_TEST_KEY_UNSET".to_string());
        // SAFETY: serialised with the other env tests
        unsafe { std::env::remove_var("MEALGRAPH_TEST_KEY_UNSET") };
        assert!(config.validate().is_err());
    }

    #[test]
    #[serial]
    fn test_validate_with_api_key() {
        let mut config = Config::default();
        config.llm.api_key_env = Some("MEALGRAPH_TEST_KEY_SET".to_string());
        // SAFETY: serialised with the other env tests
        unsafe { std::env::set_var("MEALGRAPH_TEST_KEY_SET", "sk-test") };
        assert!(config.validate().is_ok());
        assert_eq!(config.llm.get_api_key().unwrap(), "sk-test");
        unsafe { std::env::remove_var("MEALGRAPH_TEST_KEY_SET") };
    }
}
