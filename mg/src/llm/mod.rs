//! Model invocation for mealgraph
//!
//! Stages see the model as an opaque `invoke(prompt) -> text` capability.
//! Providers sit behind the `LlmClient` trait.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

mod anthropic;
pub mod client;
mod error;
mod openai;
mod retry;
mod scripted;
mod types;

pub use anthropic::AnthropicClient;
pub use client::LlmClient;
pub use error::LlmError;
pub use openai::OpenAIClient;
pub use scripted::{ScriptedClient, ScriptedReply};
pub use types::{CompletionRequest, CompletionResponse, Message, Role, StopReason, TokenUsage};

use crate::config::LlmConfig;

/// System prompt shared by every stage; the stage prompt carries the task
pub const SYSTEM_PROMPT: &str = "You are a meal-planning assistant. \
    Follow the instructions exactly and answer with JSON only, without commentary.";

/// Per-call bounds
#[derive(Debug, Clone, Copy)]
pub struct CallLimits {
    pub max_tokens: u32,
    pub timeout: Duration,
}

impl CallLimits {
    pub fn from_config(config: &LlmConfig) -> Self {
        Self {
            max_tokens: config.max_tokens,
            timeout: Duration::from_millis(config.timeout_ms),
        }
    }
}

impl Default for CallLimits {
    fn default() -> Self {
        Self::from_config(&LlmConfig::default())
    }
}

/// Create an LLM client for the configured provider
pub fn create_client(config: &LlmConfig) -> Result<Arc<dyn LlmClient>, LlmError> {
    debug!(provider = %config.provider, model = config.model(), "create_client: called");
    match config.provider.as_str() {
        "anthropic" => Ok(Arc::new(AnthropicClient::from_config(config)?)),
        "openai" => Ok(Arc::new(OpenAIClient::from_config(config)?)),
        other => Err(LlmError::Config(format!(
            "Unknown LLM provider: '{}'. Supported: anthropic, openai",
            other
        ))),
    }
}

/// Send one prompt and return the model's text
///
/// The whole call, retries included, is bounded by `limits.timeout`.
/// An empty completion is an `InvalidResponse`.
pub async fn invoke(client: &dyn LlmClient, prompt: &str, limits: CallLimits) -> Result<String, LlmError> {
    debug!(model = client.model(), prompt_len = prompt.len(), "invoke: called");
    let request = CompletionRequest::single(SYSTEM_PROMPT, prompt, limits.max_tokens);

    let response = tokio::time::timeout(limits.timeout, client.complete(request))
        .await
        .map_err(|_| {
            warn!(timeout_ms = limits.timeout.as_millis() as u64, "invoke: model call timed out");
            LlmError::Timeout(limits.timeout)
        })??;

    if response.stop_reason == StopReason::MaxTokens {
        warn!(max_tokens = limits.max_tokens, "invoke: completion truncated at max tokens");
    }
    debug!(
        input_tokens = response.usage.input_tokens,
        output_tokens = response.usage.output_tokens,
        "invoke: completed"
    );

    match response.content {
        Some(text) if !text.trim().is_empty() => Ok(text),
        _ => Err(LlmError::InvalidResponse("empty completion".to_string())),
    }
}
