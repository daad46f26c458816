//! LlmClient trait definition

use async_trait::async_trait;

use super::{CompletionRequest, CompletionResponse, LlmError};

/// Stateless model client - each call is independent
///
/// Pipeline stages hold an `Arc<dyn LlmClient>` and never see which
/// provider is behind it.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Send a single completion request
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError>;

    /// Model identifier, for logs and events
    fn model(&self) -> &str;
}
