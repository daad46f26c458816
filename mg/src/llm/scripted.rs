//! Scripted client: replays canned replies in order
//!
//! Used by tests and dry runs in place of a real provider. Every request is
//! recorded so callers can assert on the rendered prompts.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use super::{CompletionRequest, CompletionResponse, LlmClient, LlmError};

/// One canned reply
pub enum ScriptedReply {
    Text(String),
    Error(LlmError),
}

impl From<&str> for ScriptedReply {
    fn from(text: &str) -> Self {
        ScriptedReply::Text(text.to_string())
    }
}

impl From<String> for ScriptedReply {
    fn from(text: String) -> Self {
        ScriptedReply::Text(text)
    }
}

impl From<LlmError> for ScriptedReply {
    fn from(err: LlmError) -> Self {
        ScriptedReply::Error(err)
    }
}

pub struct ScriptedClient {
    replies: Mutex<VecDeque<ScriptedReply>>,
    requests: Mutex<Vec<CompletionRequest>>,
    call_count: AtomicUsize,
    delay: Option<Duration>,
}

impl ScriptedClient {
    pub fn new<I, R>(replies: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<ScriptedReply>,
    {
        let replies: VecDeque<ScriptedReply> = replies.into_iter().map(Into::into).collect();
        debug!(reply_count = replies.len(), "ScriptedClient::new: called");
        Self {
            replies: Mutex::new(replies),
            requests: Mutex::new(Vec::new()),
            call_count: AtomicUsize::new(0),
            delay: None,
        }
    }

    /// Sleep before every reply
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Queue more replies after construction
    pub fn push(&self, reply: impl Into<ScriptedReply>) {
        self.replies.lock().unwrap_or_else(|e| e.into_inner()).push_back(reply.into());
    }

    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    /// User prompts received so far, in call order
    pub fn prompts(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .map(|r| r.prompt().to_string())
            .collect()
    }

    pub fn remaining(&self) -> usize {
        self.replies.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

#[async_trait]
impl LlmClient for ScriptedClient {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let idx = self.call_count.fetch_add(1, Ordering::SeqCst);
        debug!(%idx, "ScriptedClient::complete: called");
        self.requests.lock().unwrap_or_else(|e| e.into_inner()).push(request);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let reply = self.replies.lock().unwrap_or_else(|e| e.into_inner()).pop_front();
        match reply {
            Some(ScriptedReply::Text(text)) => Ok(CompletionResponse::text(text)),
            Some(ScriptedReply::Error(err)) => Err(err),
            None => {
                debug!("ScriptedClient::complete: script exhausted");
                Err(LlmError::InvalidResponse("No more scripted replies".to_string()))
            }
        }
    }

    fn model(&self) -> &str {
        "scripted"
    }
}
