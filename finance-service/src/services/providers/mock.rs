//! Canned completion provider for tests.

use super::{CompletionProvider, CompletionRequest, CompletionResponse, ProviderError};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Replies with a fixed message content (or a fixed error) and records the
/// prompts it was sent.
pub struct MockCompletionProvider {
    reply: Result<Option<String>, String>,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl MockCompletionProvider {
    pub fn replying(content: impl Into<String>) -> Self {
        Self::with_reply(Ok(Some(content.into())))
    }

    /// A model that returns a choice with no message content.
    pub fn empty() -> Self {
        Self::with_reply(Ok(None))
    }

    pub fn failing(message: impl Into<String>) -> Self {
        Self::with_reply(Err(message.into()))
    }

    fn with_reply(reply: Result<Option<String>, String>) -> Self {
        Self {
            reply,
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.prompts.lock().ok().and_then(|p| p.last().cloned())
    }
}

#[async_trait]
impl CompletionProvider for MockCompletionProvider {
    async fn complete(
        &self,
        request: &CompletionRequest,
    ) -> Result<CompletionResponse, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(request.prompt.clone());
        }

        match &self.reply {
            Ok(text) => Ok(CompletionResponse {
                text: text.clone(),
                input_tokens: (request.prompt.len() / 4) as u32,
                output_tokens: text.as_ref().map(|t| t.len() / 4).unwrap_or(0) as u32,
            }),
            Err(message) => Err(ProviderError::ApiError(message.clone())),
        }
    }

    fn model(&self) -> &str {
        "mock"
    }
}
