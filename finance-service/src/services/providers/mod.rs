//! Chat-completion provider abstraction.
//!
//! The extraction step talks to a language model through this trait so the
//! backend (OpenRouter or any OpenAI-compatible endpoint, or a canned mock)
//! can be swapped without touching the pipeline.

pub mod mock;
pub mod openrouter;

pub use mock::MockCompletionProvider;
pub use openrouter::OpenRouterProvider;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Rate limited")]
    RateLimited,

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),
}

/// A single-turn completion request.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub prompt: String,

    /// Ask the model for a JSON-formatted reply.
    pub json_response: bool,
}

#[derive(Debug, Clone, Default)]
pub struct CompletionResponse {
    /// Message content of the first choice; `None` when the model returned
    /// no choices or an empty message.
    pub text: Option<String>,

    pub input_tokens: u32,

    pub output_tokens: u32,
}

#[async_trait]
pub trait CompletionProvider: Send + Sync {
    async fn complete(&self, request: &CompletionRequest)
        -> Result<CompletionResponse, ProviderError>;

    /// Model identifier, for logs and metrics.
    fn model(&self) -> &str;
}
