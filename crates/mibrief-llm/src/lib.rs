//! Completion client for the search-backed LLM used by ingestion.

pub mod client;
pub mod error;
pub(crate) mod retry;
pub mod types;

use async_trait::async_trait;

pub use client::PerplexityClient;
pub use error::LlmError;
pub use types::{Completion, CompletionOptions, CompletionRequest, RecencyFilter, Usage};

/// A chat-completion backend: one system prompt, one user prompt, one answer.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// # Errors
    ///
    /// Returns [`LlmError`] on transport failure, a non-2xx status, an empty
    /// completion, or a malformed body.
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, LlmError>;
}
