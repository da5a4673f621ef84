//! HTTP client for Perplexity's OpenAI-compatible chat completions API.
//!
//! Wraps `reqwest` with bearer auth, search options, prefix-cache hints and
//! retry on transient failures. Non-2xx responses surface as
//! [`LlmError::Api`] with the status and body text.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{header, Client};

use crate::error::LlmError;
use crate::retry::retry_with_backoff;
use crate::types::{ChatBody, ChatResponseRaw, Completion, CompletionRequest, Usage};
use crate::CompletionClient;

const DEFAULT_BASE_URL: &str = "https://api.perplexity.ai";
const DEFAULT_MAX_RETRIES: u32 = 2;
const DEFAULT_BACKOFF_BASE_MS: u64 = 1_000;

/// Client for the Perplexity chat completions API.
///
/// Use [`PerplexityClient::new`] for production or
/// [`PerplexityClient::with_base_url`] to point at a mock server in tests.
pub struct PerplexityClient {
    client: Client,
    api_key: String,
    base_url: String,
    max_retries: u32,
    backoff_base_ms: u64,
}

impl PerplexityClient {
    /// Creates a new client pointed at the production API.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::Http`] if the underlying `reqwest::Client` cannot
    /// be constructed.
    pub fn new(api_key: &str, timeout_secs: u64) -> Result<Self, LlmError> {
        Self::with_base_url(api_key, timeout_secs, DEFAULT_BASE_URL)
    }

    /// Creates a new client with a custom base URL (for testing with wiremock).
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::Http`] if the underlying `reqwest::Client` cannot
    /// be constructed.
    pub fn with_base_url(
        api_key: &str,
        timeout_secs: u64,
        base_url: &str,
    ) -> Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent("mibrief/0.1 (market-intelligence)")
            .build()?;

        Ok(Self {
            client,
            api_key: api_key.to_owned(),
            base_url: base_url.trim_end_matches('/').to_owned(),
            max_retries: DEFAULT_MAX_RETRIES,
            backoff_base_ms: DEFAULT_BACKOFF_BASE_MS,
        })
    }

    /// Overrides the transient-error retry policy.
    #[must_use]
    pub fn with_retry(mut self, max_retries: u32, backoff_base_ms: u64) -> Self {
        self.max_retries = max_retries;
        self.backoff_base_ms = backoff_base_ms;
        self
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    /// One POST, no retry.
    async fn send_once(&self, body: &ChatBody<'_>) -> Result<Completion, LlmError> {
        let response = self
            .client
            .post(self.completions_url())
            .header(header::AUTHORIZATION, format!("Bearer {}", self.api_key))
            .json(body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(LlmError::Api {
                status: status.as_u16(),
                message: text,
            });
        }

        let raw: ChatResponseRaw =
            serde_json::from_str(&text).map_err(|e| LlmError::Deserialize {
                context: format!("chat completion (model={})", body.model),
                source: e,
            })?;

        let content = raw
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or(LlmError::EmptyResponse)?;

        let usage = raw.usage.map(Usage::from).unwrap_or_default();

        Ok(Completion {
            text: content,
            cache_hit: usage.cached_tokens > 0,
            usage,
            citations: raw.citations,
        })
    }
}

#[async_trait]
impl CompletionClient for PerplexityClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, LlmError> {
        let start = Instant::now();
        let body = ChatBody::from_request(request);

        let completion =
            retry_with_backoff(self.max_retries, self.backoff_base_ms, || self.send_once(&body))
                .await?;

        tracing::debug!(
            model = %request.options.model,
            duration_ms = start.elapsed().as_millis(),
            prompt_tokens = completion.usage.prompt_tokens,
            cached_tokens = completion.usage.cached_tokens,
            citations = completion.citations.len(),
            "chat completion"
        );

        Ok(completion)
    }
}
