//! Completion request/response types and the OpenAI-compatible wire shapes
//! they map to.

use serde::{Deserialize, Serialize};

// =============================================================================
// Public request/response
// =============================================================================

/// How far back the search backend may look.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecencyFilter {
    Hour,
    Day,
    Week,
    Month,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompletionOptions {
    pub model: String,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub search_recency_filter: Option<RecencyFilter>,
    /// Restrict search to these domains. Empty means unrestricted.
    pub search_domain_filter: Vec<String>,
    /// Mark the system prompt as a cacheable prefix.
    pub cache_system_prompt: bool,
}

impl CompletionOptions {
    #[must_use]
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            max_tokens: None,
            temperature: None,
            search_recency_filter: None,
            search_domain_filter: Vec::new(),
            cache_system_prompt: false,
        }
    }

    #[must_use]
    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    #[must_use]
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    #[must_use]
    pub fn recency(mut self, filter: RecencyFilter) -> Self {
        self.search_recency_filter = Some(filter);
        self
    }

    #[must_use]
    pub fn domains(mut self, domains: Vec<String>) -> Self {
        self.search_domain_filter = domains;
        self
    }

    #[must_use]
    pub fn cache_system_prompt(mut self) -> Self {
        self.cache_system_prompt = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub system: String,
    pub user: String,
    pub options: CompletionOptions,
}

/// Token counts for one call, or summed over a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Usage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    /// Prompt tokens served from the provider's prefix cache.
    pub cached_tokens: u64,
}

impl Usage {
    pub fn add(&mut self, other: Usage) {
        self.prompt_tokens += other.prompt_tokens;
        self.completion_tokens += other.completion_tokens;
        self.cached_tokens += other.cached_tokens;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub text: String,
    pub usage: Usage,
    pub cache_hit: bool,
    /// Source URLs the search backend cited, in the order returned.
    pub citations: Vec<String>,
}

// =============================================================================
// Wire format
// =============================================================================

#[derive(Debug, Serialize)]
pub(crate) struct ChatBody<'a> {
    pub model: &'a str,
    pub messages: Vec<WireMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_recency_filter: Option<RecencyFilter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_domain_filter: Option<&'a [String]>,
}

impl<'a> ChatBody<'a> {
    pub(crate) fn from_request(request: &'a CompletionRequest) -> Self {
        let options = &request.options;
        let system_content = if options.cache_system_prompt {
            WireContent::Parts(vec![ContentPart {
                kind: "text",
                text: &request.system,
                cache_control: Some(CacheControl { kind: "ephemeral" }),
            }])
        } else {
            WireContent::Text(&request.system)
        };

        Self {
            model: &options.model,
            messages: vec![
                WireMessage {
                    role: "system",
                    content: system_content,
                },
                WireMessage {
                    role: "user",
                    content: WireContent::Text(&request.user),
                },
            ],
            max_tokens: options.max_tokens,
            temperature: options.temperature,
            search_recency_filter: options.search_recency_filter,
            search_domain_filter: (!options.search_domain_filter.is_empty())
                .then_some(options.search_domain_filter.as_slice()),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct WireMessage<'a> {
    pub role: &'static str,
    pub content: WireContent<'a>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub(crate) enum WireContent<'a> {
    Text(&'a str),
    Parts(Vec<ContentPart<'a>>),
}

#[derive(Debug, Serialize)]
pub(crate) struct ContentPart<'a> {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_control: Option<CacheControl>,
}

#[derive(Debug, Serialize)]
pub(crate) struct CacheControl {
    #[serde(rename = "type")]
    pub kind: &'static str,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatResponseRaw {
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
    pub usage: Option<RawUsage>,
    #[serde(default)]
    pub citations: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatChoice {
    pub message: ChatMessage,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatMessage {
    pub content: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawUsage {
    #[serde(default)]
    pub prompt_tokens: u64,
    #[serde(default)]
    pub completion_tokens: u64,
    pub prompt_tokens_details: Option<PromptTokensDetails>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PromptTokensDetails {
    #[serde(default)]
    pub cached_tokens: u64,
}

impl From<RawUsage> for Usage {
    fn from(raw: RawUsage) -> Self {
        Self {
            prompt_tokens: raw.prompt_tokens,
            completion_tokens: raw.completion_tokens,
            cached_tokens: raw.prompt_tokens_details.map_or(0, |d| d.cached_tokens),
        }
    }
}
