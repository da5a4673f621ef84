use std::time::Duration;

use serde::Serialize;
use uuid::Uuid;

use mibrief_core::{AppConfig, CardType, Pillar};
use mibrief_db::RunCounts;
use mibrief_llm::Usage;

const SEARCH_MAX_TOKENS: u32 = 1500;
const SUMMARY_MAX_TOKENS: u32 = 1200;
const SUMMARY_TEMPERATURE: f32 = 0.3;

/// Knobs for one ingestion run.
#[derive(Debug, Clone)]
pub struct IngestConfig {
    pub search_model: String,
    pub summary_model: String,
    pub search_max_tokens: u32,
    pub summary_max_tokens: u32,
    pub summary_temperature: f32,
    /// Budget for the whole fetch-to-persist sequence of one slot.
    pub slot_timeout: Duration,
}

impl IngestConfig {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            search_model: config.search_model.clone(),
            summary_model: config.summary_model.clone(),
            search_max_tokens: SEARCH_MAX_TOKENS,
            summary_max_tokens: SUMMARY_MAX_TOKENS,
            summary_temperature: SUMMARY_TEMPERATURE,
            slot_timeout: Duration::from_secs(config.slot_timeout_secs),
        }
    }
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            search_model: "sonar-pro".to_string(),
            summary_model: "sonar".to_string(),
            search_max_tokens: SEARCH_MAX_TOKENS,
            summary_max_tokens: SUMMARY_MAX_TOKENS,
            summary_temperature: SUMMARY_TEMPERATURE,
            slot_timeout: Duration::from_secs(180),
        }
    }
}

/// A slot that produced neither a card nor a rejection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotFailure {
    pub pillar: Pillar,
    pub card_type: CardType,
    pub reason: String,
}

/// Outcome of one ingestion run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub slots_attempted: u32,
    pub cards_stored: u32,
    pub rejected_validation: u32,
    pub rejected_duplicate: u32,
    pub failed: u32,
    pub usage: Usage,
    pub llm_calls: u32,
    pub cache_hits: u32,
    pub caching_effective: bool,
    /// Primary topics of the stored cards, in the order they were covered.
    pub topics: Vec<String>,
    pub card_ids: Vec<Uuid>,
    pub failures: Vec<SlotFailure>,
}

impl RunSummary {
    /// Counts as recorded in the run ledger.
    #[must_use]
    pub fn run_counts(&self) -> RunCounts {
        let count = |n: u32| i32::try_from(n).unwrap_or(i32::MAX);
        RunCounts {
            slots_attempted: count(self.slots_attempted),
            cards_stored: count(self.cards_stored),
            rejected_validation: count(self.rejected_validation),
            rejected_duplicate: count(self.rejected_duplicate),
            failed: count(self.failed),
            usage: serde_json::json!({
                "promptTokens": self.usage.prompt_tokens,
                "completionTokens": self.usage.completion_tokens,
                "cachedTokens": self.usage.cached_tokens,
                "llmCalls": self.llm_calls,
                "cacheHits": self.cache_hits,
                "cachingEffective": self.caching_effective,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_counts_carry_usage() {
        let summary = RunSummary {
            slots_attempted: 9,
            cards_stored: 6,
            rejected_validation: 1,
            rejected_duplicate: 1,
            failed: 1,
            usage: Usage {
                prompt_tokens: 10,
                completion_tokens: 5,
                cached_tokens: 2,
            },
            llm_calls: 17,
            cache_hits: 7,
            caching_effective: true,
            ..RunSummary::default()
        };
        let counts = summary.run_counts();
        assert_eq!(counts.slots_attempted, 9);
        assert_eq!(counts.cards_stored, 6);
        assert_eq!(counts.failed, 1);
        assert_eq!(counts.usage["cachedTokens"], 2);
        assert_eq!(counts.usage["llmCalls"], 17);
        assert_eq!(counts.usage["cachingEffective"], true);
    }

    #[test]
    fn summary_serializes_camel_case() {
        let value = serde_json::to_value(RunSummary::default()).expect("serialize");
        assert!(value.get("slotsAttempted").is_some());
        assert!(value.get("cachingEffective").is_some());
        assert_eq!(value["usage"]["promptTokens"], 0);
    }
}
