//! Per-run state threaded through every slot of one ingestion run.

use mibrief_llm::{Completion, Usage};

/// Which pipeline step an LLM call served.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    Search,
    Summarize,
}

/// Topics covered so far and LLM cost accounting for one run.
///
/// Created fresh for each run and owned by it.
#[derive(Debug, Default)]
pub struct RunContext {
    covered_topics: Vec<String>,
    usage: Usage,
    llm_calls: u32,
    cache_hits: u32,
    summary_calls: u32,
    /// Cache hits on summarization calls after the first one of the run.
    warm_summary_hits: u32,
}

impl RunContext {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Remember a topic; repeats are ignored.
    pub fn record_topic(&mut self, topic: String) {
        if !self.covered_topics.contains(&topic) {
            self.covered_topics.push(topic);
        }
    }

    /// Topics to steer the LLM away from, in the order they were covered.
    #[must_use]
    pub fn exclusions(&self) -> &[String] {
        &self.covered_topics
    }

    pub fn record_completion(&mut self, kind: CallKind, completion: &Completion) {
        self.usage.add(completion.usage);
        self.llm_calls += 1;
        if completion.cache_hit {
            self.cache_hits += 1;
        }
        if kind == CallKind::Summarize {
            if self.summary_calls > 0 && completion.cache_hit {
                self.warm_summary_hits += 1;
            }
            self.summary_calls += 1;
        }
    }

    #[must_use]
    pub fn usage(&self) -> Usage {
        self.usage
    }

    #[must_use]
    pub fn llm_calls(&self) -> u32 {
        self.llm_calls
    }

    #[must_use]
    pub fn cache_hits(&self) -> u32 {
        self.cache_hits
    }

    /// The fixed summarization prompt is only expected to be cached from the
    /// second call on, so caching works when any later call hit the cache.
    #[must_use]
    pub fn caching_effective(&self) -> bool {
        self.warm_summary_hits > 0
    }

    #[must_use]
    pub fn into_topics(self) -> Vec<String> {
        self.covered_topics
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn completion(cached: u64) -> Completion {
        Completion {
            text: "{}".to_string(),
            usage: Usage {
                prompt_tokens: 1000,
                completion_tokens: 200,
                cached_tokens: cached,
            },
            cache_hit: cached > 0,
            citations: vec![],
        }
    }

    #[test]
    fn topics_are_unique_and_ordered() {
        let mut ctx = RunContext::new();
        ctx.record_topic("google".to_string());
        ctx.record_topic("meta".to_string());
        ctx.record_topic("google".to_string());
        assert_eq!(ctx.exclusions(), ["google", "meta"]);
    }

    #[test]
    fn first_summary_hit_does_not_count_as_effective() {
        let mut ctx = RunContext::new();
        ctx.record_completion(CallKind::Summarize, &completion(800));
        ctx.record_completion(CallKind::Search, &completion(800));
        assert!(!ctx.caching_effective());
        assert_eq!(ctx.cache_hits(), 2);

        ctx.record_completion(CallKind::Summarize, &completion(800));
        assert!(ctx.caching_effective());
    }

    #[test]
    fn usage_accumulates() {
        let mut ctx = RunContext::new();
        ctx.record_completion(CallKind::Search, &completion(0));
        ctx.record_completion(CallKind::Summarize, &completion(0));
        assert_eq!(ctx.llm_calls(), 2);
        assert_eq!(ctx.usage().prompt_tokens, 2000);
        assert_eq!(ctx.usage().completion_tokens, 400);
        assert!(!ctx.caching_effective());
    }
}
