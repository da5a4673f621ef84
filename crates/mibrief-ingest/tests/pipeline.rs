//! End-to-end pipeline tests with a scripted completion client and the
//! in-memory store.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;
use uuid::Uuid;

use mibrief_core::{
    content_hash, parse_pillars, Card, CardType, NewCard, Pillar, PillarsFile, RejectionReason,
};
use mibrief_db::{MemoryCardStore, RunLedger};
use mibrief_ingest::{run_ingestion, run_recorded, IngestConfig};
use mibrief_llm::{Completion, CompletionClient, CompletionRequest, LlmError, Usage};

/// Replays canned answers in order and records every request it saw.
#[derive(Default)]
struct ScriptedClient {
    answers: Mutex<VecDeque<Result<Completion, LlmError>>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedClient {
    fn new(answers: Vec<Result<Completion, LlmError>>) -> Self {
        Self {
            answers: Mutex::new(answers.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionClient for ScriptedClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, LlmError> {
        self.requests.lock().unwrap().push(request.clone());
        self.answers
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(LlmError::EmptyResponse))
    }
}

/// Never answers within any reasonable slot budget.
struct StalledClient;

#[async_trait]
impl CompletionClient for StalledClient {
    async fn complete(&self, _: &CompletionRequest) -> Result<Completion, LlmError> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Err(LlmError::EmptyResponse)
    }
}

fn completion(text: &str, cached_tokens: u64, citations: usize) -> Result<Completion, LlmError> {
    Ok(Completion {
        text: text.to_string(),
        usage: Usage {
            prompt_tokens: 1000,
            completion_tokens: 300,
            cached_tokens,
        },
        cache_hit: cached_tokens > 0,
        citations: (0..citations)
            .map(|i| format!("https://news.example.com/{i}"))
            .collect(),
    })
}

fn search(citations: usize) -> Result<Completion, LlmError> {
    completion("Raw news text about the story.", 0, citations)
}

fn google_ads_json() -> String {
    let card = json!({
        "title": "Google Ads Drops $2.1B in Brand Safety Spend",
        "summary": "Google announced new brand safety controls resulting in $2.1B reduction... what this means for CMOs is tighter Q1 budgets.",
        "signals": [
            "$2.1B spend reduction YoY",
            "78% F500 CMOs prioritize brand safety",
            "34% shift to premium deals"
        ],
        "moves": [
            "Your next move: audit Q1 YouTube placements",
            "Test 3 premium publisher deals",
            "Build a brand-safety dashboard"
        ],
        "pillar": "media_trends",
        "source": "Adweek",
        "sourceTier": 2,
        "sourceCount": 12,
        "type": "brief"
    });
    format!("```json\n{card}\n```")
}

fn openai_json() -> String {
    json!({
        "title": "OpenAI opens ads pilot to 40 retail brands",
        "summary": "OpenAI began testing sponsored answers with 40 retailers; the implication is a new paid channel inside AI search.",
        "signals": ["40 retail brands in pilot", "CPMs quoted near $60"],
        "moves": ["Your next move: request pilot access", "Benchmark AI search referral traffic"],
        "pillar": "ai_strategy",
        "source": "The Information",
        "sourceTier": 2,
        "type": "hot_take"
    })
    .to_string()
}

fn plan(yaml: &str) -> PillarsFile {
    parse_pillars(yaml).expect("valid plan")
}

fn one_slot_plan() -> PillarsFile {
    plan(
        r"
pillars:
  - pillar: media_trends
    query: Latest ad market news
    domains: [adweek.com]
    slots: [brief]
",
    )
}

fn two_pillar_plan() -> PillarsFile {
    plan(
        r"
pillars:
  - pillar: media_trends
    query: Latest ad market news
    slots: [brief]
  - pillar: ai_strategy
    query: Latest AI marketing news
    slots: [hot_take]
",
    )
}

fn config() -> IngestConfig {
    IngestConfig {
        slot_timeout: Duration::from_secs(5),
        ..IngestConfig::default()
    }
}

#[tokio::test]
async fn google_ads_card_is_stored() {
    let llm = ScriptedClient::new(vec![search(3), completion(&google_ads_json(), 0, 0)]);
    let store = MemoryCardStore::new();

    let summary = run_ingestion(&llm, &store, &one_slot_plan(), &config()).await;

    assert_eq!(summary.slots_attempted, 1);
    assert_eq!(summary.cards_stored, 1);
    assert_eq!(summary.failed, 0);
    assert_eq!(summary.topics, vec!["google".to_string()]);
    assert_eq!(summary.llm_calls, 2);
    assert_eq!(summary.usage.prompt_tokens, 2000);

    let cards = store.cards();
    assert_eq!(cards.len(), 1);
    let card = &cards[0];
    assert_eq!(card.pillar, Pillar::MediaTrends);
    assert_eq!(card.card_type, CardType::Brief);
    assert_eq!(card.validation_score, 100);
    assert_eq!(card.source_count, Some(12));
    // 50 + 20 + 15 (12 sources) + 7 (media_trends) + 5 (brief) + jitter 0..=4
    assert!((97..=100).contains(&card.priority), "priority {}", card.priority);
    assert_eq!(summary.card_ids, vec![card.id]);
}

#[tokio::test]
async fn search_and_summary_requests_carry_slot_options() {
    let llm = ScriptedClient::new(vec![search(3), completion(&google_ads_json(), 0, 0)]);
    let store = MemoryCardStore::new();

    run_ingestion(&llm, &store, &one_slot_plan(), &config()).await;

    let requests = llm.requests();
    assert_eq!(requests.len(), 2);
    let (search_req, summary_req) = (&requests[0], &requests[1]);
    assert_eq!(search_req.options.model, "sonar-pro");
    assert_eq!(search_req.options.search_domain_filter, vec!["adweek.com".to_string()]);
    assert!(!search_req.options.cache_system_prompt);
    assert!(search_req.user.starts_with("Latest ad market news"));

    assert_eq!(summary_req.options.model, "sonar");
    assert!(summary_req.options.cache_system_prompt);
    assert!(summary_req.user.contains("Raw news text about the story."));
}

#[tokio::test]
async fn invalid_card_lands_in_rejection_log() {
    let llm = ScriptedClient::new(vec![search(1), completion(r#"{"title": "AI"}"#, 0, 0)]);
    let store = MemoryCardStore::new();

    let summary = run_ingestion(&llm, &store, &one_slot_plan(), &config()).await;

    assert_eq!(summary.rejected_validation, 1);
    assert_eq!(summary.cards_stored, 0);
    assert!(store.cards().is_empty());

    let rejected = store.rejected();
    assert_eq!(rejected.len(), 1);
    assert_eq!(rejected[0].reason, RejectionReason::Validation);
    assert_eq!(rejected[0].score, 0);
    assert!(rejected[0]
        .issues
        .iter()
        .any(|i| i.starts_with("Title too short")));
}

#[tokio::test]
async fn failed_slot_does_not_stop_the_run() {
    let llm = ScriptedClient::new(vec![
        Err(LlmError::Api {
            status: 503,
            message: "unavailable".to_string(),
        }),
        search(2),
        completion(&openai_json(), 0, 0),
    ]);
    let store = MemoryCardStore::new();

    let summary = run_ingestion(&llm, &store, &two_pillar_plan(), &config()).await;

    assert_eq!(summary.slots_attempted, 2);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.cards_stored, 1);
    assert_eq!(summary.failures[0].pillar, Pillar::MediaTrends);
    assert!(summary.failures[0].reason.contains("503"), "{:?}", summary.failures);

    // Source count filled from the two search citations.
    assert_eq!(store.cards()[0].source_count, Some(2));
}

#[tokio::test]
async fn malformed_output_counts_as_failure() {
    let llm = ScriptedClient::new(vec![search(1), completion("No news today, sorry.", 0, 0)]);
    let store = MemoryCardStore::new();

    let summary = run_ingestion(&llm, &store, &one_slot_plan(), &config()).await;

    assert_eq!(summary.failed, 1);
    assert!(summary.failures[0].reason.contains("not a card"));
    assert!(store.rejected().is_empty());
}

#[tokio::test]
async fn covered_topics_are_excluded_from_later_slots() {
    let llm = ScriptedClient::new(vec![
        search(3),
        completion(&google_ads_json(), 0, 0),
        search(3),
        completion(&openai_json(), 900, 0),
    ]);
    let store = MemoryCardStore::new();

    let summary = run_ingestion(&llm, &store, &two_pillar_plan(), &config()).await;

    assert_eq!(summary.cards_stored, 2);
    assert_eq!(summary.topics, vec!["google".to_string(), "openai".to_string()]);

    let requests = llm.requests();
    assert!(!requests[0].user.contains("Avoid these topics"));
    for later in &requests[2..] {
        assert!(
            later
                .user
                .contains("Avoid these topics, already covered today: google."),
            "{}",
            later.user
        );
    }

    assert_eq!(summary.cache_hits, 1);
    assert!(summary.caching_effective);
}

#[tokio::test]
async fn near_duplicate_of_recent_card_is_skipped() {
    let now = Utc::now();
    let existing = NewCard {
        title: "Google Ads drops brand safety spend by $2.1B".to_string(),
        summary: "Earlier write-up".to_string(),
        signals: vec![],
        moves: vec![],
        pillar: Pillar::MediaTrends,
        card_type: CardType::Brief,
        source: "Digiday".to_string(),
        source_tier: 2,
        source_count: None,
        priority: 80,
        validation_score: 100,
        content_hash: content_hash("Google Ads drops brand safety spend by $2.1B", "Earlier write-up"),
        published_at: now - chrono::Duration::days(2),
    };
    let store = MemoryCardStore::new();
    store.seed(Card::from_new(existing, Uuid::new_v4(), now));

    let llm = ScriptedClient::new(vec![search(3), completion(&google_ads_json(), 0, 0)]);
    let summary = run_ingestion(&llm, &store, &one_slot_plan(), &config()).await;

    assert_eq!(summary.rejected_duplicate, 1);
    assert_eq!(summary.cards_stored, 0);
    assert!(summary.topics.is_empty());
    assert_eq!(store.cards().len(), 1);
}

#[tokio::test]
async fn slow_slot_times_out() {
    let store = MemoryCardStore::new();
    let config = IngestConfig {
        slot_timeout: Duration::from_millis(50),
        ..IngestConfig::default()
    };

    let summary = run_ingestion(&StalledClient, &store, &one_slot_plan(), &config).await;

    assert_eq!(summary.failed, 1);
    assert!(summary.failures[0].reason.contains("timed out"));
}

#[tokio::test]
async fn recorded_run_completes_with_counts() {
    let llm = ScriptedClient::new(vec![search(3), completion(&google_ads_json(), 0, 0)]);
    let store = MemoryCardStore::new();

    let summary = run_recorded(
        &llm,
        &store,
        &store,
        &one_slot_plan(),
        &config(),
        "cli",
        None,
    )
    .await
    .expect("recorded run");
    assert_eq!(summary.cards_stored, 1);

    let runs = store.list_runs(10).await.expect("runs");
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].status, "succeeded");
    assert_eq!(runs[0].trigger_source, "cli");
    assert_eq!(runs[0].cards_stored, 1);
    assert_eq!(runs[0].usage.0["llmCalls"], 2);
}

#[tokio::test]
async fn recorded_run_fails_when_every_slot_fails() {
    let llm = ScriptedClient::new(vec![]);
    let store = MemoryCardStore::new();

    run_recorded(
        &llm,
        &store,
        &store,
        &two_pillar_plan(),
        &config(),
        "scheduler",
        None,
    )
    .await
    .expect("recorded run");

    let runs = store.list_runs(10).await.expect("runs");
    assert_eq!(runs[0].status, "failed");
    assert!(runs[0]
        .error_message
        .as_deref()
        .is_some_and(|m| m.starts_with("all 2 slots failed")));
}
