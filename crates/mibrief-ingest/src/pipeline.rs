//! Ingestion pipeline orchestration.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use mibrief_core::{
    primary_topic, priority_score, validate, CardType, NewCard, Pillar, PillarConfig, PillarsFile,
    RawCard, RejectedCard, RejectionReason, ValidationReport,
};
use mibrief_db::{CardStore, DbError, RunLedger};
use mibrief_llm::{CompletionClient, CompletionOptions, CompletionRequest, RecencyFilter};

use crate::context::{CallKind, RunContext};
use crate::dedup::is_duplicate;
use crate::error::IngestError;
use crate::parse::parse_card_json;
use crate::prompts::{search_prompt, summary_prompt, SEARCH_SYSTEM_PROMPT, SUMMARY_SYSTEM_PROMPT};
use crate::types::{IngestConfig, RunSummary, SlotFailure};

/// What a slot ended in, short of a failure.
#[derive(Debug)]
enum SlotOutcome {
    Stored { card_id: Uuid, topic: String },
    RejectedValidation { score: u8 },
    Duplicate,
}

/// Run every slot of the plan once, in order.
///
/// For each pillar and each of its slots:
/// 1. Search for a fresh story (last day, pillar domains, covered topics excluded).
/// 2. Summarize it into card JSON with the cached summary prompt.
/// 3. Parse, then validate. Invalid cards go to the rejection log.
/// 4. Skip near-duplicates of recent same-pillar cards.
/// 5. Score and persist, then remember the card's topic for later slots.
///
/// A failing slot is logged and counted; the run always continues.
pub async fn run_ingestion(
    llm: &dyn CompletionClient,
    store: &dyn CardStore,
    plan: &PillarsFile,
    config: &IngestConfig,
) -> RunSummary {
    let mut ctx = RunContext::new();
    let mut summary = RunSummary::default();

    tracing::info!(
        pillars = plan.pillars.len(),
        slots = plan.slot_count(),
        "ingestion run started"
    );

    for pillar_plan in &plan.pillars {
        for (slot, card_type) in pillar_plan.slots.iter().copied().enumerate() {
            summary.slots_attempted += 1;

            let outcome = match tokio::time::timeout(
                config.slot_timeout,
                run_slot(llm, store, pillar_plan, card_type, &mut ctx, config),
            )
            .await
            {
                Ok(result) => result,
                Err(_) => Err(IngestError::Timeout {
                    secs: config.slot_timeout.as_secs(),
                }),
            };

            match outcome {
                Ok(SlotOutcome::Stored { card_id, topic }) => {
                    tracing::info!(
                        pillar = %pillar_plan.pillar,
                        slot,
                        card_type = %card_type,
                        card_id = %card_id,
                        topic = %topic,
                        "card stored"
                    );
                    summary.cards_stored += 1;
                    summary.card_ids.push(card_id);
                }
                Ok(SlotOutcome::RejectedValidation { score }) => {
                    tracing::info!(
                        pillar = %pillar_plan.pillar,
                        slot,
                        score,
                        "card rejected by validation"
                    );
                    summary.rejected_validation += 1;
                }
                Ok(SlotOutcome::Duplicate) => {
                    tracing::info!(pillar = %pillar_plan.pillar, slot, "duplicate card skipped");
                    summary.rejected_duplicate += 1;
                }
                Err(e) => {
                    tracing::warn!(
                        pillar = %pillar_plan.pillar,
                        slot,
                        card_type = %card_type,
                        error = %e,
                        "slot failed"
                    );
                    summary.failed += 1;
                    summary.failures.push(SlotFailure {
                        pillar: pillar_plan.pillar,
                        card_type,
                        reason: e.to_string(),
                    });
                }
            }
        }
    }

    summary.usage = ctx.usage();
    summary.llm_calls = ctx.llm_calls();
    summary.cache_hits = ctx.cache_hits();
    summary.caching_effective = ctx.caching_effective();
    summary.topics = ctx.into_topics();

    tracing::info!(
        slots = summary.slots_attempted,
        stored = summary.cards_stored,
        rejected_validation = summary.rejected_validation,
        rejected_duplicate = summary.rejected_duplicate,
        failed = summary.failed,
        llm_calls = summary.llm_calls,
        cache_hits = summary.cache_hits,
        caching_effective = summary.caching_effective,
        "ingestion run finished"
    );

    summary
}

async fn run_slot(
    llm: &dyn CompletionClient,
    store: &dyn CardStore,
    plan: &PillarConfig,
    card_type: CardType,
    ctx: &mut RunContext,
    config: &IngestConfig,
) -> Result<SlotOutcome, IngestError> {
    let search = llm
        .complete(&CompletionRequest {
            system: SEARCH_SYSTEM_PROMPT.to_string(),
            user: search_prompt(plan, card_type, ctx.exclusions()),
            options: CompletionOptions::new(&config.search_model)
                .max_tokens(config.search_max_tokens)
                .recency(RecencyFilter::Day)
                .domains(plan.domains.clone()),
        })
        .await?;
    ctx.record_completion(CallKind::Search, &search);

    let summarized = llm
        .complete(&CompletionRequest {
            system: SUMMARY_SYSTEM_PROMPT.to_string(),
            user: summary_prompt(plan, card_type, &search.text, ctx.exclusions()),
            options: CompletionOptions::new(&config.summary_model)
                .max_tokens(config.summary_max_tokens)
                .temperature(config.summary_temperature)
                .cache_system_prompt(),
        })
        .await?;
    ctx.record_completion(CallKind::Summarize, &summarized);

    let mut raw = parse_card_json(&summarized.text)?;
    fill_from_slot(&mut raw, plan.pillar, search.citations.len());

    let now = Utc::now();
    let report = validate(&raw);
    if !report.is_valid {
        store
            .add_rejected_card(&rejection(&raw, &report, RejectionReason::Validation, now))
            .await?;
        return Ok(SlotOutcome::RejectedValidation {
            score: report.score,
        });
    }

    let new_card = score_card(&raw, &report, now)?;

    if is_duplicate(store, &new_card.title, new_card.pillar, now).await {
        return Ok(SlotOutcome::Duplicate);
    }

    let card = match store.add_card(&new_card).await {
        Ok(card) => card,
        Err(DbError::DuplicateContentHash(hash)) => {
            tracing::info!(content_hash = %hash, "identical card already stored");
            return Ok(SlotOutcome::Duplicate);
        }
        Err(e) => return Err(e.into()),
    };

    let topic = primary_topic(&card.title);
    ctx.record_topic(topic.clone());

    Ok(SlotOutcome::Stored {
        card_id: card.id,
        topic,
    })
}

/// Fill fields the pipeline knows better than the model left blank: the
/// requested pillar, and the source count from the search citations.
fn fill_from_slot(raw: &mut RawCard, pillar: Pillar, citations: usize) {
    if raw.pillar.as_deref().is_none_or(|p| p.trim().is_empty()) {
        raw.pillar = Some(pillar.as_str().to_string());
    }
    if raw.source_count.is_none() && citations > 0 {
        raw.source_count = Some(serde_json::Value::from(citations));
    }
}

/// Compute priority and build the typed card for a validated candidate.
pub(crate) fn score_card(
    raw: &RawCard,
    report: &ValidationReport,
    now: DateTime<Utc>,
) -> Result<NewCard, IngestError> {
    let card_type = raw
        .card_type_value()
        .and_then(Result::ok)
        .unwrap_or_default();
    let priority = priority_score(
        raw.source_count_value().unwrap_or(1),
        raw.pillar_value(),
        card_type,
    );
    NewCard::from_validated(raw, priority, report.score, now).map_err(IngestError::from)
}

pub(crate) fn rejection(
    raw: &RawCard,
    report: &ValidationReport,
    reason: RejectionReason,
    now: DateTime<Utc>,
) -> RejectedCard {
    RejectedCard {
        payload: serde_json::to_value(raw).unwrap_or(serde_json::Value::Null),
        title: raw.title.clone(),
        pillar: raw.pillar.clone(),
        reason,
        score: i16::from(report.score),
        issues: report.issues.clone(),
        warnings: report.warnings.clone(),
        rejected_at: now,
    }
}

/// Run ingestion inside a run-ledger entry.
///
/// The entry is completed with the run's counts, or failed when every
/// attempted slot failed.
///
/// # Errors
///
/// Returns [`IngestError::Db`] if the ledger cannot be written.
pub async fn run_recorded(
    llm: &dyn CompletionClient,
    store: &dyn CardStore,
    ledger: &dyn RunLedger,
    plan: &PillarsFile,
    config: &IngestConfig,
    trigger_source: &str,
    pillar: Option<Pillar>,
) -> Result<RunSummary, IngestError> {
    let run = ledger.create_run(trigger_source, pillar).await?;
    tracing::info!(run_id = %run.public_id, trigger_source, "ingestion run recorded");

    let summary = run_ingestion(llm, store, plan, config).await;

    if summary.slots_attempted > 0 && summary.failed == summary.slots_attempted {
        let first = summary
            .failures
            .first()
            .map_or("unknown error", |f| f.reason.as_str());
        let message = format!("all {} slots failed; first: {first}", summary.failed);
        ledger.fail_run(run.id, &message).await?;
    } else {
        ledger.complete_run(run.id, &summary.run_counts()).await?;
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn fill_from_slot_only_fills_blanks() {
        let mut raw = RawCard::default();
        fill_from_slot(&mut raw, Pillar::AiStrategy, 4);
        assert_eq!(raw.pillar.as_deref(), Some("ai_strategy"));
        assert_eq!(raw.source_count_value(), Some(4));

        let mut raw = RawCard {
            pillar: Some("media_trends".to_string()),
            source_count: Some(json!(12)),
            ..RawCard::default()
        };
        fill_from_slot(&mut raw, Pillar::AiStrategy, 4);
        assert_eq!(raw.pillar.as_deref(), Some("media_trends"));
        assert_eq!(raw.source_count_value(), Some(12));
    }

    #[test]
    fn fill_from_slot_leaves_count_without_citations() {
        let mut raw = RawCard::default();
        fill_from_slot(&mut raw, Pillar::AiStrategy, 0);
        assert!(raw.source_count.is_none());
    }

    #[test]
    fn rejection_keeps_verdict_and_payload() {
        let raw = RawCard {
            title: Some("AI".to_string()),
            ..RawCard::default()
        };
        let report = validate(&raw);
        let rejected = rejection(&raw, &report, RejectionReason::Validation, Utc::now());
        assert_eq!(rejected.score, 0);
        assert_eq!(rejected.payload["title"], "AI");
        assert_eq!(rejected.issues, report.issues);
    }
}
