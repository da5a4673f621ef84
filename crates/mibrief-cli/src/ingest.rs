//! `ingest` command: one pipeline run from the terminal.

use anyhow::Context;

use mibrief_core::{AppConfig, Pillar, PillarsFile};
use mibrief_db::MemoryCardStore;
use mibrief_ingest::{run_ingestion, run_recorded, IngestConfig, RunSummary};
use mibrief_llm::PerplexityClient;

use crate::query::connect_store;

/// Narrow the plan to one pillar, refusing pillars the plan has no slots for.
pub(crate) fn select_plan(plan: PillarsFile, pillar: Option<Pillar>) -> anyhow::Result<PillarsFile> {
    let Some(pillar) = pillar else {
        return Ok(plan);
    };
    if !plan.pillars.iter().any(|p| p.pillar == pillar) {
        anyhow::bail!("pillar {pillar} has no slots in the plan");
    }
    Ok(plan.only(pillar))
}

/// Run ingestion once.
///
/// With `dry_run`, cards are generated and validated against an in-memory
/// store and printed; nothing is written to Postgres and no run is recorded.
///
/// # Errors
///
/// Returns an error if the Perplexity key is missing, the pillar plan cannot be
/// loaded, or (outside dry-run) the database is unreachable or the run cannot
/// be recorded.
pub(crate) async fn run_ingest(
    config: &AppConfig,
    pillar: Option<Pillar>,
    dry_run: bool,
) -> anyhow::Result<()> {
    let api_key = config
        .perplexity_api_key
        .as_deref()
        .context("PERPLEXITY_API_KEY is required for ingestion")?;
    let plan = mibrief_core::load_pillars(&config.pillars_path)
        .with_context(|| format!("loading pillar plan from {}", config.pillars_path.display()))?;
    let plan = select_plan(plan, pillar)?;

    let llm = PerplexityClient::with_base_url(
        api_key,
        config.llm_timeout_secs,
        &config.perplexity_base_url,
    )?
    .with_retry(config.llm_max_retries, config.llm_retry_backoff_ms);
    let ingest_config = IngestConfig::from_app_config(config);

    if dry_run {
        println!(
            "dry-run: generating {} slots without writing to the database",
            plan.slot_count()
        );
        let store = MemoryCardStore::new();
        let summary = run_ingestion(&llm, &store, &plan, &ingest_config).await;
        for card in store.cards() {
            println!(
                "[{}] p{} {} | {}",
                card.pillar, card.priority, card.card_type, card.title
            );
        }
        for rejected in store.rejected() {
            println!("rejected ({}): {}", rejected.reason.as_str(), rejected.issues.join("; "));
        }
        print_summary(&summary);
        return Ok(());
    }

    let store = connect_store(config).await?;
    let summary = run_recorded(&llm, &store, &store, &plan, &ingest_config, "cli", pillar).await?;
    print_summary(&summary);
    Ok(())
}

pub(crate) fn format_summary(summary: &RunSummary) -> String {
    let mut out = format!(
        "slots: {}  stored: {}  rejected (validation): {}  rejected (duplicate): {}  failed: {}\n\
         llm calls: {}  prompt tokens: {}  completion tokens: {}  cached tokens: {}  caching effective: {}",
        summary.slots_attempted,
        summary.cards_stored,
        summary.rejected_validation,
        summary.rejected_duplicate,
        summary.failed,
        summary.llm_calls,
        summary.usage.prompt_tokens,
        summary.usage.completion_tokens,
        summary.usage.cached_tokens,
        summary.caching_effective,
    );
    for failure in &summary.failures {
        out.push_str(&format!(
            "\nfailed slot {}/{}: {}",
            failure.pillar, failure.card_type, failure.reason
        ));
    }
    out
}

fn print_summary(summary: &RunSummary) {
    println!("{}", format_summary(summary));
}
