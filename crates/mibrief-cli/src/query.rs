//! Read-only commands: `top` and `runs`.

use chrono::Utc;

use mibrief_core::{AppConfig, Card};
use mibrief_db::{IngestionRunRow, PgCardStore, RunLedger};
use mibrief_ingest::{top_unpublished, SelectError};

pub(crate) async fn connect_store(config: &AppConfig) -> anyhow::Result<PgCardStore> {
    let pool_config = mibrief_db::PoolConfig::from_app_config(config);
    let pool = mibrief_db::connect_pool(&config.database_url, pool_config).await?;
    let applied = mibrief_db::run_migrations(&pool).await?;
    if applied > 0 {
        tracing::info!(applied, "applied pending migrations");
    }
    Ok(PgCardStore::new(pool))
}

pub(crate) fn format_card(card: &Card) -> String {
    let mut out = format!(
        "{}\n{} | {} | priority {} | tier {} | {}\n\n{}",
        card.title,
        card.pillar,
        card.card_type,
        card.priority,
        card.source_tier,
        card.published_at.format("%Y-%m-%d %H:%M UTC"),
        card.summary,
    );
    for signal in &card.signals {
        out.push_str("\n  - ");
        out.push_str(signal);
    }
    for action in &card.moves {
        out.push_str("\n  > ");
        out.push_str(action);
    }
    out.push_str("\n\nsource: ");
    out.push_str(&card.source);
    out.push_str("\nid: ");
    out.push_str(&card.id.to_string());
    out
}

pub(crate) async fn run_top(store: &PgCardStore) -> anyhow::Result<()> {
    match top_unpublished(store, Utc::now()).await {
        Ok(card) => println!("{}", format_card(&card)),
        Err(SelectError::Db(e)) => return Err(e.into()),
        Err(other) => println!("{other}"),
    }
    Ok(())
}

pub(crate) fn format_run(row: &IngestionRunRow) -> String {
    format!(
        "{}  {:<9} {:<9} {:<17} slots {:>2}  stored {:>2}  invalid {:>2}  dup {:>2}  failed {:>2}{}",
        row.started_at.format("%Y-%m-%d %H:%M"),
        row.status,
        row.trigger_source,
        row.pillar.as_deref().unwrap_or("all"),
        row.slots_attempted,
        row.cards_stored,
        row.rejected_validation,
        row.rejected_duplicate,
        row.failed,
        row.error_message
            .as_deref()
            .map(|m| format!("  error: {m}"))
            .unwrap_or_default(),
    )
}

pub(crate) async fn run_runs(store: &PgCardStore, limit: i64) -> anyhow::Result<()> {
    let rows = store.list_runs(limit.clamp(1, 100)).await?;
    if rows.is_empty() {
        println!("no ingestion runs recorded");
        return Ok(());
    }
    for row in &rows {
        println!("{}", format_run(row));
    }
    Ok(())
}
