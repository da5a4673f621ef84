use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use mibrief_core::{Card, NewCard, Pillar, RejectedCard};

use crate::store::{CardStore, RunLedger};
use crate::{cards, ingestion_runs, rejected_cards};
use crate::{CardQuery, DbError, IngestionRunRow, RunCounts};

/// Postgres-backed store over a shared pool.
#[derive(Debug, Clone)]
pub struct PgCardStore {
    pool: PgPool,
}

impl PgCardStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl CardStore for PgCardStore {
    async fn add_card(&self, card: &NewCard) -> Result<Card, DbError> {
        cards::insert_card(&self.pool, card).await
    }

    async fn add_cards(&self, cards: &[NewCard]) -> Result<Vec<Card>, DbError> {
        cards::insert_cards(&self.pool, cards).await
    }

    async fn query_cards(&self, query: &CardQuery) -> Result<Vec<Card>, DbError> {
        cards::query_cards(&self.pool, query).await
    }

    async fn get_card(&self, id: Uuid) -> Result<Option<Card>, DbError> {
        cards::get_card(&self.pool, id).await
    }

    async fn mark_card_posted(
        &self,
        id: Uuid,
        post_url: Option<&str>,
        posted_at: DateTime<Utc>,
    ) -> Result<Card, DbError> {
        cards::mark_card_posted(&self.pool, id, post_url, posted_at).await
    }

    async fn add_rejected_card(&self, card: &RejectedCard) -> Result<(), DbError> {
        rejected_cards::insert_rejected_card(&self.pool, card).await?;
        Ok(())
    }
}

#[async_trait]
impl RunLedger for PgCardStore {
    async fn create_run(
        &self,
        trigger_source: &str,
        pillar: Option<Pillar>,
    ) -> Result<IngestionRunRow, DbError> {
        ingestion_runs::create_ingestion_run(&self.pool, trigger_source, pillar.map(Pillar::as_str))
            .await
    }

    async fn complete_run(&self, id: i64, counts: &RunCounts) -> Result<(), DbError> {
        ingestion_runs::complete_ingestion_run(&self.pool, id, counts).await
    }

    async fn fail_run(&self, id: i64, error_message: &str) -> Result<(), DbError> {
        ingestion_runs::fail_ingestion_run(&self.pool, id, error_message).await
    }

    async fn list_runs(&self, limit: i64) -> Result<Vec<IngestionRunRow>, DbError> {
        ingestion_runs::list_ingestion_runs(&self.pool, limit).await
    }
}
