//! Store seams used by the ingestion pipeline, the intake services and the
//! server. Postgres and in-memory implementations live in [`crate::pg`] and
//! [`crate::memory`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use mibrief_core::{Card, NewCard, Pillar, RejectedCard};

use crate::{CardQuery, DbError, IngestionRunRow, RunCounts};

/// The keyed card collection plus its rejection log.
#[async_trait]
pub trait CardStore: Send + Sync {
    async fn add_card(&self, card: &NewCard) -> Result<Card, DbError>;

    /// Write every card or none.
    async fn add_cards(&self, cards: &[NewCard]) -> Result<Vec<Card>, DbError>;

    async fn query_cards(&self, query: &CardQuery) -> Result<Vec<Card>, DbError>;

    async fn get_card(&self, id: Uuid) -> Result<Option<Card>, DbError>;

    /// Partial update of the publish state. Unknown ids are [`DbError::NotFound`].
    async fn mark_card_posted(
        &self,
        id: Uuid,
        post_url: Option<&str>,
        posted_at: DateTime<Utc>,
    ) -> Result<Card, DbError>;

    async fn add_rejected_card(&self, card: &RejectedCard) -> Result<(), DbError>;
}

/// Ledger of ingestion runs.
#[async_trait]
pub trait RunLedger: Send + Sync {
    async fn create_run(
        &self,
        trigger_source: &str,
        pillar: Option<Pillar>,
    ) -> Result<IngestionRunRow, DbError>;

    async fn complete_run(&self, id: i64, counts: &RunCounts) -> Result<(), DbError>;

    async fn fail_run(&self, id: i64, error_message: &str) -> Result<(), DbError>;

    async fn list_runs(&self, limit: i64) -> Result<Vec<IngestionRunRow>, DbError>;
}
