//! Database operations for the `rejected_cards` review log.

use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use mibrief_core::RejectedCard;

use crate::DbError;

/// A row from the `rejected_cards` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RejectedCardRow {
    pub id: Uuid,
    pub payload: Json<Value>,
    pub title: Option<String>,
    pub pillar: Option<String>,
    pub reason: String,
    pub score: i16,
    pub issues: Json<Vec<String>>,
    pub warnings: Json<Vec<String>>,
    pub rejected_at: DateTime<Utc>,
}

/// Appends a rejected candidate to the review log and returns its id.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn insert_rejected_card(pool: &PgPool, card: &RejectedCard) -> Result<Uuid, DbError> {
    let id = sqlx::query_scalar::<_, Uuid>(
        "INSERT INTO rejected_cards \
             (id, payload, title, pillar, reason, score, issues, warnings, rejected_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
         RETURNING id",
    )
    .bind(Uuid::new_v4())
    .bind(Json(&card.payload))
    .bind(card.title.as_deref())
    .bind(card.pillar.as_deref())
    .bind(card.reason.as_str())
    .bind(card.score)
    .bind(Json(&card.issues))
    .bind(Json(&card.warnings))
    .bind(card.rejected_at)
    .fetch_one(pool)
    .await?;

    Ok(id)
}

/// Returns the most recent `limit` rejections, newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_rejected_cards(
    pool: &PgPool,
    limit: i64,
) -> Result<Vec<RejectedCardRow>, DbError> {
    let rows = sqlx::query_as::<_, RejectedCardRow>(
        "SELECT id, payload, title, pillar, reason, score, issues, warnings, rejected_at \
         FROM rejected_cards \
         ORDER BY rejected_at DESC \
         LIMIT $1",
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
