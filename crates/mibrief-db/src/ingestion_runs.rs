//! Database operations for the `ingestion_runs` ledger.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

const RUN_COLUMNS: &str = "id, public_id, trigger_source, pillar, status, started_at, \
     completed_at, slots_attempted, cards_stored, rejected_validation, rejected_duplicate, \
     failed, usage, error_message, created_at";

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A row from the `ingestion_runs` table.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct IngestionRunRow {
    pub id: i64,
    pub public_id: Uuid,
    pub trigger_source: String,
    pub pillar: Option<String>,
    pub status: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub slots_attempted: i32,
    pub cards_stored: i32,
    pub rejected_validation: i32,
    pub rejected_duplicate: i32,
    pub failed: i32,
    pub usage: Json<Value>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Final tallies written when a run succeeds.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunCounts {
    pub slots_attempted: i32,
    pub cards_stored: i32,
    pub rejected_validation: i32,
    pub rejected_duplicate: i32,
    pub failed: i32,
    pub usage: Value,
}

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

/// Creates a new run in `running` status.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn create_ingestion_run(
    pool: &PgPool,
    trigger_source: &str,
    pillar: Option<&str>,
) -> Result<IngestionRunRow, DbError> {
    let sql = format!(
        "INSERT INTO ingestion_runs (public_id, trigger_source, pillar, status) \
         VALUES ($1, $2, $3, 'running') \
         RETURNING {RUN_COLUMNS}"
    );

    let row = sqlx::query_as::<_, IngestionRunRow>(&sql)
        .bind(Uuid::new_v4())
        .bind(trigger_source)
        .bind(pillar)
        .fetch_one(pool)
        .await?;

    Ok(row)
}

/// Marks a run as `succeeded` and stores its tallies.
///
/// # Errors
///
/// Returns [`DbError::InvalidIngestionRunTransition`] if the run is not
/// `running`, or [`DbError::Sqlx`] if the update fails.
pub async fn complete_ingestion_run(
    pool: &PgPool,
    id: i64,
    counts: &RunCounts,
) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE ingestion_runs \
         SET status = 'succeeded', completed_at = NOW(), slots_attempted = $1, \
             cards_stored = $2, rejected_validation = $3, rejected_duplicate = $4, \
             failed = $5, usage = $6 \
         WHERE id = $7 AND status = 'running'",
    )
    .bind(counts.slots_attempted)
    .bind(counts.cards_stored)
    .bind(counts.rejected_validation)
    .bind(counts.rejected_duplicate)
    .bind(counts.failed)
    .bind(Json(&counts.usage))
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidIngestionRunTransition {
            id,
            expected_status: "running",
        });
    }

    Ok(())
}

/// Marks a run as `failed` with an error message.
///
/// # Errors
///
/// Returns [`DbError::InvalidIngestionRunTransition`] if the run is not
/// `running`, or [`DbError::Sqlx`] if the update fails.
pub async fn fail_ingestion_run(
    pool: &PgPool,
    id: i64,
    error_message: &str,
) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE ingestion_runs \
         SET status = 'failed', completed_at = NOW(), error_message = $1 \
         WHERE id = $2 AND status = 'running'",
    )
    .bind(error_message)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidIngestionRunTransition {
            id,
            expected_status: "running",
        });
    }

    Ok(())
}

/// Fetches a single run by its internal `id`.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no row exists with the given `id`, or
/// [`DbError::Sqlx`] if the query fails.
pub async fn get_ingestion_run(pool: &PgPool, id: i64) -> Result<IngestionRunRow, DbError> {
    let sql = format!("SELECT {RUN_COLUMNS} FROM ingestion_runs WHERE id = $1");
    sqlx::query_as::<_, IngestionRunRow>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(DbError::NotFound)
}

/// Returns the most recent `limit` runs, ordered by `created_at DESC`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_ingestion_runs(
    pool: &PgPool,
    limit: i64,
) -> Result<Vec<IngestionRunRow>, DbError> {
    let sql = format!(
        "SELECT {RUN_COLUMNS} FROM ingestion_runs \
         ORDER BY created_at DESC, id DESC \
         LIMIT $1"
    );
    let rows = sqlx::query_as::<_, IngestionRunRow>(&sql)
        .bind(limit)
        .fetch_all(pool)
        .await?;

    Ok(rows)
}
