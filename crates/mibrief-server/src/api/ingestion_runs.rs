use axum::{
    extract::{Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use mibrief_core::Pillar;

use crate::middleware::RequestId;

use super::{internal_error, normalize_limit, ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Deserialize)]
pub(super) struct IngestionRunsQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub(super) struct TriggerQuery {
    pub pillar: Option<String>,
}

#[derive(Debug, Serialize)]
pub(super) struct IngestionRunItem {
    ingestion_run_id: Uuid,
    trigger_source: String,
    pillar: Option<String>,
    status: String,
    started_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
    slots_attempted: i32,
    cards_stored: i32,
    rejected_validation: i32,
    rejected_duplicate: i32,
    failed: i32,
    usage: serde_json::Value,
    error_message: Option<String>,
}

#[derive(Debug, Serialize)]
pub(super) struct TriggerData {
    status: &'static str,
    pillar: Option<Pillar>,
}

pub(super) async fn list_runs(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<IngestionRunsQuery>,
) -> Result<Json<ApiResponse<Vec<IngestionRunItem>>>, ApiError> {
    let rows = state
        .ledger
        .list_runs(normalize_limit(query.limit))
        .await
        .map_err(|e| internal_error(req_id.0.clone(), &e))?;

    let data = rows
        .into_iter()
        .map(|row| IngestionRunItem {
            ingestion_run_id: row.public_id,
            trigger_source: row.trigger_source,
            pillar: row.pillar,
            status: row.status,
            started_at: row.started_at,
            completed_at: row.completed_at,
            slots_attempted: row.slots_attempted,
            cards_stored: row.cards_stored,
            rejected_validation: row.rejected_validation,
            rejected_duplicate: row.rejected_duplicate,
            failed: row.failed,
            usage: row.usage.0,
            error_message: row.error_message,
        })
        .collect();

    Ok(Json(ApiResponse {
        data,
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// Start an ingestion run in the background; optionally for one pillar.
pub(super) async fn trigger_run(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<TriggerQuery>,
) -> Result<(StatusCode, Json<ApiResponse<TriggerData>>), ApiError> {
    let Some(runner) = state.runner.as_ref() else {
        return Err(ApiError::new(
            req_id.0,
            "unavailable",
            "ingestion is not configured on this server",
        ));
    };

    let pillar = match query.pillar.as_deref() {
        None => None,
        Some(raw) => {
            let pillar = Pillar::parse(raw).ok_or_else(|| {
                ApiError::new(
                    req_id.0.clone(),
                    "validation_error",
                    format!("unknown pillar: {raw}"),
                )
            })?;
            if !runner.plan().pillars.iter().any(|p| p.pillar == pillar) {
                return Err(ApiError::new(
                    req_id.0,
                    "validation_error",
                    format!("pillar {pillar} has no slots in the plan"),
                ));
            }
            Some(pillar)
        }
    };

    runner.spawn("api", pillar).map_err(|e| {
        ApiError::new(req_id.0.clone(), "conflict", e.to_string())
    })?;
    tracing::info!(pillar = ?pillar, "ingestion run triggered via API");

    Ok((
        StatusCode::ACCEPTED,
        Json(ApiResponse {
            data: TriggerData {
                status: "accepted",
                pillar,
            },
            meta: ResponseMeta::new(req_id.0),
        }),
    ))
}
