use axum::{
    body::Bytes,
    extract::{rejection::JsonRejection, rejection::PathRejection, Path, State},
    Extension, Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use mibrief_core::Card;
use mibrief_ingest::{IngestError, IntakeOutcome, SelectError};

use crate::middleware::RequestId;

use super::{internal_error, ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Deserialize)]
pub(super) struct StoreCardsBody {
    cards: Vec<Value>,
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct PostedBody {
    #[serde(default)]
    url: Option<String>,
}

#[derive(Debug, Serialize)]
pub(super) struct PostedData {
    success: bool,
    card: Card,
}

#[derive(Debug, Serialize)]
pub(super) struct TopCardData {
    card: Card,
}

pub(super) async fn store_cards(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    body: Result<Json<StoreCardsBody>, JsonRejection>,
) -> Result<Json<ApiResponse<IntakeOutcome>>, ApiError> {
    let Json(body) = body.map_err(|e| {
        ApiError::new(req_id.0.clone(), "bad_request", format!("invalid request body: {e}"))
    })?;

    let outcome = mibrief_ingest::store_cards(state.store.as_ref(), &body.cards, Utc::now())
        .await
        .map_err(|e| internal_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: outcome,
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn mark_posted(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    id: Result<Path<Uuid>, PathRejection>,
    body: Bytes,
) -> Result<Json<ApiResponse<PostedData>>, ApiError> {
    let Path(id) = id.map_err(|_| {
        ApiError::new(req_id.0.clone(), "bad_request", "card id must be a UUID")
    })?;

    let body: PostedBody = if body.iter().all(u8::is_ascii_whitespace) {
        PostedBody::default()
    } else {
        serde_json::from_slice(&body).map_err(|e| {
            ApiError::new(req_id.0.clone(), "bad_request", format!("invalid request body: {e}"))
        })?
    };

    let card = mibrief_ingest::mark_published(
        state.store.as_ref(),
        id,
        body.url.as_deref().filter(|u| !u.trim().is_empty()),
        Utc::now(),
    )
    .await
    .map_err(|e| match e {
        IngestError::CardNotFound(_) => {
            ApiError::new(req_id.0.clone(), "not_found", format!("card {id} not found"))
        }
        other => internal_error(req_id.0.clone(), &other),
    })?;

    Ok(Json(ApiResponse {
        data: PostedData {
            success: true,
            card,
        },
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn top_card(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<TopCardData>>, ApiError> {
    let card = mibrief_ingest::top_unpublished(state.store.as_ref(), Utc::now())
        .await
        .map_err(|e| match e {
            SelectError::Db(ref db) => internal_error(req_id.0.clone(), db),
            ref not_found => ApiError::new(req_id.0.clone(), "not_found", not_found.to_string())
                .with_reason(not_found.code()),
        })?;

    Ok(Json(ApiResponse {
        data: TopCardData { card },
        meta: ResponseMeta::new(req_id.0),
    }))
}
