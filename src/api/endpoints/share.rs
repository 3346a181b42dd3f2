//! Share link endpoints.
//!
//! `POST /api/share` stores a record for a limited time and returns its
//! link. `GET /api/share/:id` reads it back until it expires. Unknown and
//! expired ids get the same 404.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::{header, HeaderMap};
use axum::Json;
use chrono::{DateTime, SecondsFormat};

use crate::api::error::{ApiError, SHARE_NOT_FOUND};
use crate::api::types::{ApiContext, CreateShareRequest, CreateShareResponse, ShareResponse};

/// `POST /api/share`
pub async fn create(
    State(ctx): State<ApiContext>,
    headers: HeaderMap,
    payload: Result<Json<CreateShareRequest>, JsonRejection>,
) -> Result<Json<CreateShareResponse>, ApiError> {
    let Json(request) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    let entry = ctx.core.shares.create(&request.data, request.expires_in)?;

    let expires_at = DateTime::from_timestamp(entry.expires_at, 0)
        .ok_or_else(|| ApiError::Internal(format!("expiry out of range: {}", entry.expires_at)))?
        .to_rfc3339_opts(SecondsFormat::Millis, true);

    let host = headers
        .get(header::HOST)
        .and_then(|value| value.to_str().ok());
    let url = ctx.core.share_url(host, &entry.id);

    Ok(Json(CreateShareResponse {
        id: entry.id,
        url,
        expires_at,
    }))
}

/// `GET /api/share/:id`
pub async fn fetch(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
) -> Result<Json<ShareResponse>, ApiError> {
    match ctx.core.shares.resolve(&id)? {
        Some(entry) => Ok(Json(ShareResponse {
            data: entry.record,
            expires_at: entry.expires_at,
        })),
        None => {
            tracing::debug!(share_id = %id, "Share lookup missed");
            Err(ApiError::NotFound(SHARE_NOT_FOUND.into()))
        }
    }
}
