//! Exam extraction endpoint.
//!
//! `POST /api/extract` takes one multipart file under the `image` field,
//! runs it through the extraction model on the blocking pool and returns
//! the normalized `ExamRecord`.

use std::time::Instant;

use axum::extract::multipart::MultipartError;
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::Json;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::models::ExamRecord;
use crate::pipeline::extraction::{normalize_extraction_response, DocumentInput, MediaType};

/// Multipart field carrying the document.
pub const UPLOAD_FIELD: &str = "image";

pub async fn extract(
    State(ctx): State<ApiContext>,
    mut multipart: Multipart,
) -> Result<Json<ExamRecord>, ApiError> {
    let document = read_document(&mut multipart).await?;
    let extractor = ctx.core.extractor()?;

    let media_type = document.media_type.as_str();
    let size = document.bytes.len();
    let started = Instant::now();

    let raw = tokio::task::spawn_blocking(move || extractor.extract(&document))
        .await
        .map_err(|e| ApiError::Internal(format!("extraction task failed: {e}")))??;

    let record = normalize_extraction_response(&raw)?;

    tracing::info!(
        media_type,
        bytes = size,
        results = record.results.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Exam extracted"
    );
    Ok(Json(record))
}

/// Pull the `image` field out of the form, ignoring any others.
async fn read_document(multipart: &mut Multipart) -> Result<DocumentInput, ApiError> {
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        let content_type = field.content_type().unwrap_or("none").to_string();
        let media_type = MediaType::from_content_type(&content_type).map_err(|e| {
            tracing::warn!(content_type = %content_type, "Rejected upload type");
            ApiError::from(e)
        })?;
        let file_name = field.file_name().map(str::to_string);
        let bytes = field.bytes().await.map_err(multipart_error)?;

        if bytes.is_empty() {
            return Err(ApiError::BadRequest("Uploaded file is empty".into()));
        }
        return Ok(DocumentInput::new(
            media_type,
            bytes.to_vec(),
            file_name.as_deref(),
        ));
    }

    Err(ApiError::BadRequest(format!(
        "No file provided in the '{UPLOAD_FIELD}' field"
    )))
}

fn multipart_error(err: MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge(err.body_text())
    } else {
        ApiError::BadRequest(err.body_text())
    }
}
