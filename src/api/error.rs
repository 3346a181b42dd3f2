//! API error types with structured JSON responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::pipeline::extraction::ExtractionError;
use crate::share::ShareError;

/// Message for unknown and expired share ids alike.
pub const SHARE_NOT_FOUND: &str = "Not found or expired";

/// Structured error response body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: &'static str,
    pub message: String,
}

/// API-level errors with HTTP status mapping.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Invalid request: {0}")]
    BadRequest(String),
    #[error("Upload too large: {0}")]
    PayloadTooLarge(String),
    #[error("Unsupported input: {0}")]
    UnsupportedInput(String),
    #[error("Invalid share lifetime: {0}")]
    InvalidTtl(i64),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("No text response from the extraction model")]
    NoResponseContent,
    #[error("Malformed extraction response: {0}")]
    MalformedResponse(String),
    #[error("Extraction timed out after {0}s")]
    ExtractionTimeout(u64),
    #[error("Upstream error: {0}")]
    Upstream(String),
    #[error("Extraction unavailable: {0}")]
    ExtractionUnavailable(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            ApiError::BadRequest(detail) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", detail),
            ApiError::PayloadTooLarge(detail) => {
                (StatusCode::PAYLOAD_TOO_LARGE, "PAYLOAD_TOO_LARGE", detail)
            }
            ApiError::UnsupportedInput(content_type) => (
                StatusCode::BAD_REQUEST,
                "UNSUPPORTED_INPUT",
                ExtractionError::UnsupportedInput(content_type).to_string(),
            ),
            ApiError::InvalidTtl(ttl) => (
                StatusCode::BAD_REQUEST,
                "INVALID_TTL",
                format!("expiresIn must be a positive number of seconds (got {ttl})"),
            ),
            ApiError::NotFound(detail) => (StatusCode::NOT_FOUND, "NOT_FOUND", detail),
            ApiError::NoResponseContent => (
                StatusCode::BAD_GATEWAY,
                "NO_RESPONSE_CONTENT",
                "The extraction model returned no text".to_string(),
            ),
            ApiError::MalformedResponse(detail) => {
                tracing::warn!(detail = %detail, "Extraction response rejected");
                (
                    StatusCode::BAD_GATEWAY,
                    "MALFORMED_RESPONSE",
                    "The extraction model returned an unreadable response".to_string(),
                )
            }
            ApiError::ExtractionTimeout(secs) => (
                StatusCode::GATEWAY_TIMEOUT,
                "EXTRACTION_TIMEOUT",
                format!("Extraction did not finish within {secs}s"),
            ),
            ApiError::Upstream(detail) => {
                tracing::error!(detail = %detail, "Extraction upstream error");
                (
                    StatusCode::BAD_GATEWAY,
                    "UPSTREAM_ERROR",
                    "The extraction service failed".to_string(),
                )
            }
            ApiError::ExtractionUnavailable(detail) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "EXTRACTION_UNAVAILABLE",
                detail,
            ),
            ApiError::Internal(detail) => {
                tracing::error!(detail = %detail, "API internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = ErrorBody {
            error: ErrorDetail { code, message },
        };
        (status, Json(body)).into_response()
    }
}

impl From<ShareError> for ApiError {
    fn from(err: ShareError) -> Self {
        match err {
            ShareError::InvalidTtl(ttl) => ApiError::InvalidTtl(ttl),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<ExtractionError> for ApiError {
    fn from(err: ExtractionError) -> Self {
        match err {
            ExtractionError::UnsupportedInput(content_type) => {
                ApiError::UnsupportedInput(content_type)
            }
            ExtractionError::NoResponseContent => ApiError::NoResponseContent,
            ExtractionError::MalformedResponse(detail) => ApiError::MalformedResponse(detail),
            ExtractionError::Timeout(secs) => ApiError::ExtractionTimeout(secs),
            ExtractionError::NotConfigured(detail) => ApiError::ExtractionUnavailable(detail),
            e @ (ExtractionError::Upstream { .. }
            | ExtractionError::HttpClient(_)
            | ExtractionError::ResponseParsing(_)) => ApiError::Upstream(e.to_string()),
        }
    }
}
