//! Exam extraction: send a document to the multimodal model, then
//! normalize whatever text comes back into an `ExamRecord`.
//!
//! The model call is the only slow step in the service and is always
//! bounded by the client timeout. Faults are never retried here; each
//! call is billed upstream.

pub mod anthropic;
pub mod parser;
pub mod prompt;
pub mod types;

pub use anthropic::*;
pub use parser::*;
pub use prompt::*;
pub use types::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("Unsupported file type: {0}. Use JPEG, PNG, GIF, WEBP, or PDF.")]
    UnsupportedInput(String),

    #[error("No text response from the extraction model")]
    NoResponseContent,

    #[error("Malformed extraction response: {0}")]
    MalformedResponse(String),

    #[error("Extraction request timed out after {0}s")]
    Timeout(u64),

    #[error("Extraction API returned error (status {status}): {body}")]
    Upstream { status: u16, body: String },

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Response parsing error: {0}")]
    ResponseParsing(String),

    #[error("Extraction is not configured: {0}")]
    NotConfigured(String),
}
