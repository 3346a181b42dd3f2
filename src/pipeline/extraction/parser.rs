use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;

use super::ExtractionError;
use crate::models::exam::json_kind;
use crate::models::ExamRecord;

/// Opening fence with an optional language tag (```json, ```JSON, ```).
static OPEN_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^```[A-Za-z0-9_+-]*[ \t]*(?:\r?\n)?").unwrap());

static CLOSE_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:\r?\n)?[ \t]*```$").unwrap());

/// Parse the model's raw text into an `ExamRecord`.
///
/// Fenced-block wrappers and surrounding whitespace are stripped first.
/// The remainder must be one JSON object; missing fields take their
/// defaults. Anything else is `MalformedResponse` and no partial record
/// is produced.
pub fn normalize_extraction_response(response: &str) -> Result<ExamRecord, ExtractionError> {
    let json_str = strip_code_fences(response);
    if json_str.is_empty() {
        return Err(ExtractionError::MalformedResponse(
            "empty response text".into(),
        ));
    }

    let value: serde_json::Value = serde_json::from_str(json_str)
        .map_err(|e| ExtractionError::MalformedResponse(format!("invalid JSON: {e}")))?;

    if !value.is_object() {
        return Err(ExtractionError::MalformedResponse(format!(
            "expected a JSON object, found {}",
            json_kind(&value)
        )));
    }

    ExamRecord::deserialize(value)
        .map_err(|e| ExtractionError::MalformedResponse(format!("schema mismatch: {e}")))
}

/// Remove a leading and trailing markdown fence, if present.
pub fn strip_code_fences(response: &str) -> &str {
    let trimmed = response.trim();
    let without_open = match OPEN_FENCE.find(trimmed) {
        Some(m) => &trimmed[m.end()..],
        None => trimmed,
    };
    let without_close = match CLOSE_FENCE.find(without_open) {
        Some(m) => &without_open[..m.start()],
        None => without_open,
    };
    without_close.trim()
}
