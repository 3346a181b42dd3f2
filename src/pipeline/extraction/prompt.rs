pub const EXTRACTION_SYSTEM_PROMPT: &str = "You are a medical data extraction assistant. \
You read medical exam documents and extract structured data. \
Always return only valid JSON, no prose or markdown.";

/// Instruction sent alongside every document. The schema here is the
/// wire shape of `ExamRecord`.
pub const EXTRACTION_PROMPT: &str = r#"Extract all health data from this medical exam document.

Return a JSON object with EXACTLY this structure, no extra fields, no markdown:
{
  "exam_type": "type of exam (e.g. Complete Blood Count, Lipid Panel, Urinalysis, X-Ray report)",
  "exam_date": "date as shown on the document, or empty string",
  "laboratory_or_clinic": "name of lab or clinic, or empty string",
  "patient": {
    "name": "patient full name, or empty string",
    "age": "patient age, or empty string",
    "gender": "patient gender, or empty string",
    "id": "patient ID / document number, or empty string"
  },
  "results": [
    {
      "parameter": "test or measurement name",
      "value": "measured value as a string",
      "unit": "unit of measurement, or empty string",
      "reference_range": "normal reference range shown, or empty string",
      "status": "normal | high | low | abnormal | unknown"
    }
  ],
  "physician": "ordering or signing physician name, or empty string",
  "notes": "any additional clinical notes or observations, or empty string"
}

Rules:
- Include every measurable parameter you can read from the document.
- Determine status by comparing the value to the reference range shown; use "unknown" when no range is available.
- If a field is not present in the document, use an empty string. Never omit a field.
- Return ONLY the JSON object, nothing else."#;
