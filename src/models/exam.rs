//! Normalized exam record, the shape every extraction result is
//! coerced into before it is returned or shared.
//!
//! Every text field is always present. Unknown values are empty
//! strings, never `null` and never omitted, so consumers can render
//! the record without null checks.

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};

use thiserror::Error;

/// One extracted exam document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExamRecord {
    #[serde(default, deserialize_with = "lenient_string")]
    pub exam_type: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub exam_date: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub laboratory_or_clinic: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub patient: PatientInfo,
    /// Document order is preserved.
    #[serde(default, deserialize_with = "null_as_default")]
    pub results: Vec<Measurement>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub physician: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub notes: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientInfo {
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub age: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub gender: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: String,
}

/// A single measured parameter from the results table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Measurement {
    #[serde(default, deserialize_with = "lenient_string")]
    pub parameter: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub value: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub unit: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub reference_range: String,
    #[serde(default)]
    pub status: MeasurementStatus,
}

/// How a value compares to its reference range.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum MeasurementStatus {
    Normal,
    High,
    Low,
    Abnormal,
    #[default]
    Unknown,
}

impl MeasurementStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::High => "high",
            Self::Low => "low",
            Self::Abnormal => "abnormal",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for MeasurementStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A status token outside the five known values.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unrecognised measurement status: {0:?}")]
pub struct UnknownStatus(pub String);

impl std::str::FromStr for MeasurementStatus {
    type Err = UnknownStatus;

    /// Case-insensitive; surrounding whitespace is ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "normal" => Ok(Self::Normal),
            "high" => Ok(Self::High),
            "low" => Ok(Self::Low),
            "abnormal" => Ok(Self::Abnormal),
            "unknown" => Ok(Self::Unknown),
            _ => Err(UnknownStatus(s.to_string())),
        }
    }
}

impl Serialize for MeasurementStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for MeasurementStatus {
    /// `null` and `""` mean the model had no range to compare against.
    /// Any other unrecognised token is rejected.
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match Option::<String>::deserialize(deserializer)? {
            None => Ok(Self::Unknown),
            Some(raw) if raw.trim().is_empty() => Ok(Self::Unknown),
            Some(raw) => raw.parse().map_err(de::Error::custom),
        }
    }
}

/// Accept a string, `null`, number or boolean in a text position.
///
/// Models occasionally emit `"value": 4.2` or `"age": null`; both are
/// kept as text so the record shape never changes.
fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::Null => Ok(String::new()),
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        serde_json::Value::Bool(b) => Ok(b.to_string()),
        other => Err(de::Error::custom(format!(
            "expected text, found {}",
            json_kind(&other)
        ))),
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

pub(crate) fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
