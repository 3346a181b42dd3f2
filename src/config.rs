use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::pipeline::extraction::{DEFAULT_BASE_URL, DEFAULT_MODEL};

/// Application-level constants
pub const APP_NAME: &str = "ExamShare";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

pub const DEFAULT_BIND: &str = "127.0.0.1:3000";
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 300;
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;
pub const DEFAULT_EXTRACTION_TIMEOUT_SECS: u64 = 60;

const DB_FILE_NAME: &str = "exam-shares.db";

/// Get the application data directory.
/// Falls back to the working directory when the platform has none.
pub fn app_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

/// Default database location
pub fn default_db_path() -> PathBuf {
    app_data_dir().join(DB_FILE_NAME)
}

/// Tracing filter used when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    "exam_share_lib=info,exam_share=info,tower_http=warn"
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value:?} ({reason})")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Runtime settings for the server binary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub bind: SocketAddr,
    pub db_path: PathBuf,
    /// Origin used to build share URLs, e.g. `https://exams.example.org`.
    pub public_base_url: Option<String>,
    pub sweep_interval: Duration,
    pub max_upload_bytes: usize,
    pub anthropic_api_key: Option<String>,
    pub anthropic_model: String,
    pub anthropic_base_url: String,
    pub extraction_timeout_secs: u64,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let bind: SocketAddr = parse_or(
            "EXAM_SHARE_BIND",
            get("EXAM_SHARE_BIND"),
            DEFAULT_BIND.parse(),
        )?;
        let sweep_secs = parse_or(
            "EXAM_SHARE_SWEEP_INTERVAL_SECS",
            get("EXAM_SHARE_SWEEP_INTERVAL_SECS"),
            Ok::<u64, std::num::ParseIntError>(DEFAULT_SWEEP_INTERVAL_SECS),
        )?;
        if sweep_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "EXAM_SHARE_SWEEP_INTERVAL_SECS",
                value: "0".into(),
                reason: "must be greater than zero".into(),
            });
        }
        let max_upload_bytes = parse_or(
            "EXAM_SHARE_MAX_UPLOAD_BYTES",
            get("EXAM_SHARE_MAX_UPLOAD_BYTES"),
            Ok::<usize, std::num::ParseIntError>(DEFAULT_MAX_UPLOAD_BYTES),
        )?;
        let extraction_timeout_secs = parse_or(
            "EXTRACTION_TIMEOUT_SECS",
            get("EXTRACTION_TIMEOUT_SECS"),
            Ok::<u64, std::num::ParseIntError>(DEFAULT_EXTRACTION_TIMEOUT_SECS),
        )?;

        Ok(Self {
            bind,
            db_path: get("EXAM_SHARE_DB")
                .map(PathBuf::from)
                .unwrap_or_else(default_db_path),
            public_base_url: get("EXAM_SHARE_PUBLIC_URL")
                .map(|url| url.trim_end_matches('/').to_string()),
            sweep_interval: Duration::from_secs(sweep_secs),
            max_upload_bytes,
            anthropic_api_key: get("ANTHROPIC_API_KEY"),
            anthropic_model: get("ANTHROPIC_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            anthropic_base_url: get("ANTHROPIC_BASE_URL")
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            extraction_timeout_secs,
        })
    }
}

/// Parse `raw` when present, otherwise use `default`.
fn parse_or<T, E>(
    key: &'static str,
    raw: Option<String>,
    default: Result<T, E>,
) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
    E: std::fmt::Display,
{
    match raw {
        Some(value) => value.parse::<T>().map_err(|e| ConfigError::InvalidValue {
            key,
            reason: e.to_string(),
            value,
        }),
        None => default.map_err(|e| ConfigError::InvalidValue {
            key,
            value: String::new(),
            reason: e.to_string(),
        }),
    }
}
