//! Application state shared by every HTTP handler.
//!
//! Built once at startup and wrapped in `Arc`. Tests build their own
//! instance around an in-memory store and a mock extraction client.

use std::sync::Arc;

use crate::config::DEFAULT_MAX_UPLOAD_BYTES;
use crate::pipeline::extraction::{ExtractionClient, ExtractionError};
use crate::share::ShareStore;

/// Fallback host for share URLs when a request carries no `Host`.
pub const FALLBACK_SHARE_HOST: &str = "localhost:3000";

pub struct CoreState {
    pub shares: Arc<ShareStore>,
    /// `None` when no API key is configured; extraction then answers 503.
    extractor: Option<Arc<dyn ExtractionClient>>,
    /// Origin for share URLs, without trailing slash.
    public_base_url: Option<String>,
    pub max_upload_bytes: usize,
}

impl CoreState {
    pub fn new(shares: Arc<ShareStore>) -> Self {
        Self {
            shares,
            extractor: None,
            public_base_url: None,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }

    pub fn with_extractor(mut self, extractor: Arc<dyn ExtractionClient>) -> Self {
        self.extractor = Some(extractor);
        self
    }

    pub fn with_public_base_url(mut self, url: Option<String>) -> Self {
        self.public_base_url = url.map(|u| u.trim_end_matches('/').to_string());
        self
    }

    pub fn with_max_upload_bytes(mut self, bytes: usize) -> Self {
        self.max_upload_bytes = bytes;
        self
    }

    pub fn extractor(&self) -> Result<Arc<dyn ExtractionClient>, ExtractionError> {
        self.extractor.clone().ok_or_else(|| {
            ExtractionError::NotConfigured("set ANTHROPIC_API_KEY to enable extraction".into())
        })
    }

    /// Public link for a share id.
    ///
    /// Uses the configured base URL, else `https://<host>`.
    pub fn share_url(&self, host: Option<&str>, id: &str) -> String {
        match &self.public_base_url {
            Some(base) => format!("{base}/share/{id}"),
            None => {
                let host = host
                    .map(str::trim)
                    .filter(|h| !h.is_empty())
                    .unwrap_or(FALLBACK_SHARE_HOST);
                format!("https://{host}/share/{id}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::extraction::MockExtractionClient;

    fn state() -> CoreState {
        CoreState::new(Arc::new(ShareStore::open_in_memory().unwrap()))
    }

    #[test]
    fn extractor_missing_is_not_configured() {
        assert!(matches!(
            state().extractor(),
            Err(ExtractionError::NotConfigured(_))
        ));
    }

    #[test]
    fn extractor_present_after_builder() {
        let core = state().with_extractor(Arc::new(MockExtractionClient::new("{}")));
        assert!(core.extractor().is_ok());
    }

    #[test]
    fn share_url_prefers_configured_base() {
        let core = state().with_public_base_url(Some("https://exams.example.org/".into()));
        assert_eq!(
            core.share_url(Some("ignored:9000"), "abc"),
            "https://exams.example.org/share/abc"
        );
    }

    #[test]
    fn share_url_uses_host_header() {
        assert_eq!(
            state().share_url(Some("exams.local:8443"), "abc"),
            "https://exams.local:8443/share/abc"
        );
    }

    #[test]
    fn share_url_falls_back_to_localhost() {
        assert_eq!(
            state().share_url(None, "abc"),
            "https://localhost:3000/share/abc"
        );
    }

    #[test]
    fn default_upload_limit() {
        assert_eq!(state().max_upload_bytes, DEFAULT_MAX_UPLOAD_BYTES);
        assert_eq!(state().with_max_upload_bytes(1024).max_upload_bytes, 1024);
    }
}
