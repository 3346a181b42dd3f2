use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use base64::Engine as _;
use serde::{Deserialize, Serialize};

use super::prompt::{EXTRACTION_PROMPT, EXTRACTION_SYSTEM_PROMPT};
use super::types::{DocumentInput, ExtractionClient};
use super::ExtractionError;

pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
pub const DEFAULT_MODEL: &str = "claude-opus-4-6";

const API_VERSION: &str = "2023-06-01";
/// Beta flag required for Files API uploads and `file` document sources.
const FILES_BETA: &str = "files-api-2025-04-14";
const MAX_TOKENS: u32 = 4096;

/// Anthropic Messages API client for exam extraction.
///
/// Images go inline as base64. PDFs are uploaded through the Files API,
/// referenced by id, and deleted once the message call returns.
pub struct AnthropicClient {
    base_url: String,
    api_key: String,
    model: String,
    client: reqwest::blocking::Client,
    timeout_secs: u64,
}

impl AnthropicClient {
    pub fn new(
        api_key: &str,
        model: &str,
        base_url: &str,
        timeout_secs: u64,
    ) -> Result<Self, ExtractionError> {
        if api_key.trim().is_empty() {
            return Err(ExtractionError::NotConfigured("API key is empty".into()));
        }

        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| ExtractionError::HttpClient(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
            client,
            timeout_secs,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn send_message(
        &self,
        source: ContentBlock<'_>,
        beta: Option<&str>,
    ) -> Result<String, ExtractionError> {
        let url = format!("{}/v1/messages", self.base_url);
        let body = MessagesRequest {
            model: &self.model,
            max_tokens: MAX_TOKENS,
            system: EXTRACTION_SYSTEM_PROMPT,
            messages: vec![Message {
                role: "user",
                content: vec![
                    source,
                    ContentBlock::Text {
                        text: EXTRACTION_PROMPT,
                    },
                ],
            }],
        };

        let mut request = self.authorized(self.client.post(&url)).json(&body);
        if let Some(beta) = beta {
            request = request.header("anthropic-beta", beta);
        }
        let response = request.send().map_err(|e| self.transport_error(e))?;
        let response = check_status(response)?;

        let parsed: MessagesResponse = response
            .json()
            .map_err(|e| ExtractionError::ResponseParsing(e.to_string()))?;

        first_text_block(parsed)
    }

    fn upload_pdf(&self, document: &DocumentInput) -> Result<String, ExtractionError> {
        let url = format!("{}/v1/files", self.base_url);
        let part = reqwest::blocking::multipart::Part::bytes(document.bytes.clone())
            .file_name(document.file_name.clone())
            .mime_str(document.media_type.as_str())
            .map_err(|e| ExtractionError::HttpClient(e.to_string()))?;
        let form = reqwest::blocking::multipart::Form::new().part("file", part);

        let response = self
            .authorized(self.client.post(&url))
            .header("anthropic-beta", FILES_BETA)
            .multipart(form)
            .send()
            .map_err(|e| self.transport_error(e))?;
        let response = check_status(response)?;

        let uploaded: FileUploadResponse = response
            .json()
            .map_err(|e| ExtractionError::ResponseParsing(e.to_string()))?;
        Ok(uploaded.id)
    }

    /// Best effort: a failed delete is logged, never surfaced.
    fn delete_file(&self, file_id: &str) {
        let url = format!("{}/v1/files/{}", self.base_url, file_id);
        let result = self
            .authorized(self.client.delete(&url))
            .header("anthropic-beta", FILES_BETA)
            .send();
        match result {
            Ok(resp) if resp.status().is_success() => {
                tracing::debug!(file_id, "Deleted uploaded exam PDF");
            }
            Ok(resp) => {
                tracing::warn!(
                    file_id,
                    status = resp.status().as_u16(),
                    "Uploaded PDF delete rejected"
                );
            }
            Err(e) => tracing::warn!(file_id, "Uploaded PDF delete failed: {e}"),
        }
    }

    fn authorized(
        &self,
        builder: reqwest::blocking::RequestBuilder,
    ) -> reqwest::blocking::RequestBuilder {
        builder
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
    }

    fn transport_error(&self, e: reqwest::Error) -> ExtractionError {
        if e.is_timeout() {
            ExtractionError::Timeout(self.timeout_secs)
        } else {
            ExtractionError::HttpClient(e.to_string())
        }
    }
}

impl ExtractionClient for AnthropicClient {
    fn extract(&self, document: &DocumentInput) -> Result<String, ExtractionError> {
        tracing::info!(
            media_type = document.media_type.as_str(),
            bytes = document.bytes.len(),
            model = %self.model,
            "Sending exam document for extraction"
        );

        if !document.media_type.is_pdf() {
            let data = base64::engine::general_purpose::STANDARD.encode(&document.bytes);
            let source = ContentBlock::Image {
                source: ImageSource::Base64 {
                    media_type: document.media_type.as_str(),
                    data,
                },
            };
            return self.send_message(source, None);
        }

        let file_id = self.upload_pdf(document)?;
        let result = self.send_message(
            ContentBlock::Document {
                source: DocumentSource::File { file_id: &file_id },
            },
            Some(FILES_BETA),
        );
        self.delete_file(&file_id);
        result
    }
}

fn check_status(
    response: reqwest::blocking::Response,
) -> Result<reqwest::blocking::Response, ExtractionError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().unwrap_or_default();
    Err(ExtractionError::Upstream {
        status: status.as_u16(),
        body,
    })
}

/// The first non-empty text block, or `NoResponseContent`.
fn first_text_block(response: MessagesResponse) -> Result<String, ExtractionError> {
    response
        .content
        .into_iter()
        .find_map(|block| match block {
            ResponseBlock::Text { text } if !text.trim().is_empty() => Some(text),
            _ => None,
        })
        .ok_or(ExtractionError::NoResponseContent)
}

/// Request body for `POST /v1/messages`
#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: Vec<Message<'a>>,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'static str,
    content: Vec<ContentBlock<'a>>,
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock<'a> {
    Image { source: ImageSource<'a> },
    Document { source: DocumentSource<'a> },
    Text { text: &'a str },
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ImageSource<'a> {
    Base64 { media_type: &'a str, data: String },
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum DocumentSource<'a> {
    File { file_id: &'a str },
}

/// Response body from `POST /v1/messages`
#[derive(Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ResponseBlock>,
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ResponseBlock {
    Text {
        text: String,
    },
    #[serde(other)]
    Other,
}

/// Response body from `POST /v1/files`
#[derive(Deserialize)]
struct FileUploadResponse {
    id: String,
}

/// What a `MockExtractionClient` answers with.
#[derive(Debug, Clone)]
pub enum MockReply {
    Text(String),
    NoContent,
    Timeout(u64),
}

/// Mock extraction client for testing. Returns a configured reply and
/// records what it was asked.
pub struct MockExtractionClient {
    reply: MockReply,
    calls: AtomicUsize,
    last_media_type: Mutex<Option<&'static str>>,
}

impl MockExtractionClient {
    pub fn new(response: &str) -> Self {
        Self::with_reply(MockReply::Text(response.to_string()))
    }

    pub fn with_reply(reply: MockReply) -> Self {
        Self {
            reply,
            calls: AtomicUsize::new(0),
            last_media_type: Mutex::new(None),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_media_type(&self) -> Option<&'static str> {
        self.last_media_type.lock().ok().and_then(|guard| *guard)
    }
}

impl ExtractionClient for MockExtractionClient {
    fn extract(&self, document: &DocumentInput) -> Result<String, ExtractionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut last) = self.last_media_type.lock() {
            *last = Some(document.media_type.as_str());
        }
        match &self.reply {
            MockReply::Text(text) => Ok(text.clone()),
            MockReply::NoContent => Err(ExtractionError::NoResponseContent),
            MockReply::Timeout(secs) => Err(ExtractionError::Timeout(*secs)),
        }
    }
}
