use super::ExtractionError;

/// Document formats the extraction model accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaType {
    Jpeg,
    Png,
    Gif,
    Webp,
    Pdf,
}

impl MediaType {
    pub const ALL: [MediaType; 5] = [Self::Jpeg, Self::Png, Self::Gif, Self::Webp, Self::Pdf];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::Gif => "image/gif",
            Self::Webp => "image/webp",
            Self::Pdf => "application/pdf",
        }
    }

    /// Parse a `Content-Type` value. Parameters (`; charset=…`) and case
    /// are ignored; anything outside the allowlist is `UnsupportedInput`.
    pub fn from_content_type(content_type: &str) -> Result<Self, ExtractionError> {
        let essence = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|m| m.as_str() == essence)
            .ok_or_else(|| ExtractionError::UnsupportedInput(content_type.to_string()))
    }

    pub fn is_pdf(&self) -> bool {
        matches!(self, Self::Pdf)
    }

    fn default_file_name(&self) -> &'static str {
        match self {
            Self::Jpeg => "exam.jpg",
            Self::Png => "exam.png",
            Self::Gif => "exam.gif",
            Self::Webp => "exam.webp",
            Self::Pdf => "exam.pdf",
        }
    }
}

/// One uploaded exam document.
#[derive(Debug, Clone)]
pub struct DocumentInput {
    pub media_type: MediaType,
    pub bytes: Vec<u8>,
    pub file_name: String,
}

impl DocumentInput {
    pub fn new(media_type: MediaType, bytes: Vec<u8>, file_name: Option<&str>) -> Self {
        let file_name = file_name
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(media_type.default_file_name())
            .to_string();
        Self {
            media_type,
            bytes,
            file_name,
        }
    }
}

/// The extraction collaborator: document in, raw model text out.
///
/// Implementations block; async callers run them on the blocking pool.
pub trait ExtractionClient: Send + Sync {
    fn extract(&self, document: &DocumentInput) -> Result<String, ExtractionError>;
}
