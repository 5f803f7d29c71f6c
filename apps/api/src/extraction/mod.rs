//! Document extraction — turns an uploaded resume into text the analysis passes can use.
//!
//! DOCX is converted locally. PDF is forwarded as raw bytes so the cleanup pass can
//! OCR it remotely; the local PDF text layer is only a best-effort hint.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::AnalysisError;

pub mod docx;
pub mod pdf;

pub const PDF_MIME: &str = "application/pdf";
pub const DOCX_MIME: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

const OCTET_STREAM_MIME: &str = "application/octet-stream";

/// The two accepted resume formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Pdf,
    Docx,
}

impl MediaType {
    pub fn mime(&self) -> &'static str {
        match self {
            MediaType::Pdf => PDF_MIME,
            MediaType::Docx => DOCX_MIME,
        }
    }

    /// Resolves the declared MIME type of an upload. Falls back to the file
    /// extension only when the client did not declare a specific type.
    pub fn resolve(declared: &str, file_name: Option<&str>) -> Result<Self, AnalysisError> {
        let essence = declared
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        let effective = if essence.is_empty() || essence == OCTET_STREAM_MIME {
            file_name
                .and_then(|name| mime_guess::from_path(name).first_raw())
                .map(str::to_string)
                .unwrap_or(essence)
        } else {
            essence
        };

        match effective.as_str() {
            PDF_MIME => Ok(MediaType::Pdf),
            DOCX_MIME => Ok(MediaType::Docx),
            "" => Err(AnalysisError::UnsupportedFormat("unknown".to_string())),
            other => Err(AnalysisError::UnsupportedFormat(other.to_string())),
        }
    }
}

/// A file as received from the user. Owned by one analysis run, never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadedDocument {
    pub file_name: Option<String>,
    pub declared_type: String,
    pub content: Bytes,
}

impl UploadedDocument {
    pub fn new(file_name: Option<String>, declared_type: impl Into<String>, content: Bytes) -> Self {
        Self {
            file_name,
            declared_type: declared_type.into(),
            content,
        }
    }

    pub fn size(&self) -> usize {
        self.content.len()
    }

    pub fn media_type(&self) -> Result<MediaType, AnalysisError> {
        MediaType::resolve(&self.declared_type, self.file_name.as_deref())
    }
}

/// Output of extraction: local text plus, for PDFs, the raw bytes for remote OCR.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedResume {
    pub media_type: MediaType,
    /// Empty for a PDF without a usable text layer; that is not an error.
    pub text: String,
    pub pdf: Option<Bytes>,
}

/// Extracts text from an uploaded document. Pure over the in-memory buffer.
///
/// Rejects anything that is not PDF or DOCX before looking at the content.
pub fn extract(document: &UploadedDocument) -> Result<ExtractedResume, AnalysisError> {
    let media_type = document.media_type()?;

    let extracted = match media_type {
        MediaType::Docx => ExtractedResume {
            media_type,
            text: docx::extract_text(&document.content)?,
            pdf: None,
        },
        MediaType::Pdf => ExtractedResume {
            media_type,
            text: pdf::text_layer(&document.content),
            pdf: Some(document.content.clone()),
        },
    };

    debug!(
        "Extracted {} chars from {:?} upload ({} bytes)",
        extracted.text.len(),
        media_type,
        document.size()
    );
    Ok(extracted)
}
