//! Document text extraction.
//!
//! Reads the document from disk, picks an extractor from the file
//! extension and returns trimmed UTF-8 text together with a SHA-256
//! fingerprint of the raw bytes. PDFs go through `pdf-extract`; every other
//! extension is read as UTF-8 text.

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use std::path::Path;

use crate::error::RagError;

pub const MIME_PDF: &str = "application/pdf";
pub const MIME_TEXT: &str = "text/plain";

/// Extracted document text plus the fingerprint of the source file.
#[derive(Debug, Clone)]
pub struct DocumentText {
    /// Extracted text with surrounding whitespace trimmed. Never empty.
    pub text: String,
    /// Lowercase hex SHA-256 of the raw file bytes.
    pub sha256: String,
}

/// Map a file path to the content type used to choose an extractor.
pub fn content_type_for(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("pdf") => MIME_PDF,
        _ => MIME_TEXT,
    }
}

/// Read and extract a document.
///
/// Fails with [`RagError::DocumentNotFound`] if the path does not exist,
/// [`RagError::Extraction`] if the bytes cannot be decoded, and
/// [`RagError::EmptyDocument`] if no text remains after trimming.
pub fn load_document(path: &Path) -> Result<DocumentText> {
    if !path.exists() {
        return Err(RagError::DocumentNotFound(path.to_path_buf()).into());
    }

    let bytes = std::fs::read(path)
        .with_context(|| format!("Failed to read document: {}", path.display()))?;
    let content_type = content_type_for(path);

    let text = extract_text(&bytes, content_type)?;
    let text = text.trim();
    if text.is_empty() {
        return Err(RagError::EmptyDocument.into());
    }

    tracing::info!(
        path = %path.display(),
        content_type,
        chars = text.chars().count(),
        "extracted document text"
    );

    Ok(DocumentText {
        text: text.to_string(),
        sha256: fingerprint(&bytes),
    })
}

/// Extract plain text from raw bytes of the given content type.
pub fn extract_text(bytes: &[u8], content_type: &str) -> Result<String, RagError> {
    match content_type {
        MIME_PDF => extract_pdf(bytes),
        _ => String::from_utf8(bytes.to_vec())
            .map_err(|e| RagError::Extraction(format!("document is not valid UTF-8: {}", e))),
    }
}

fn extract_pdf(bytes: &[u8]) -> Result<String, RagError> {
    pdf_extract::extract_text_from_mem(bytes)
        .map_err(|e| RagError::Extraction(format!("PDF extraction failed: {}", e)))
}

/// SHA-256 of a byte slice as lowercase hex.
pub fn fingerprint(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Fingerprint a file on disk without extracting it.
pub fn fingerprint_file(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("Failed to read document: {}", path.display()))?;
    Ok(fingerprint(&bytes))
}
