//! Error taxonomy for docqa.
//!
//! Every fallible operation returns `anyhow::Result`; the failures callers
//! need to tell apart are raised as [`RagError`] so they can be recovered
//! with `err.downcast_ref::<RagError>()`.

use std::fmt;
use std::path::PathBuf;

/// Terminal failures of a docqa invocation.
#[derive(Debug)]
pub enum RagError {
    /// Missing credential or an invalid configuration value.
    Configuration(String),
    /// The document to index does not exist.
    DocumentNotFound(PathBuf),
    /// Text could not be extracted from the document.
    Extraction(String),
    /// The document produced no text after trimming.
    EmptyDocument,
    /// The embedding service failed (HTTP error, transport, timeout, bad body).
    EmbeddingService {
        status: Option<u16>,
        message: String,
    },
    /// The chat-completion service failed.
    AnswerService {
        status: Option<u16>,
        message: String,
    },
    /// The persisted index is malformed or violates its invariants.
    IndexCorrupt(String),
    /// Two vectors that must share a length do not.
    DimensionMismatch { expected: usize, actual: usize },
    /// The index was built with a different embedding model.
    ModelMismatch { indexed: String, configured: String },
}

impl RagError {
    pub fn embedding(status: Option<u16>, message: impl Into<String>) -> Self {
        RagError::EmbeddingService {
            status,
            message: message.into(),
        }
    }

    pub fn answer(status: Option<u16>, message: impl Into<String>) -> Self {
        RagError::AnswerService {
            status,
            message: message.into(),
        }
    }
}

fn status_suffix(status: &Option<u16>) -> String {
    match status {
        Some(code) => format!(" (status {})", code),
        None => String::new(),
    }
}

impl fmt::Display for RagError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RagError::Configuration(msg) => write!(f, "configuration error: {}", msg),
            RagError::DocumentNotFound(path) => {
                write!(f, "document not found: {}", path.display())
            }
            RagError::Extraction(msg) => write!(f, "text extraction failed: {}", msg),
            RagError::EmptyDocument => {
                write!(f, "document is empty: no text could be extracted")
            }
            RagError::EmbeddingService { status, message } => write!(
                f,
                "embedding service error{}: {}",
                status_suffix(status),
                message
            ),
            RagError::AnswerService { status, message } => write!(
                f,
                "answer service error{}: {}",
                status_suffix(status),
                message
            ),
            RagError::IndexCorrupt(msg) => write!(f, "index is corrupt: {}", msg),
            RagError::DimensionMismatch { expected, actual } => write!(
                f,
                "embedding dimension mismatch: expected {}, got {}",
                expected, actual
            ),
            RagError::ModelMismatch {
                indexed,
                configured,
            } => write!(
                f,
                "index was built with embedding model '{}' but '{}' is configured; \
                 rebuild the index with --rebuild",
                indexed, configured
            ),
        }
    }
}

impl std::error::Error for RagError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_errors_include_status() {
        let err = RagError::embedding(Some(401), "Incorrect API key provided");
        assert_eq!(
            err.to_string(),
            "embedding service error (status 401): Incorrect API key provided"
        );

        let err = RagError::answer(None, "operation timed out");
        assert_eq!(err.to_string(), "answer service error: operation timed out");
    }

    #[test]
    fn test_document_not_found_message() {
        let err = RagError::DocumentNotFound(PathBuf::from("missing.pdf"));
        assert!(err.to_string().contains("document not found"));
        assert!(err.to_string().contains("missing.pdf"));
    }

    #[test]
    fn test_downcast_through_anyhow() {
        let err: anyhow::Error = RagError::EmptyDocument.into();
        let err = err.context("building index");
        assert!(matches!(
            err.downcast_ref::<RagError>(),
            Some(RagError::EmptyDocument)
        ));
    }
}
