//! Persisted embedding index.
//!
//! An [`Index`] holds two parallel sequences, chunk texts and their
//! embedding vectors, plus metadata describing how it was built. It is
//! written once per document as pretty-printed JSON and only read afterwards.
//!
//! # File format
//!
//! ```json
//! {
//!   "version": 1,
//!   "model": "text-embedding-3-small",
//!   "dims": 1536,
//!   "source_sha256": "ab12…",
//!   "created_at": "2026-01-01T00:00:00+00:00",
//!   "chunks": ["…", "…"],
//!   "embeddings": [[0.1, …], [0.2, …]]
//! }
//! ```
//!
//! Files without a `version` field (only `chunks` and `embeddings`) are
//! read as version 0. They get structural validation only.
//!
//! # Invariants
//!
//! - `chunks.len() == embeddings.len() >= 1`
//! - every vector is non-empty and all vectors share one length
//! - every component is a finite number
//! - for version 1, `dims` (when present) equals that length

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::chunk::{self, Chunk};
use crate::embedding::EmbeddingProvider;
use crate::error::RagError;
use crate::extract;

/// Newest index format this build reads and the one it writes.
pub const INDEX_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Index {
    #[serde(default)]
    pub version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dims: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_sha256: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    pub chunks: Vec<String>,
    pub embeddings: Vec<Vec<f32>>,
}

impl Index {
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Length shared by every stored vector.
    pub fn vector_dims(&self) -> Option<usize> {
        self.embeddings.first().map(|v| v.len())
    }

    /// Check the structural invariants listed in the module docs.
    pub fn validate(&self) -> Result<(), RagError> {
        if self.version > INDEX_VERSION {
            return Err(RagError::IndexCorrupt(format!(
                "unsupported index version {} (newest supported is {})",
                self.version, INDEX_VERSION
            )));
        }
        if self.chunks.len() != self.embeddings.len() {
            return Err(RagError::IndexCorrupt(format!(
                "{} chunks but {} embeddings",
                self.chunks.len(),
                self.embeddings.len()
            )));
        }
        let dims = match self.vector_dims() {
            Some(d) => d,
            None => return Err(RagError::IndexCorrupt("index contains no chunks".to_string())),
        };
        if dims == 0 {
            return Err(RagError::IndexCorrupt("embedding 1 is empty".to_string()));
        }
        if let Some(pos) = self.embeddings.iter().position(|v| v.len() != dims) {
            return Err(RagError::IndexCorrupt(format!(
                "embedding {} has {} dimensions, expected {}",
                pos + 1,
                self.embeddings[pos].len(),
                dims
            )));
        }
        for (pos, vector) in self.embeddings.iter().enumerate() {
            if let Some(x) = vector.iter().find(|x| !x.is_finite()) {
                return Err(RagError::IndexCorrupt(format!(
                    "embedding {} contains a non-finite value ({})",
                    pos + 1,
                    x
                )));
            }
        }
        if self.version >= 1 {
            if let Some(declared) = self.dims {
                if declared != dims {
                    return Err(RagError::IndexCorrupt(format!(
                        "header declares {} dimensions but vectors have {}",
                        declared, dims
                    )));
                }
            }
        }
        Ok(())
    }

    /// Write the index to `path` atomically.
    ///
    /// The JSON goes to a temporary file in the destination directory, is
    /// flushed to disk, then renamed over `path`. An interrupted write
    /// leaves any previous file untouched.
    pub fn persist(&self, path: &Path) -> Result<()> {
        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create index directory: {}", dir.display()))?;

        let json = serde_json::to_vec_pretty(self).context("Failed to serialize index")?;

        let mut tmp = tempfile::NamedTempFile::new_in(&dir)
            .with_context(|| format!("Failed to create temporary file in {}", dir.display()))?;
        tmp.write_all(&json)
            .context("Failed to write index to temporary file")?;
        tmp.as_file()
            .sync_all()
            .context("Failed to flush index to disk")?;
        tmp.persist(path)
            .with_context(|| format!("Failed to move index into place: {}", path.display()))?;

        tracing::info!(
            path = %path.display(),
            chunks = self.len(),
            "persisted index"
        );
        Ok(())
    }
}

/// Embed every chunk, in order, one request at a time.
///
/// The first failure aborts the build. Vectors must all have the length of
/// the first one.
pub async fn build_index(
    chunks: &[Chunk],
    provider: &dyn EmbeddingProvider,
    source_sha256: Option<String>,
) -> Result<Index> {
    let mut texts = Vec::with_capacity(chunks.len());
    let mut embeddings: Vec<Vec<f32>> = Vec::with_capacity(chunks.len());
    let mut dims: Option<usize> = None;

    for chunk in chunks {
        let vector = provider
            .embed(&chunk.text)
            .await
            .with_context(|| format!("Failed to embed chunk {} of {}", chunk.index, chunks.len()))?;

        match dims {
            None => {
                if vector.is_empty() {
                    return Err(
                        RagError::embedding(None, "provider returned an empty embedding").into(),
                    );
                }
                dims = Some(vector.len());
            }
            Some(expected) if expected != vector.len() => {
                return Err(RagError::DimensionMismatch {
                    expected,
                    actual: vector.len(),
                }
                .into());
            }
            Some(_) => {}
        }
        if vector.iter().any(|x| !x.is_finite()) {
            return Err(RagError::embedding(
                None,
                format!("embedding for chunk {} contains a non-finite value", chunk.index),
            )
            .into());
        }

        tracing::debug!(chunk = chunk.index, total = chunks.len(), "embedded chunk");
        texts.push(chunk.text.clone());
        embeddings.push(vector);
    }

    Ok(Index {
        version: INDEX_VERSION,
        model: Some(provider.model_name().to_string()),
        dims,
        source_sha256,
        created_at: Some(chrono::Utc::now().to_rfc3339()),
        chunks: texts,
        embeddings,
    })
}

/// Read and validate an index file.
pub fn load_index(path: &Path) -> Result<Index> {
    let content = std::fs::read(path)
        .with_context(|| format!("Failed to read index file: {}", path.display()))?;

    let index: Index = serde_json::from_slice(&content).map_err(|e| {
        RagError::IndexCorrupt(format!("{}: {}", path.display(), e))
    })?;
    index.validate()?;

    tracing::info!(
        path = %path.display(),
        version = index.version,
        chunks = index.len(),
        "loaded index"
    );
    Ok(index)
}

/// Parameters for [`open_or_build`].
#[derive(Debug, Clone)]
pub struct IndexRequest<'a> {
    pub index_path: &'a Path,
    pub document_path: &'a Path,
    pub max_chars: usize,
    /// Ignore an existing index file and build a fresh one over it.
    pub rebuild: bool,
}

/// Load the index if its file exists, otherwise build it from the document
/// and persist it. With `rebuild` set the existing file is not read; the new
/// index replaces it only once the build has succeeded.
///
/// A loaded index whose recorded model differs from the provider's is
/// rejected with [`RagError::ModelMismatch`]. If the document's fingerprint
/// no longer matches the recorded one, a warning is logged and the index is
/// still used.
pub async fn open_or_build(req: &IndexRequest<'_>, provider: &dyn EmbeddingProvider) -> Result<Index> {
    if req.index_path.exists() && !req.rebuild {
        let index = load_index(req.index_path)?;
        check_model(&index, provider.model_name())?;
        warn_if_stale(&index, req.document_path);
        return Ok(index);
    }

    tracing::info!(
        document = %req.document_path.display(),
        index = %req.index_path.display(),
        "no index found, building"
    );

    let document = extract::load_document(req.document_path)?;
    let chunks = chunk::chunk_text(&document.text, req.max_chars)?;
    tracing::info!(chunks = chunks.len(), max_chars = req.max_chars, "chunked document");

    let index = build_index(&chunks, provider, Some(document.sha256)).await?;
    index.persist(req.index_path)?;
    Ok(index)
}

fn check_model(index: &Index, configured: &str) -> Result<(), RagError> {
    match &index.model {
        Some(indexed) if indexed != configured => Err(RagError::ModelMismatch {
            indexed: indexed.clone(),
            configured: configured.to_string(),
        }),
        _ => Ok(()),
    }
}

fn warn_if_stale(index: &Index, document_path: &Path) {
    let recorded = match &index.source_sha256 {
        Some(s) => s,
        None => return,
    };
    if !document_path.exists() {
        return;
    }
    match extract::fingerprint_file(document_path) {
        Ok(current) if &current != recorded => tracing::warn!(
            document = %document_path.display(),
            "document changed since the index was built; answers may be stale (use --rebuild)"
        ),
        Ok(_) => {}
        Err(e) => tracing::debug!(error = %e, "could not fingerprint document"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_index() -> Index {
        Index {
            version: INDEX_VERSION,
            model: Some("test-model".to_string()),
            dims: Some(2),
            source_sha256: None,
            created_at: None,
            chunks: vec!["alpha".to_string(), "beta".to_string()],
            embeddings: vec![vec![1.0, 0.0], vec![0.0, 1.0]],
        }
    }

    fn assert_corrupt(result: Result<(), RagError>) {
        assert!(
            matches!(result, Err(RagError::IndexCorrupt(_))),
            "expected IndexCorrupt, got {:?}",
            result
        );
    }

    #[test]
    fn test_valid_index() {
        sample_index().validate().unwrap();
    }

    #[test]
    fn test_length_mismatch_is_corrupt() {
        let mut idx = sample_index();
        idx.embeddings.pop();
        assert_corrupt(idx.validate());
    }

    #[test]
    fn test_ragged_vectors_are_corrupt() {
        let mut idx = sample_index();
        idx.embeddings[1] = vec![0.0, 1.0, 2.0];
        assert_corrupt(idx.validate());
    }

    #[test]
    fn test_empty_index_is_corrupt() {
        let mut idx = sample_index();
        idx.chunks.clear();
        idx.embeddings.clear();
        assert_corrupt(idx.validate());
    }

    #[test]
    fn test_declared_dims_must_match() {
        let mut idx = sample_index();
        idx.dims = Some(3);
        assert_corrupt(idx.validate());
    }

    #[test]
    fn test_non_finite_values_are_corrupt() {
        let mut idx = sample_index();
        idx.embeddings[1] = vec![f32::NAN, 1.0];
        assert_corrupt(idx.validate());

        let mut idx = sample_index();
        idx.embeddings[0] = vec![f32::NEG_INFINITY, 0.0];
        assert_corrupt(idx.validate());
    }

    #[test]
    fn test_out_of_range_number_in_file_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rag_index.json");
        std::fs::write(
            &path,
            r#"{"chunks": ["a", "b"], "embeddings": [[1e39, 1.0], [0.5, 0.5]]}"#,
        )
        .unwrap();
        let err = load_index(&path).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<RagError>(),
            Some(RagError::IndexCorrupt(_))
        ));
        assert!(err.to_string().contains("non-finite"));
    }

    #[test]
    fn test_future_version_rejected() {
        let mut idx = sample_index();
        idx.version = INDEX_VERSION + 1;
        assert_corrupt(idx.validate());
    }

    #[test]
    fn test_persist_then_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("rag_index.json");
        let idx = sample_index();
        idx.persist(&path).unwrap();
        assert_eq!(load_index(&path).unwrap(), idx);
        // No temp files left behind
        let entries = std::fs::read_dir(path.parent().unwrap()).unwrap().count();
        assert_eq!(entries, 1);
    }

    #[test]
    fn test_persist_replaces_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rag_index.json");
        std::fs::write(&path, "old contents").unwrap();
        sample_index().persist(&path).unwrap();
        assert_eq!(load_index(&path).unwrap().chunks.len(), 2);
    }

    #[test]
    fn test_loads_original_format_as_version_zero() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rag_index.json");
        std::fs::write(
            &path,
            r#"{
  "chunks": ["first", "second"],
  "embeddings": [[0.5, 0.5], [1.0, -1.0]]
}"#,
        )
        .unwrap();
        let idx = load_index(&path).unwrap();
        assert_eq!(idx.version, 0);
        assert_eq!(idx.model, None);
        assert_eq!(idx.vector_dims(), Some(2));
    }

    #[test]
    fn test_garbage_file_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rag_index.json");
        std::fs::write(&path, "{\"chunks\": [1, 2").unwrap();
        let err = load_index(&path).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<RagError>(),
            Some(RagError::IndexCorrupt(_))
        ));
    }

    #[test]
    fn test_foreign_schema_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rag_index.json");
        std::fs::write(&path, r#"{"documents": []}"#).unwrap();
        let err = load_index(&path).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<RagError>(),
            Some(RagError::IndexCorrupt(_))
        ));
    }

    #[test]
    fn test_model_check() {
        let idx = sample_index();
        assert!(check_model(&idx, "test-model").is_ok());
        assert!(matches!(
            check_model(&idx, "other-model"),
            Err(RagError::ModelMismatch { .. })
        ));

        let mut v0 = sample_index();
        v0.model = None;
        assert!(check_model(&v0, "anything").is_ok());
    }
}
