//! Embedding provider abstraction and vector math.
//!
//! Defines the [`EmbeddingProvider`] trait, the OpenAI-compatible
//! [`OpenAIEmbedder`], and [`cosine_similarity`].
//!
//! The embedder sends one text per request (`{model, input}`) and takes the
//! first vector of the returned `data` list, matching how the index is built
//! one chunk at a time.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::EmbeddingConfig;
use crate::error::RagError;
use crate::http::{self, HttpFailure};

/// A source of embedding vectors.
///
/// Implementations must return vectors of a constant length for a given
/// model. Errors should be [`RagError::EmbeddingService`].
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Returns the model identifier (e.g. `"text-embedding-3-small"`).
    fn model_name(&self) -> &str;

    /// Embed a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

// ============ OpenAI Provider ============

/// Embedding provider for `POST {url}/embeddings`.
pub struct OpenAIEmbedder {
    client: reqwest::Client,
    url: String,
    model: String,
    api_key: String,
    max_retries: u32,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingDatum>,
}

#[derive(Deserialize)]
struct EmbeddingDatum {
    embedding: Vec<f32>,
}

impl OpenAIEmbedder {
    pub fn new(config: &EmbeddingConfig, api_key: String) -> Result<Self> {
        let client = http::build_client(config.timeout_secs).map_err(into_embedding_error)?;
        Ok(Self {
            client,
            url: http::endpoint(&config.url, "embeddings"),
            model: config.model.clone(),
            api_key,
            max_retries: config.max_retries,
        })
    }
}

fn into_embedding_error(failure: HttpFailure) -> anyhow::Error {
    RagError::embedding(failure.status, failure.message).into()
}

#[async_trait]
impl EmbeddingProvider for OpenAIEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let body = EmbeddingRequest {
            model: &self.model,
            input: text,
        };
        let response: EmbeddingResponse = http::post_json(
            &self.client,
            &self.url,
            &self.api_key,
            &body,
            self.max_retries,
            "Embeddings",
        )
        .await
        .map_err(into_embedding_error)?;

        let vector = first_embedding(response)?;
        tracing::debug!(model = %self.model, dims = vector.len(), "embedded text");
        Ok(vector)
    }
}

fn first_embedding(response: EmbeddingResponse) -> Result<Vec<f32>> {
    let vector = response
        .data
        .into_iter()
        .next()
        .map(|d| d.embedding)
        .ok_or_else(|| RagError::embedding(None, "response contained no embeddings"))?;
    if vector.is_empty() {
        return Err(RagError::embedding(None, "response contained an empty embedding").into());
    }
    if vector.iter().any(|x| !x.is_finite()) {
        return Err(RagError::embedding(None, "response contained a non-finite embedding value").into());
    }
    Ok(vector)
}

/// Compute cosine similarity between two embedding vectors.
///
/// Returns a value in `[-1.0, 1.0]`:
/// - `1.0` = identical direction
/// - `0.0` = orthogonal (unrelated), either vector is all zeros, or a
///   component is not finite
/// - `-1.0` = opposite direction
///
/// Sums are accumulated in `f64`. Vectors of different lengths are a
/// [`RagError::DimensionMismatch`]; nothing is truncated.
///
/// # Formula
///
/// ```text
///            a · b
/// cos(θ) = ─────────
///          ‖a‖ × ‖b‖
/// ```
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f32, RagError> {
    if a.len() != b.len() {
        return Err(RagError::DimensionMismatch {
            expected: a.len(),
            actual: b.len(),
        });
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;

    for (x, y) in a.iter().zip(b.iter()) {
        let (x, y) = (*x as f64, *y as f64);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return Ok(0.0);
    }

    let sim = dot / (norm_a.sqrt() * norm_b.sqrt());
    if !sim.is_finite() {
        return Ok(0.0);
    }
    Ok(sim.clamp(-1.0, 1.0) as f32)
}
