//! `docqa embed`: embed a text once and show the vector's shape.
//!
//! Handy for checking the credential, endpoint and model before indexing a
//! whole document.

use anyhow::Result;

use crate::config::Config;
use crate::embedding::{EmbeddingProvider, OpenAIEmbedder};

/// Text embedded when no words are given.
pub const DEFAULT_PROBE_TEXT: &str = "hello embeddings";

/// Number of leading components printed.
const PREVIEW_LEN: usize = 8;

pub async fn run_embed(config: &Config, text: &str) -> Result<()> {
    let api_key = config.api_key()?;
    let embedder = OpenAIEmbedder::new(&config.embedding, api_key)?;
    let vector = embedder.embed(text).await?;
    println!("{}", format_probe(embedder.model_name(), &vector));
    Ok(())
}

/// Render the probe report for a vector.
pub fn format_probe(model: &str, vector: &[f32]) -> String {
    let head: Vec<String> = vector
        .iter()
        .take(PREVIEW_LEN)
        .map(|v| format!("{}", v))
        .collect();
    format!(
        "model = {}\ndim = {}\nfirst {} = [{}]",
        model,
        vector.len(),
        PREVIEW_LEN,
        head.join(", ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_probe_shows_first_eight() {
        let v: Vec<f32> = (0..10).map(|i| i as f32 * 0.5).collect();
        let out = format_probe("m", &v);
        assert!(out.contains("dim = 10"));
        assert!(out.contains("first 8 = [0, 0.5, 1, 1.5, 2, 2.5, 3, 3.5]"));
    }

    #[test]
    fn test_format_probe_short_vector() {
        let out = format_probe("m", &[0.25, -1.0]);
        assert!(out.contains("dim = 2"));
        assert!(out.contains("[0.25, -1]"));
    }
}
