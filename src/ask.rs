//! The ask pipeline: one question against one document.
//!
//! ```text
//! credential check → load or build index → embed question
//!     → retrieve top-K → build prompt → chat completion → print
//! ```
//!
//! [`ask`] runs the pipeline against any providers and returns an
//! [`AskOutcome`]; [`run_ask`] wires up the OpenAI clients from config and
//! prints the result.

use anyhow::{Context, Result};
use std::path::Path;

use crate::answer::{self, AnswerProvider, ChatReply, OpenAIChat};
use crate::config::Config;
use crate::embedding::{EmbeddingProvider, OpenAIEmbedder};
use crate::index::{self, IndexRequest};
use crate::retrieve;

/// Question used when none is given on the command line.
pub const DEFAULT_QUESTION: &str = "What is this document about?";

/// Per-invocation inputs that are not part of the config file.
#[derive(Debug, Clone)]
pub struct AskOptions<'a> {
    pub document: &'a Path,
    pub question: &'a str,
    pub rebuild: bool,
}

/// A retrieved context chunk, owned so it can outlive the index.
#[derive(Debug, Clone, PartialEq)]
pub struct ContextChunk {
    pub chunk_number: usize,
    pub score: f32,
    pub text: String,
}

/// Everything one ask run produced.
#[derive(Debug, Clone)]
pub struct AskOutcome {
    pub question: String,
    pub context: Vec<ContextChunk>,
    pub reply: ChatReply,
}

/// Run the pipeline with the given providers.
///
/// Errors from either provider propagate unchanged; no answer is produced
/// without a successful chat call.
pub async fn ask(
    config: &Config,
    opts: &AskOptions<'_>,
    embedder: &dyn EmbeddingProvider,
    answerer: &dyn AnswerProvider,
) -> Result<AskOutcome> {
    let req = IndexRequest {
        index_path: &config.index.path,
        document_path: opts.document,
        max_chars: config.chunking.max_chars,
        rebuild: opts.rebuild,
    };
    let index = index::open_or_build(&req, embedder).await?;

    let query_vec = embedder
        .embed(opts.question)
        .await
        .context("Failed to embed question")?;

    let retrieved = retrieve::retrieve(&index, &query_vec, config.retrieval.top_k)?;
    let prompt = answer::build_prompt(
        &retrieved.iter().map(|r| r.text).collect::<Vec<_>>(),
        opts.question,
    );

    tracing::info!(
        model = answerer.model_name(),
        context_chunks = retrieved.len(),
        prompt_chars = prompt.chars().count(),
        "requesting answer"
    );
    let reply = answerer
        .complete(&prompt)
        .await
        .context("Failed to get answer")?;
    if reply == ChatReply::Empty {
        tracing::warn!("answer service returned no content");
    }

    Ok(AskOutcome {
        question: opts.question.to_string(),
        context: retrieved
            .into_iter()
            .map(|r| ContextChunk {
                chunk_number: r.chunk_number,
                score: r.score,
                text: r.text.to_string(),
            })
            .collect(),
        reply,
    })
}

/// CLI entry point: check the credential, build the OpenAI clients, run
/// [`ask`] and print `Q:`/`A:` lines.
pub async fn run_ask(config: &Config, opts: &AskOptions<'_>, show_context: bool) -> Result<()> {
    let api_key = config.api_key()?;

    let embedder = OpenAIEmbedder::new(&config.embedding, api_key.clone())?;
    let answerer = OpenAIChat::new(&config.answer, api_key)?;

    let outcome = ask(config, opts, &embedder, &answerer).await?;

    if show_context {
        println!("Context:");
        for chunk in &outcome.context {
            println!(
                "  [chunk {} | score {:.4}] {}",
                chunk.chunk_number,
                chunk.score,
                preview(&chunk.text, 120)
            );
        }
    }

    println!();
    println!("Q: {}", outcome.question);
    println!("A: {}", outcome.reply.text());
    Ok(())
}

/// First `max` characters of `text` on one line.
fn preview(text: &str, max: usize) -> String {
    let flat: String = text
        .chars()
        .map(|c| if c.is_whitespace() { ' ' } else { c })
        .collect();
    if flat.chars().count() <= max {
        flat
    } else {
        let cut: String = flat.chars().take(max).collect();
        format!("{}…", cut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preview_flattens_and_truncates() {
        assert_eq!(preview("a\nb\tc", 10), "a b c");
        assert_eq!(preview("abcdef", 3), "abc…");
    }
}
