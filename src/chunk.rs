//! Fixed-window text chunker.
//!
//! Splits extracted document text into [`Chunk`]s of at most `max_chars`
//! characters. Windows are taken back to back with no overlap, trimmed of
//! surrounding whitespace, and dropped when nothing is left after the trim.
//! Window boundaries are counted in characters (Unicode scalar values), so
//! multi-byte text is never split inside a code point.

use anyhow::Result;

use crate::error::RagError;

/// A trimmed slice of document text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// 1-based position among the kept chunks.
    pub index: usize,
    pub text: String,
}

/// Split text into non-overlapping windows of `max_chars` characters.
///
/// Returns [`RagError::EmptyDocument`] when the text is empty or only
/// whitespace, and [`RagError::Configuration`] when `max_chars` is zero.
pub fn chunk_text(text: &str, max_chars: usize) -> Result<Vec<Chunk>> {
    if max_chars == 0 {
        return Err(RagError::Configuration("chunk size must be >= 1".to_string()).into());
    }
    if text.trim().is_empty() {
        return Err(RagError::EmptyDocument.into());
    }

    let mut chunks = Vec::new();
    let mut remaining = text;

    while !remaining.is_empty() {
        let split_at = remaining
            .char_indices()
            .nth(max_chars)
            .map(|(pos, _)| pos)
            .unwrap_or(remaining.len());

        let piece = remaining[..split_at].trim();
        if !piece.is_empty() {
            chunks.push(Chunk {
                index: chunks.len() + 1,
                text: piece.to_string(),
            });
        }
        remaining = &remaining[split_at..];
    }

    Ok(chunks)
}
