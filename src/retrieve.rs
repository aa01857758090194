//! Top-K retrieval over an [`Index`].
//!
//! Linear scan: every stored vector is scored against the query with
//! [`cosine_similarity`], candidates are stable-sorted by descending score
//! (ties keep index order), and the first `k` are returned.

use anyhow::Result;
use serde::Serialize;

use crate::embedding::cosine_similarity;
use crate::error::RagError;
use crate::index::Index;

/// A chunk position and its similarity to the query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredCandidate {
    /// 0-based position in the index.
    pub position: usize,
    pub score: f32,
}

/// A retrieved chunk, borrowed from the index.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetrievedChunk<'a> {
    /// 1-based chunk number.
    pub chunk_number: usize,
    pub score: f32,
    pub text: &'a str,
}

/// Score every stored vector against the query, in index order.
pub fn score_all(index: &Index, query_vec: &[f32]) -> Result<Vec<ScoredCandidate>, RagError> {
    index
        .embeddings
        .iter()
        .enumerate()
        .map(|(position, vector)| {
            let score = cosine_similarity(vector, query_vec)?;
            Ok(ScoredCandidate { position, score })
        })
        .collect()
}

/// Sort candidates by descending score. The sort is stable, so equal scores
/// keep ascending position order. A NaN score ranks last.
pub fn rank(mut candidates: Vec<ScoredCandidate>) -> Vec<ScoredCandidate> {
    candidates.sort_by(|a, b| sort_key(b.score).total_cmp(&sort_key(a.score)));
    candidates
}

fn sort_key(score: f32) -> f32 {
    if score.is_nan() {
        f32::NEG_INFINITY
    } else {
        score
    }
}

/// Return the `k` chunks most similar to `query_vec`, best first.
///
/// Fewer than `k` chunks are returned when the index is smaller. A query
/// whose length differs from the indexed vectors fails with
/// [`RagError::DimensionMismatch`].
pub fn retrieve<'a>(index: &'a Index, query_vec: &[f32], k: usize) -> Result<Vec<RetrievedChunk<'a>>> {
    let ranked = rank(score_all(index, query_vec)?);

    let results: Vec<RetrievedChunk<'a>> = ranked
        .into_iter()
        .take(k)
        .map(|c| RetrievedChunk {
            chunk_number: c.position + 1,
            score: c.score,
            text: index.chunks[c.position].as_str(),
        })
        .collect();

    tracing::debug!(
        candidates = index.len(),
        returned = results.len(),
        top_score = results.first().map(|r| r.score),
        "retrieved chunks"
    );
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::INDEX_VERSION;

    fn index_of(entries: &[(&str, Vec<f32>)]) -> Index {
        Index {
            version: INDEX_VERSION,
            model: None,
            dims: entries.first().map(|(_, v)| v.len()),
            source_sha256: None,
            created_at: None,
            chunks: entries.iter().map(|(t, _)| t.to_string()).collect(),
            embeddings: entries.iter().map(|(_, v)| v.clone()).collect(),
        }
    }

    fn texts<'a>(results: &[RetrievedChunk<'a>]) -> Vec<&'a str> {
        results.iter().map(|r| r.text).collect()
    }

    #[test]
    fn test_ranks_by_descending_similarity() {
        let idx = index_of(&[
            ("east", vec![1.0, 0.0]),
            ("north", vec![0.0, 1.0]),
            ("northeast", vec![1.0, 1.0]),
        ]);
        let results = retrieve(&idx, &[0.1, 1.0], 3).unwrap();
        assert_eq!(texts(&results), vec!["north", "northeast", "east"]);
        assert!(results[0].score >= results[1].score);
        assert!(results[1].score >= results[2].score);
    }

    #[test]
    fn test_top_k_truncates() {
        let idx = index_of(&[
            ("a", vec![1.0, 0.0]),
            ("b", vec![0.9, 0.1]),
            ("c", vec![0.0, 1.0]),
            ("d", vec![-1.0, 0.0]),
        ]);
        let results = retrieve(&idx, &[1.0, 0.0], 2).unwrap();
        assert_eq!(texts(&results), vec!["a", "b"]);
    }

    #[test]
    fn test_k_larger_than_index_returns_all() {
        let idx = index_of(&[("a", vec![1.0, 0.0]), ("b", vec![0.0, 1.0])]);
        let results = retrieve(&idx, &[0.0, 1.0], 10).unwrap();
        assert_eq!(texts(&results), vec!["b", "a"]);
    }

    #[test]
    fn test_ties_keep_index_order() {
        let idx = index_of(&[
            ("first", vec![1.0, 0.0]),
            ("zero", vec![0.0, 0.0]),
            ("second", vec![2.0, 0.0]),
            ("third", vec![3.0, 0.0]),
        ]);
        let results = retrieve(&idx, &[1.0, 0.0], 4).unwrap();
        assert_eq!(texts(&results), vec!["first", "second", "third", "zero"]);
        assert_eq!(results[3].score, 0.0);
    }

    #[test]
    fn test_identical_query_scores_one() {
        let idx = index_of(&[("one", vec![0.3, 0.4, 0.5]), ("two", vec![0.5, -0.4, 0.1])]);
        let results = retrieve(&idx, &[0.3, 0.4, 0.5], 1).unwrap();
        assert_eq!(results[0].chunk_number, 1);
        assert!((results[0].score - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_dimension_mismatch_is_error() {
        let idx = index_of(&[("a", vec![1.0, 0.0])]);
        let err = retrieve(&idx, &[1.0, 0.0, 0.0], 3).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<RagError>(),
            Some(RagError::DimensionMismatch {
                expected: 2,
                actual: 3
            })
        ));
    }

    #[test]
    fn test_deterministic() {
        let idx = index_of(&[
            ("a", vec![0.2, 0.8]),
            ("b", vec![0.8, 0.2]),
            ("c", vec![0.5, 0.5]),
        ]);
        let q = [0.6, 0.4];
        let first = retrieve(&idx, &q, 3).unwrap();
        for _ in 0..10 {
            assert_eq!(retrieve(&idx, &q, 3).unwrap(), first);
        }
    }

    #[test]
    fn test_rank_puts_nan_last() {
        let candidates = vec![
            ScoredCandidate {
                position: 0,
                score: f32::NAN,
            },
            ScoredCandidate {
                position: 1,
                score: 0.2,
            },
            ScoredCandidate {
                position: 2,
                score: 0.7,
            },
        ];
        let order: Vec<usize> = rank(candidates).iter().map(|c| c.position).collect();
        assert_eq!(order, vec![2, 1, 0]);
    }

    #[test]
    fn test_infinite_query_component_scores_zero() {
        let idx = index_of(&[("a", vec![1.0, 1.0]), ("b", vec![0.5, 0.5])]);
        let results = retrieve(&idx, &[f32::INFINITY, 0.0], 2).unwrap();
        assert!(results.iter().all(|r| r.score == 0.0));
        assert_eq!(texts(&results), vec!["a", "b"]);
    }

    #[test]
    fn test_zero_query_scores_everything_zero() {
        let idx = index_of(&[("a", vec![1.0, 0.0]), ("b", vec![0.0, 1.0])]);
        let scored = score_all(&idx, &[0.0, 0.0]).unwrap();
        assert!(scored.iter().all(|c| c.score == 0.0));
    }
}
