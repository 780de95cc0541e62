//! Brute-force cosine ranking over the stored corpus.
//!
//! Every query is a linear scan (O(N·D)) with no index structure. That is the intended
//! trade-off for a corpus of hundreds to low thousands of passages.

use serde::Serialize;

use crate::{embedding::Embedding, store::Entry};

/// A stored entry together with its similarity to a query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredEntry {
    /// Zero-based position in the result list.
    pub rank: usize,
    /// Cosine similarity to the query. `-inf` when undefined (zero-norm vector).
    pub score: f32,
    pub entry: Entry,
}

/// Cosine similarity of two equally long vectors.
///
/// Returns `f32::NEG_INFINITY` when either vector has zero norm or the lengths differ, so
/// that such entries sort last instead of aborting a search. Results may stray marginally
/// outside `[-1, 1]` due to rounding.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return f32::NEG_INFINITY;
    }
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    similarity_with_norms(a, norm_a, b, norm_b)
}

fn similarity_with_norms(a: &[f32], norm_a: f32, b: &[f32], norm_b: f32) -> f32 {
    if norm_a == 0.0 || norm_b == 0.0 {
        return f32::NEG_INFINITY;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    // `+ 0.0` folds -0.0 into 0.0 so orthogonal entries tie under `total_cmp`.
    let score = dot / (norm_a * norm_b) + 0.0;
    if score.is_nan() { f32::NEG_INFINITY } else { score }
}

/// Ranks `entries` by cosine similarity to `query` and returns the best `top_k`.
///
/// Sorting is stable: entries with equal scores keep their insertion order, so identical
/// inputs always produce identical output.
pub fn rank(query: &Embedding, entries: &[Entry], top_k: usize) -> Vec<ScoredEntry> {
    if top_k == 0 || entries.is_empty() {
        return Vec::new();
    }

    let query_norm = query.norm();
    let mut scores: Vec<(usize, f32)> = entries
        .iter()
        .enumerate()
        .map(|(idx, entry)| {
            let stored = entry.embedding.as_slice();
            let score = if stored.len() == query.dimensions() {
                similarity_with_norms(query.as_slice(), query_norm, stored, entry.embedding.norm())
            } else {
                f32::NEG_INFINITY
            };
            (idx, score)
        })
        .collect();

    scores.sort_by(|a, b| b.1.total_cmp(&a.1));
    scores.truncate(top_k);

    scores
        .into_iter()
        .enumerate()
        .map(|(rank, (idx, score))| ScoredEntry {
            rank,
            score,
            entry: entries[idx].clone(),
        })
        .collect()
}
