//! Query ranking by cosine similarity over a corpus.

use std::cmp::Ordering;

use crate::semantic::corpus::Corpus;
use crate::semantic::embeddings::{EmbeddingError, Encoder};

/// A ranked document.
#[derive(Debug, Clone)]
pub struct SearchResult {
    /// Row in the corpus
    pub index: usize,
    /// Cosine similarity score (-1.0 to 1.0)
    pub score: f32,
}

/// Compute L2 norm of a vector.
fn l2_norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// Cosine similarity between two vectors.
///
/// Returns 0.0 when either vector has zero norm or the lengths differ.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let norm_a = l2_norm(a);
    let norm_b = l2_norm(b);
    if norm_a < f32::EPSILON || norm_b < f32::EPSILON {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    dot_product / (norm_a * norm_b)
}

/// Similarity of `query` against every row of `corpus`, in row order.
pub fn similarities(query: &[f32], corpus: &Corpus) -> Vec<f32> {
    corpus
        .vectors()
        .map(|row| cosine_similarity(query, row))
        .collect()
}

/// Descending order by score with NaN after every number.
fn descending(a: f32, b: f32) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
    }
}

/// Indices of the `k` highest scores, highest first.
///
/// The sort is stable, so equal scores keep their original order.
pub fn top_k(similarities: &[f32], k: usize) -> Vec<usize> {
    let mut order: Vec<usize> = (0..similarities.len()).collect();
    order.sort_by(|&a, &b| descending(similarities[a], similarities[b]));
    order.truncate(k);
    order
}

/// Scores free-text queries against a corpus with the injected encoder.
pub struct QueryRanker<'a> {
    encoder: &'a dyn Encoder,
}

impl<'a> QueryRanker<'a> {
    pub fn new(encoder: &'a dyn Encoder) -> Self {
        Self { encoder }
    }

    /// Encode `query` and score it against every document.
    pub fn rank(&self, query: &str, corpus: &Corpus) -> Result<Vec<f32>, EmbeddingError> {
        let query_embedding = self.encoder.encode(query)?;
        if query_embedding.len() != corpus.dimensions() {
            return Err(EmbeddingError::DimensionMismatch {
                expected: corpus.dimensions(),
                got: query_embedding.len(),
            });
        }
        Ok(similarities(&query_embedding, corpus))
    }

    /// Rank and keep the best `k` results.
    pub fn search(
        &self,
        query: &str,
        corpus: &Corpus,
        k: usize,
    ) -> Result<Vec<SearchResult>, EmbeddingError> {
        let scores = self.rank(query, corpus)?;
        Ok(top_k(&scores, k)
            .into_iter()
            .map(|index| SearchResult {
                index,
                score: scores[index],
            })
            .collect())
    }
}
