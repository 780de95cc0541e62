//! Offline embedder based on feature hashing.
//!
//! [`HashEmbedder`] maps each lower-cased word of the input into one of a fixed number of
//! buckets using a stable hash, accumulates signed counts and L2-normalises the result.
//! It carries no model weights, never touches the network and is fully deterministic,
//! which makes it suitable for tests and for running the knowledge base without an API
//! key. Retrieval quality is lexical rather than semantic.

use async_trait::async_trait;
use tracing::trace;

use super::{Embedder, Embedding, EmbeddingError};

const DEFAULT_DIMENSIONS: usize = 256;

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// Deterministic bag-of-words embedder using the hashing trick.
#[derive(Debug, Clone)]
pub struct HashEmbedder {
    dimensions: usize,
    model_name: String,
}

impl HashEmbedder {
    /// Creates a hash embedder with 256 dimensions.
    pub fn new() -> Self {
        Self::with_dimensions(DEFAULT_DIMENSIONS)
    }

    /// Creates a hash embedder with a custom number of dimensions. Zero is raised to one.
    pub fn with_dimensions(dimensions: usize) -> Self {
        let dimensions = dimensions.max(1);
        Self {
            dimensions,
            model_name: format!("hash-{}", dimensions),
        }
    }

    fn embed_text(&self, text: &str) -> Embedding {
        let mut values = vec![0.0f32; self.dimensions];
        for token in tokens(text) {
            let hash = fnv1a(token.as_bytes());
            let bucket = (hash % self.dimensions as u64) as usize;
            let sign = if hash >> 63 == 0 { 1.0 } else { -1.0 };
            values[bucket] += sign;
        }

        let norm = values.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            values.iter_mut().for_each(|v| *v /= norm);
        }
        Embedding(values)
    }
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Embedder for HashEmbedder {
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>, EmbeddingError> {
        if let Some(index) = texts.iter().position(|t| t.trim().is_empty()) {
            return Err(EmbeddingError::InvalidRequest(format!(
                "Cannot embed empty text (index {})",
                index
            )));
        }
        trace!(count = texts.len(), dimensions = self.dimensions, "Hash-embedding texts");
        Ok(texts.iter().map(|text| self.embed_text(text)).collect())
    }

    fn dimensions(&self) -> Option<usize> {
        Some(self.dimensions)
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}

fn tokens(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(|word| word.to_lowercase())
}

// 64-bit FNV-1a. Stable across platforms and compiler versions, unlike `DefaultHasher`.
fn fnv1a(bytes: &[u8]) -> u64 {
    bytes.iter().fold(FNV_OFFSET_BASIS, |hash, byte| {
        (hash ^ u64::from(*byte)).wrapping_mul(FNV_PRIME)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn embeds_deterministically() {
        let embedder = HashEmbedder::new();
        let first = embedder.embed("Patient data must be encrypted at rest.").await.unwrap();
        let second = embedder.embed("Patient data must be encrypted at rest.").await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first.dimensions(), 256);
        assert!((first.norm() - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn ignores_case_and_punctuation() {
        let embedder = HashEmbedder::with_dimensions(64);
        let a = embedder.embed("Encrypt the DATA!").await.unwrap();
        let b = embedder.embed("encrypt, the data").await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn related_texts_score_higher_than_unrelated() {
        let embedder = HashEmbedder::new();
        let query = embedder.embed("encryption of patient records").await.unwrap();
        let related = embedder.embed("patient records require encryption").await.unwrap();
        let unrelated = embedder.embed("bridges need load testing").await.unwrap();
        assert!(query.similarity(&related).unwrap() > query.similarity(&unrelated).unwrap());
    }

    #[tokio::test]
    async fn rejects_empty_text() {
        let embedder = HashEmbedder::new();
        let result = embedder.embed_batch(&["fine", "   "]).await;
        assert!(matches!(result, Err(EmbeddingError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn punctuation_only_text_yields_zero_vector() {
        let embedder = HashEmbedder::with_dimensions(8);
        let embedding = embedder.embed("?!").await.unwrap();
        assert_eq!(embedding.norm(), 0.0);
    }

    #[test]
    fn zero_dimensions_are_raised_to_one() {
        let embedder = HashEmbedder::with_dimensions(0);
        assert_eq!(embedder.dimensions(), Some(1));
        assert_eq!(embedder.model_name(), "hash-1");
    }
}
