use serde::{Deserialize, Serialize};

mod embedder;
mod error;
mod hash;

pub use embedder::Embedder;
pub use error::EmbeddingError;
pub use hash::HashEmbedder;

/// A single embedding vector.
///
/// Serializes as a plain JSON array of numbers.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Embedding(pub Vec<f32>);

impl Embedding {
    /// Number of components in the vector.
    pub fn dimensions(&self) -> usize {
        self.0.len()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    /// Euclidean (L2) norm.
    pub fn norm(&self) -> f32 {
        self.0.iter().map(|x| x * x).sum::<f32>().sqrt()
    }

    /// Cosine similarity between two embeddings.
    ///
    /// Returns `f32::NEG_INFINITY` if either vector has zero norm, since the angle is
    /// undefined. Fails if the dimensions differ.
    pub fn similarity(&self, other: &Embedding) -> Result<f32, EmbeddingError> {
        if self.dimensions() != other.dimensions() {
            return Err(EmbeddingError::DimensionMismatch {
                expected: self.dimensions(),
                actual: other.dimensions(),
            });
        }
        Ok(crate::search::cosine_similarity(&self.0, &other.0))
    }
}

impl From<Vec<f32>> for Embedding {
    fn from(values: Vec<f32>) -> Self {
        Embedding(values)
    }
}

impl AsRef<[f32]> for Embedding {
    fn as_ref(&self) -> &[f32] {
        &self.0
    }
}
