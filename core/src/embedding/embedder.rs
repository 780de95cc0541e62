use async_trait::async_trait;

use super::{error::EmbeddingError, Embedding};

/// Trait for asynchronous text embedding generation.
///
/// An implementor of this trait represents a specific configured embedding model
/// (e.g., a connection to Gemini's `text-embedding-004`, or the local
/// [`HashEmbedder`](super::HashEmbedder)). Implementations must be deterministic for
/// identical input and model version, since stored vectors and query vectors are
/// compared directly.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Generates embeddings for a batch of texts.
    ///
    /// # Returns
    ///
    /// * `Ok(Vec<Embedding>)`: One vector per input text, in input order, all of the
    ///   same length.
    /// * `Err(EmbeddingError)`: The embedder rejected an input (e.g. an empty string) or
    ///   the underlying provider failed. Implementations should use `InvalidRequest` for
    ///   inputs they refuse to process.
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>, EmbeddingError>;

    /// Generates the embedding for a single text.
    ///
    /// The default implementation delegates to [`Embedder::embed_batch`].
    async fn embed(&self, text: &str) -> Result<Embedding, EmbeddingError> {
        let mut embeddings = self.embed_batch(&[text]).await?;
        if embeddings.len() != 1 {
            return Err(EmbeddingError::CountMismatch {
                expected: 1,
                actual: embeddings.len(),
            });
        }
        Ok(embeddings.remove(0))
    }

    /// Returns the number of dimensions in the embedding vectors produced by this embedder.
    ///
    /// Returns `None` if the dimensionality is not known ahead of the first call.
    fn dimensions(&self) -> Option<usize>;

    /// Returns an identifier for the configured embedding model
    /// (e.g., "text-embedding-004", "hash-256").
    fn model_name(&self) -> &str;

    /// Returns a hint for the maximum number of texts a provider accepts per request.
    ///
    /// Callers do not need to respect this: implementations split larger batches
    /// themselves.
    fn max_batch_size_hint(&self) -> Option<usize> {
        None
    }
}
