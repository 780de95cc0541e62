use thiserror::Error;
use std::error::Error as StdError;

#[derive(Error, Debug)]
pub enum EmbeddingError {
    /// Network error during API communication (e.g., connection refused, timeout, DNS resolution failure).
    #[error("Network error: {0}")]
    Network(#[source] Box<dyn StdError + Send + Sync>),

    /// Authentication failed (e.g., invalid API key, insufficient permissions).
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Error reported by the API backend (e.g., bad request, server error).
    /// Check status for standard HTTP codes if available.
    #[error("API error: status={status:?}, message={message}")]
    Api {
        /// Optional HTTP status code from the API response.
        status: Option<u16>,
        /// Error message provided by the API or synthesized by the client.
        message: String,
        #[source]
        source: Option<Box<dyn StdError + Send + Sync>>,
    },

    /// The request was deemed invalid before sending (e.g., an empty input text).
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The API indicated a rate limit was exceeded.
    #[error("Rate limit exceeded")]
    RateLimited,

    /// The requested embedding model is not available or not found.
    #[error("Model not found: {0}")]
    ModelNotFound(String),

    /// Error parsing a *successful* response from the API.
    #[error("Response parsing error: {0}")]
    Parsing(#[source] Box<dyn StdError + Send + Sync>),

    /// The embedder returned a different number of vectors than texts were submitted.
    #[error("Expected {expected} embeddings, got {actual}")]
    CountMismatch {
        expected: usize,
        actual: usize,
    },

    /// A vector does not have the dimensionality of the vectors it is compared or stored with.
    #[error("Embedding dimension mismatch (expected: {expected}, actual: {actual})")]
    DimensionMismatch {
        expected: usize,
        actual: usize,
    },

    /// Error related to the configuration of the client or provider.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// An error specific to the underlying provider/implementation that doesn't fit other categories.
    #[error("Provider-specific error: {0}")]
    Provider(#[source] Box<dyn StdError + Send + Sync>),
}

impl EmbeddingError {
    /// Whether the failure is a passing condition of an external service, as opposed to a
    /// problem with the input or with data integrity.
    ///
    /// Transient failures may be degraded around (e.g. by answering without retrieval
    /// context); everything else must abort the operation.
    pub fn is_transient(&self) -> bool {
        match self {
            EmbeddingError::Network(_) | EmbeddingError::RateLimited => true,
            EmbeddingError::Api { status, .. } => match status {
                Some(code) => *code == 408 || *code >= 500,
                None => true,
            },
            _ => false,
        }
    }
}
