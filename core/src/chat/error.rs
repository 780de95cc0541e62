use thiserror::Error;
use std::error::Error as StdError;

#[derive(Error, Debug)]
pub enum ChatError {
    #[error("Network error: {0}")]
    Network(#[source] Box<dyn StdError + Send + Sync>),

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("API error: status={status:?}, message={message}")]
    Api { status: Option<u16>, message: String },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Rate limit exceeded")]
    RateLimited,

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Content blocked: {0}")]
    ContentBlocked(String),

    /// The model answered, but the answer contained no text.
    #[error("The model returned an empty response")]
    EmptyResponse,

    #[error("Response parsing error: {0}")]
    Parsing(#[source] Box<dyn StdError + Send + Sync>),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Provider-specific error: {0}")]
    Provider(#[source] Box<dyn StdError + Send + Sync>),
}

impl ChatError {
    /// Whether retrying the same request later might succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            ChatError::Network(_) | ChatError::RateLimited => true,
            ChatError::Api { status, .. } => status.is_none_or(|code| code == 408 || code >= 500),
            _ => false,
        }
    }
}
