//! Google Gemini provider.
//!
//! [`GeminiClient`] owns one HTTP client and hands out an [`Embedder`] and a
//! [`LanguageModel`] that share it.
//!
//! [`Embedder`]: truthforge_core::embedding::Embedder
//! [`LanguageModel`]: truthforge_core::chat::LanguageModel

use std::sync::Arc;

use reqwest::Client;
use tracing::instrument;

mod chat;
mod embed;
mod error;
mod models;
mod shared;

pub use chat::GeminiChatModel;
pub use embed::{BATCH_LIMIT, GeminiEmbedder};
pub use error::{GeminiError, GeminiErrorDetail};
pub use models::GeminiModel;
pub use shared::GeminiConfig;

use shared::SharedGeminiClient;

pub const DEFAULT_CHAT_MODEL: &str = "gemini-2.0-flash";
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-004";

#[derive(Debug, Clone)]
pub struct GeminiClient {
    shared_client: Arc<SharedGeminiClient>,
}

impl GeminiClient {
    /// Client for the public endpoint with default settings.
    pub fn new(api_key: impl Into<String>) -> Result<Self, GeminiError> {
        Self::from_config(GeminiConfig::new(api_key)?, None)
    }

    /// Uses `client_override` instead of building a reqwest client from `config`.
    pub fn from_config(config: GeminiConfig, client_override: Option<Client>) -> Result<Self, GeminiError> {
        let shared_client = SharedGeminiClient::new(config, client_override)?;
        Ok(Self {
            shared_client: Arc::new(shared_client),
        })
    }

    /// Embedder for `model` (with or without the `models/` prefix).
    pub fn embedder(&self, model: impl Into<String>) -> Result<GeminiEmbedder, GeminiError> {
        GeminiEmbedder::new(self.shared_client.clone(), model.into(), None)
    }

    pub fn chat_model(&self, model: impl Into<String>) -> Result<GeminiChatModel, GeminiError> {
        GeminiChatModel::new(self.shared_client.clone(), model.into())
    }

    /// Lists all models visible to the API key, following pagination.
    #[instrument(skip(self))]
    pub async fn list_models(&self) -> Result<Vec<GeminiModel>, GeminiError> {
        models::list_models(&self.shared_client).await
    }
}
