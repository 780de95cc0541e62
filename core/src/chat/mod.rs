//! Text-generation capability used by the verifier.
//!
//! A [`LanguageModel`] takes a single prompt and returns the model's text. Conversation
//! state, streaming and retries are left to implementations (see the Gemini client in
//! `truthforge_extensions`).

mod error;

use async_trait::async_trait;

pub use error::ChatError;

#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Generates a completion for `prompt`.
    ///
    /// Implementations report a completion without any text as
    /// [`ChatError::EmptyResponse`] rather than returning an empty string.
    async fn generate(&self, prompt: &str) -> Result<String, ChatError>;

    /// Identifier of the configured model (e.g. "gemini-2.0-flash").
    fn model_name(&self) -> &str;
}
