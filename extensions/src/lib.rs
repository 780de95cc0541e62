//! Provider integrations for TruthForge.
//!
//! Currently a single provider: [`gemini`], which supplies an
//! [`Embedder`](truthforge_core::embedding::Embedder) and a
//! [`LanguageModel`](truthforge_core::chat::LanguageModel) backed by Google's Generative
//! Language REST API.

pub mod gemini;
