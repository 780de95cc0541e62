//! Core library for TruthForge.
//!
//! The centrepiece is the [`store::DocumentStore`]: a small, persistent corpus of rule
//! passages with their embeddings, searched by cosine similarity. Around it sit the
//! [`embedding`] abstractions, the sector-aware [`ingest`] pipeline, the
//! [`chat::LanguageModel`] abstraction and the [`verify::Verifier`] workflow that ties
//! retrieval and generation together.

pub mod chat;
pub mod chunking;
pub mod embedding;
pub mod ingest;
pub mod search;
pub mod store;
pub mod verify;
