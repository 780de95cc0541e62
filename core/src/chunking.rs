use std::{fmt::Display, ops::Range};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Trait for strategies that split a source text into labeled passages.
///
/// A chunker returns byte ranges into the text it was given rather than owned strings.
/// Callers pair each [`ChunkData`] with the same source text through
/// [`ChunkData::to_chunk`] to read the passage.
pub trait Chunker: Send + Sync {
    /// Splits `source_text` into chunks, in document order.
    ///
    /// Every returned `text_range` is a non-empty, contiguous byte range on `char`
    /// boundaries of `source_text`. Ranges do not overlap.
    fn chunk(&self, source_text: &str) -> Result<Vec<ChunkData>, ChunkerError>;
}

/// A passage located within a source text, together with its provenance label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkData {
    /// Byte range (`start..end`) of the passage within the source text.
    pub text_range: Range<usize>,

    /// Provenance label of the passage (e.g. the sector it appeared under).
    pub source: String,
}

impl ChunkData {
    /// Pairs this chunk with its source text.
    ///
    /// `source_text` must be the text this `ChunkData` was produced from. Otherwise the
    /// result is meaningless, and reading it may panic on an out-of-range slice.
    pub fn to_chunk<'a>(&'a self, source_text: &'a str) -> Chunk<'a> {
        Chunk {
            data: self,
            source_text,
        }
    }
}

#[derive(Debug, Error)]
pub enum ChunkerError {
    #[error("Chunker processing failed: {0}")]
    Processing(String),

    #[error("Invalid chunker configuration: {0}")]
    Configuration(String),
}

/// A chunk materialized against its source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk<'a> {
    data: &'a ChunkData,
    source_text: &'a str,
}

impl<'a> Chunk<'a> {
    pub fn text(&self) -> &'a str {
        &self.source_text[self.data.text_range.clone()]
    }

    pub fn source(&self) -> &'a str {
        &self.data.source
    }
}

impl AsRef<ChunkData> for Chunk<'_> {
    fn as_ref(&self) -> &ChunkData {
        self.data
    }
}

impl Display for Chunk<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.source(), self.text())
    }
}
