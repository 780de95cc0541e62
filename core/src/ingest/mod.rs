//! Ingestion of sector-labeled rule files into a [`DocumentStore`].
//!
//! A source file interleaves `[SECTOR: <label>]` headers with free-text passages:
//!
//! ```text
//! [SECTOR: MEDICAL]
//! Patient data must be encrypted at rest.
//! [SECTOR: LAW]
//! Contracts above 10,000 EUR require two signatures.
//! ```
//!
//! [`parse_sectors`] turns such text into parallel chunk and metadata lists, and
//! [`ingest_file`] hands them to [`DocumentStore::add_texts`]. Ingestion appends: running
//! it twice on the same file stores every passage twice.

mod sector;

use std::{
    collections::BTreeSet,
    path::{Path, PathBuf},
};

use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::{
    chunking::{Chunker, ChunkerError},
    store::{DocumentStore, Metadata, StoreError},
};

pub use sector::{Granularity, SectorChunker};

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Source file not found: {0}")]
    SourceMissing(PathBuf),

    #[error("Failed to read source file {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Chunking failed")]
    Chunking(#[from] ChunkerError),

    #[error("Store update failed")]
    Store(#[from] StoreError),
}

/// Chunks and their metadata, index-aligned.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IngestBatch {
    pub chunks: Vec<String>,
    pub metadatas: Vec<Metadata>,
}

impl IngestBatch {
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Distinct source labels in the batch.
    pub fn sources(&self) -> BTreeSet<String> {
        self.metadatas.iter().map(|m| m.source.clone()).collect()
    }
}

/// Outcome of an ingestion run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub chunks_added: usize,
    pub sources: BTreeSet<String>,
}

/// Parses sector-labeled text into a batch ready for [`DocumentStore::add_texts`].
pub fn parse_sectors(raw: &str, granularity: Granularity) -> Result<IngestBatch, ChunkerError> {
    let chunker = SectorChunker::new(granularity)?;
    let mut batch = IngestBatch::default();
    for data in chunker.chunk(raw)? {
        let chunk = data.to_chunk(raw);
        batch.chunks.push(chunk.text().to_string());
        batch.metadatas.push(Metadata::with_source(chunk.source()));
    }
    Ok(batch)
}

/// Parses `raw` and appends the resulting chunks to `store`.
#[instrument(skip_all, fields(bytes = raw.len(), ?granularity))]
pub async fn ingest_text(
    raw: &str,
    store: &DocumentStore,
    granularity: Granularity,
) -> Result<IngestReport, IngestError> {
    let batch = parse_sectors(raw, granularity)?;
    if batch.is_empty() {
        warn!("No passages found in source text");
    }
    let chunks_added = store
        .add_texts(&batch.chunks, Some(batch.metadatas.as_slice()))
        .await?;
    let report = IngestReport {
        chunks_added,
        sources: batch.sources(),
    };
    info!(chunks = report.chunks_added, sources = ?report.sources, "Ingestion complete");
    Ok(report)
}

/// Reads the rule file at `path` and appends its passages to `store`.
///
/// A missing file is reported as [`IngestError::SourceMissing`] and leaves the store
/// untouched.
#[instrument(skip(store), fields(path = %path.display()))]
pub async fn ingest_file(
    path: &Path,
    store: &DocumentStore,
    granularity: Granularity,
) -> Result<IngestReport, IngestError> {
    let raw = match tokio::fs::read_to_string(path).await {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(IngestError::SourceMissing(path.to_path_buf()));
        }
        Err(source) => {
            return Err(IngestError::Io {
                path: path.to_path_buf(),
                source,
            });
        }
    };
    ingest_text(&raw, store, granularity).await
}
