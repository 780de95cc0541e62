//! Persistent, append-only store of text passages and their embeddings.
//!
//! A [`DocumentStore`] keeps its whole corpus in memory as an immutable, shared slice of
//! [`Entry`] values and mirrors it to a single JSON snapshot file. Each bulk addition is
//! embedded, validated and written to disk before it becomes visible to readers, so a
//! failed call changes neither memory nor disk.
//!
//! # Concurrency
//!
//! Writers ([`DocumentStore::add_texts`], [`DocumentStore::load`], [`DocumentStore::save`])
//! are serialized by an async mutex held for the whole operation. Readers
//! ([`DocumentStore::search`], [`DocumentStore::entries`]) only clone an `Arc` and never
//! wait for a writer's embedding or disk I/O.
//!
//! # Example Usage
//!
//! ```rust,no_run
//! # use std::sync::Arc;
//! # use truthforge_core::embedding::HashEmbedder;
//! # use truthforge_core::store::{DocumentStore, Metadata, StoreError};
//! # async fn run() -> Result<(), StoreError> {
//! let store = DocumentStore::open("data/vector_store.json", Arc::new(HashEmbedder::new())).await?;
//! store
//!     .add_texts(&["Patient data must be encrypted at rest."], Some(&[Metadata::with_source("MEDICAL")][..]))
//!     .await?;
//!
//! for hit in store.search("how is patient data protected?", 3).await? {
//!     println!("{:.3} [{}] {}", hit.score, hit.entry.source(), hit.entry.text);
//! }
//! # Ok(())
//! # }
//! ```

mod snapshot;

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
    sync::{Arc, PoisonError, RwLock},
};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument};

use crate::{
    embedding::{Embedder, Embedding, EmbeddingError},
    search::{self, ScoredEntry},
};

use snapshot::Snapshot;

/// Source label used when a passage has no known provenance.
pub const UNKNOWN_SOURCE: &str = "UNKNOWN";

fn unknown_source() -> String {
    UNKNOWN_SOURCE.to_string()
}

/// Metadata attached to a stored passage.
///
/// Only `source` is interpreted. Any other keys found in a snapshot are kept in `extra`
/// and written back unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(default = "unknown_source")]
    pub source: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Metadata {
    pub fn with_source(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            extra: Map::new(),
        }
    }
}

impl Default for Metadata {
    fn default() -> Self {
        Self::with_source(UNKNOWN_SOURCE)
    }
}

/// One stored unit of knowledge.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Entry {
    pub text: String,
    pub metadata: Metadata,
    pub embedding: Embedding,
}

impl Entry {
    pub fn source(&self) -> &str {
        &self.metadata.source
    }
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Corrupt store snapshot at {path}: {reason}")]
    CorruptStore { path: PathBuf, reason: String },

    #[error("Embedding failed")]
    Embedding(#[from] EmbeddingError),

    #[error("Got {metadatas} metadata records for {texts} texts")]
    MetadataLengthMismatch { texts: usize, metadatas: usize },

    #[error("IO error at {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Snapshot serialization error")]
    Serialization(#[from] serde_json::Error),
}

/// In-memory corpus backed by a JSON snapshot file.
pub struct DocumentStore {
    path: PathBuf,
    embedder: Arc<dyn Embedder>,
    committed: RwLock<Arc<[Entry]>>,
    writer: Mutex<()>,
}

impl std::fmt::Debug for DocumentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentStore")
            .field("path", &self.path)
            .field("embedder", &self.embedder.model_name())
            .field("len", &self.len())
            .finish()
    }
}

impl DocumentStore {
    /// Creates an empty store bound to `path`. Nothing is read or written.
    pub fn new(path: impl Into<PathBuf>, embedder: Arc<dyn Embedder>) -> Self {
        Self {
            path: path.into(),
            embedder,
            committed: RwLock::new(Arc::from(Vec::new())),
            writer: Mutex::new(()),
        }
    }

    /// Creates a store bound to `path` and hydrates it from the snapshot, if one exists.
    pub async fn open(
        path: impl Into<PathBuf>,
        embedder: Arc<dyn Embedder>,
    ) -> Result<Self, StoreError> {
        let store = Self::new(path, embedder);
        store.load().await?;
        Ok(store)
    }

    /// Replaces the in-memory collection with the contents of the snapshot file.
    ///
    /// A missing file yields an empty store. A file that cannot be parsed or violates the
    /// snapshot invariants is reported as [`StoreError::CorruptStore`], and the in-memory
    /// collection is left as it was.
    ///
    /// Returns the number of entries loaded.
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub async fn load(&self) -> Result<usize, StoreError> {
        let _guard = self.writer.lock().await;

        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("No snapshot found, starting with an empty store");
                self.publish(Vec::new());
                return Ok(0);
            }
            Err(source) => {
                return Err(StoreError::Io {
                    path: self.path.clone(),
                    source,
                });
            }
        };

        let entries = Snapshot::decode(&bytes).map_err(|reason| StoreError::CorruptStore {
            path: self.path.clone(),
            reason,
        })?;

        let count = entries.len();
        self.publish(entries);
        info!(entries = count, "Loaded snapshot");
        Ok(count)
    }

    /// Writes the full collection to the snapshot file.
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub async fn save(&self) -> Result<(), StoreError> {
        let _guard = self.writer.lock().await;
        let entries = self.entries();
        self.persist(&entries).await
    }

    /// Embeds `texts`, appends them with their metadata and persists the result.
    ///
    /// `metadatas`, if given, must have one record per text; texts without metadata are
    /// tagged with [`UNKNOWN_SOURCE`]. An empty `texts` slice is a no-op.
    ///
    /// The call is all-or-nothing: if embedding, validation or the write fails, the store
    /// keeps its previous content in memory and on disk.
    ///
    /// Returns the number of entries added.
    #[instrument(skip_all, fields(path = %self.path.display(), count = texts.len()))]
    pub async fn add_texts<S: AsRef<str>>(
        &self,
        texts: &[S],
        metadatas: Option<&[Metadata]>,
    ) -> Result<usize, StoreError> {
        if let Some(metadatas) = metadatas {
            if metadatas.len() != texts.len() {
                return Err(StoreError::MetadataLengthMismatch {
                    texts: texts.len(),
                    metadatas: metadatas.len(),
                });
            }
        }
        if texts.is_empty() {
            debug!("Nothing to add");
            return Ok(0);
        }

        let _guard = self.writer.lock().await;

        let refs: Vec<&str> = texts.iter().map(AsRef::as_ref).collect();
        let embeddings = self.embedder.embed_batch(&refs).await?;
        if embeddings.len() != texts.len() {
            return Err(EmbeddingError::CountMismatch {
                expected: texts.len(),
                actual: embeddings.len(),
            }
            .into());
        }

        let current = self.entries();
        let expected = current
            .first()
            .map(|e| e.embedding.dimensions())
            .or_else(|| embeddings.first().map(Embedding::dimensions))
            .unwrap_or_default();
        if let Some(bad) = embeddings.iter().find(|e| e.dimensions() != expected) {
            return Err(EmbeddingError::DimensionMismatch {
                expected,
                actual: bad.dimensions(),
            }
            .into());
        }

        let mut next = Vec::with_capacity(current.len() + texts.len());
        next.extend(current.iter().cloned());
        next.extend(texts.iter().zip(embeddings).enumerate().map(|(idx, (text, embedding))| Entry {
            text: text.as_ref().to_string(),
            metadata: metadatas.map(|m| m[idx].clone()).unwrap_or_default(),
            embedding,
        }));

        self.persist(&next).await?;
        let added = texts.len();
        self.publish(next);
        info!(added, total = current.len() + added, "Added texts to store");
        Ok(added)
    }

    /// Returns the `top_k` entries most similar to `query`, best first.
    ///
    /// An empty store or a `top_k` of zero returns no results without invoking the
    /// embedder. A query embedding whose dimensionality differs from the stored vectors
    /// fails with [`EmbeddingError::DimensionMismatch`].
    #[instrument(skip(self, query), fields(query_len = query.len()))]
    pub async fn search(&self, query: &str, top_k: usize) -> Result<Vec<ScoredEntry>, StoreError> {
        let entries = self.entries();
        if entries.is_empty() || top_k == 0 {
            return Ok(Vec::new());
        }

        let query_embedding = self.embedder.embed(query).await?;
        let expected = entries[0].embedding.dimensions();
        if query_embedding.dimensions() != expected {
            return Err(EmbeddingError::DimensionMismatch {
                expected,
                actual: query_embedding.dimensions(),
            }
            .into());
        }

        let results = search::rank(&query_embedding, &entries, top_k);
        debug!(results = results.len(), corpus = entries.len(), "Search complete");
        Ok(results)
    }

    /// A shared snapshot of the committed entries, in insertion order.
    pub fn entries(&self) -> Arc<[Entry]> {
        self.committed
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    /// Dimensionality of the stored vectors, or `None` when the store is empty.
    pub fn dimensions(&self) -> Option<usize> {
        self.entries().first().map(|e| e.embedding.dimensions())
    }

    /// Number of entries per source label.
    pub fn sources(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for entry in self.entries().iter() {
            *counts.entry(entry.source().to_string()).or_insert(0) += 1;
        }
        counts
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn embedder(&self) -> &Arc<dyn Embedder> {
        &self.embedder
    }

    async fn persist(&self, entries: &[Entry]) -> Result<(), StoreError> {
        let bytes = snapshot::encode(entries)?;
        snapshot::write_atomic(&self.path, &bytes)
            .await
            .map_err(|source| StoreError::Io {
                path: self.path.clone(),
                source,
            })?;
        debug!(entries = entries.len(), bytes = bytes.len(), "Snapshot written");
        Ok(())
    }

    fn publish(&self, entries: Vec<Entry>) {
        *self.committed.write().unwrap_or_else(PoisonError::into_inner) = Arc::from(entries);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::HashEmbedder;
    use tempfile::tempdir;

    fn store_at(path: &Path) -> DocumentStore {
        DocumentStore::new(path, Arc::new(HashEmbedder::with_dimensions(32)))
    }

    #[test]
    fn metadata_defaults_to_unknown_source() {
        assert_eq!(Metadata::default().source, UNKNOWN_SOURCE);
        let parsed: Metadata = serde_json::from_str("{}").unwrap();
        assert_eq!(parsed, Metadata::default());
    }

    #[tokio::test]
    async fn add_texts_tags_missing_metadata_as_unknown() {
        let dir = tempdir().unwrap();
        let store = store_at(&dir.path().join("store.json"));

        let added = store.add_texts(&["Rule A.", "Rule B."], None).await.unwrap();

        assert_eq!(added, 2);
        assert!(store.entries().iter().all(|e| e.source() == UNKNOWN_SOURCE));
        assert_eq!(store.dimensions(), Some(32));
    }

    #[tokio::test]
    async fn metadata_length_mismatch_is_rejected_before_embedding() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.json");
        let store = store_at(&path);

        let result = store
            .add_texts(&["a", "b"], Some(&[Metadata::with_source("X")][..]))
            .await;

        assert!(matches!(
            result,
            Err(StoreError::MetadataLengthMismatch { texts: 2, metadatas: 1 })
        ));
        assert!(store.is_empty());
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn rejected_input_leaves_store_untouched() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.json");
        let store = store_at(&path);
        store.add_texts(&["Rule A."], None).await.unwrap();
        let before = std::fs::read(&path).unwrap();

        let result = store.add_texts(&["Rule B.", "  "], None).await;

        assert!(matches!(
            result,
            Err(StoreError::Embedding(EmbeddingError::InvalidRequest(_)))
        ));
        assert_eq!(store.len(), 1);
        assert_eq!(std::fs::read(&path).unwrap(), before);
    }

    #[tokio::test]
    async fn missing_snapshot_loads_empty() {
        let dir = tempdir().unwrap();
        let store = store_at(&dir.path().join("absent.json"));
        assert_eq!(store.load().await.unwrap(), 0);
        assert!(store.is_empty());
        assert_eq!(store.dimensions(), None);
    }

    #[tokio::test]
    async fn sources_are_counted() {
        let dir = tempdir().unwrap();
        let store = store_at(&dir.path().join("store.json"));
        store
            .add_texts(
                &["a", "b", "c"],
                Some(&[
                    Metadata::with_source("LAW"),
                    Metadata::with_source("MED"),
                    Metadata::with_source("LAW"),
                ][..]),
            )
            .await
            .unwrap();

        let sources = store.sources();
        assert_eq!(sources.get("LAW"), Some(&2));
        assert_eq!(sources.get("MED"), Some(&1));
    }
}
