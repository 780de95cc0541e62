//! On-disk snapshot format and atomic file replacement.
//!
//! ```json
//! {
//!   "documents": [ { "text": "...", "metadata": { "source": "...", ... } }, ... ],
//!   "embeddings": [ [0.1, 0.2, ...], ... ]
//! }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tokio::{fs, io::AsyncWriteExt};
use tracing::{trace, warn};
use uuid::Uuid;

use crate::embedding::Embedding;

use super::{Entry, Metadata};

#[derive(Debug, Deserialize)]
pub(crate) struct Snapshot {
    documents: Vec<StoredDocument>,
    embeddings: Vec<Embedding>,
}

#[derive(Debug, Deserialize)]
struct StoredDocument {
    text: String,
    #[serde(default)]
    metadata: Metadata,
}

#[derive(Serialize)]
struct SnapshotRef<'a> {
    documents: Vec<StoredDocumentRef<'a>>,
    embeddings: Vec<&'a Embedding>,
}

#[derive(Serialize)]
struct StoredDocumentRef<'a> {
    text: &'a str,
    metadata: &'a Metadata,
}

impl Snapshot {
    /// Parses and validates snapshot bytes.
    ///
    /// The error string describes the first violated invariant.
    pub(crate) fn decode(bytes: &[u8]) -> Result<Vec<Entry>, String> {
        let snapshot: Snapshot = serde_json::from_slice(bytes).map_err(|e| e.to_string())?;
        snapshot.into_entries()
    }

    fn into_entries(self) -> Result<Vec<Entry>, String> {
        if self.documents.len() != self.embeddings.len() {
            return Err(format!(
                "{} documents but {} embeddings",
                self.documents.len(),
                self.embeddings.len()
            ));
        }

        if let Some(first) = self.embeddings.first() {
            let dimensions = first.dimensions();
            if let Some((idx, bad)) = self
                .embeddings
                .iter()
                .enumerate()
                .find(|(_, e)| e.dimensions() != dimensions)
            {
                return Err(format!(
                    "embedding {} has {} dimensions, expected {}",
                    idx,
                    bad.dimensions(),
                    dimensions
                ));
            }
        }

        Ok(self
            .documents
            .into_iter()
            .zip(self.embeddings)
            .map(|(doc, embedding)| Entry {
                text: doc.text,
                metadata: doc.metadata,
                embedding,
            })
            .collect())
    }
}

/// Serializes entries in snapshot form.
pub(crate) fn encode(entries: &[Entry]) -> Result<Vec<u8>, serde_json::Error> {
    let snapshot = SnapshotRef {
        documents: entries
            .iter()
            .map(|e| StoredDocumentRef { text: &e.text, metadata: &e.metadata })
            .collect(),
        embeddings: entries.iter().map(|e| &e.embedding).collect(),
    };
    serde_json::to_vec(&snapshot)
}

/// Replaces `path` with `bytes` so that readers see either the old or the new content.
///
/// The data is written to a uniquely named temporary file next to the target, synced,
/// and then renamed over it. Missing parent directories are created.
pub(crate) async fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent).await?;

    let file_name = path.file_name().ok_or_else(|| {
        std::io::Error::new(std::io::ErrorKind::InvalidInput, "snapshot path has no file name")
    })?;
    let tmp_path = parent.join(format!(
        ".{}.{}.tmp",
        file_name.to_string_lossy(),
        Uuid::new_v4().simple()
    ));
    trace!(tmp = %tmp_path.display(), "Writing snapshot to temporary file");

    let result = async {
        let mut file = fs::File::create(&tmp_path).await?;
        file.write_all(bytes).await?;
        file.sync_all().await?;
        drop(file);
        fs::rename(&tmp_path, path).await
    }
    .await;

    if result.is_err() {
        if let Err(e) = fs::remove_file(&tmp_path).await {
            warn!(tmp = %tmp_path.display(), error = %e, "Failed to remove temporary snapshot file");
        }
    }
    result
}
