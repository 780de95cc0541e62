use std::{path::Path, sync::Arc};

use anyhow::{Context, Result, anyhow};
use tracing::{debug, info};

use truthforge_core::{
    chat::LanguageModel,
    embedding::{Embedder, HashEmbedder},
    ingest::{self, Granularity, IngestReport},
    search::ScoredEntry,
    store::DocumentStore,
    verify::{FixResult, VerificationReport, Verifier, VerifyRequest},
};
use truthforge_extensions::gemini::{GeminiClient, GeminiConfig, GeminiModel};

use crate::config::Config;

/// Wires configuration, the Gemini client and the document store together.
pub struct TruthForge {
    pub config: Config,
    gemini: Option<GeminiClient>,
}

impl TruthForge {
    /// Builds a Gemini client when an API key is configured and `offline` is not set.
    pub fn new(config: Config) -> Result<Self> {
        let gemini = match (&config.api_key, config.offline) {
            (Some(api_key), false) => {
                let mut gemini_config = GeminiConfig::new(api_key.as_str())?;
                if let Some(base_url) = &config.base_url {
                    gemini_config = gemini_config.base_url(base_url)?;
                }
                Some(GeminiClient::from_config(gemini_config, None).context("Failed to create Gemini client")?)
            }
            _ => None,
        };
        debug!(?config, gemini = gemini.is_some(), "TruthForge configured");
        Ok(Self { config, gemini })
    }

    fn gemini(&self) -> Result<&GeminiClient> {
        if self.config.offline {
            return Err(anyhow!("This command needs the Gemini API and cannot run with --offline"));
        }
        self.gemini
            .as_ref()
            .ok_or_else(|| anyhow!("No Gemini API key configured. Set GEMINI_API_KEY or pass --api-key"))
    }

    pub fn embedder(&self) -> Result<Arc<dyn Embedder>> {
        if self.config.offline {
            return Ok(Arc::new(HashEmbedder::new()));
        }
        let embedder = self
            .gemini()?
            .embedder(&self.config.embedding_model)
            .with_context(|| format!("Invalid embedding model '{}'", self.config.embedding_model))?
            .with_task_type("SEMANTIC_SIMILARITY");
        Ok(Arc::new(embedder))
    }

    pub fn language_model(&self) -> Result<Arc<dyn LanguageModel>> {
        let model = self
            .gemini()?
            .chat_model(&self.config.chat_model)
            .with_context(|| format!("Invalid chat model '{}'", self.config.chat_model))?;
        Ok(Arc::new(model))
    }

    pub async fn open_store(&self) -> Result<Arc<DocumentStore>> {
        self.open_store_with(self.embedder()?).await
    }

    /// Opens the store for read-only inspection. Falls back to the hashing embedder when
    /// no API key is available, since nothing gets embedded.
    pub async fn inspect_store(&self) -> Result<Arc<DocumentStore>> {
        let embedder = match self.embedder() {
            Ok(embedder) => embedder,
            Err(e) => {
                debug!(error = %e, "Embedder unavailable, inspecting with hash embedder");
                Arc::new(HashEmbedder::new())
            }
        };
        self.open_store_with(embedder).await
    }

    async fn open_store_with(&self, embedder: Arc<dyn Embedder>) -> Result<Arc<DocumentStore>> {
        let path = &self.config.store_path;
        let store = DocumentStore::open(path.as_path(), embedder)
            .await
            .with_context(|| format!("Failed to open store at {}", path.display()))?;
        Ok(Arc::new(store))
    }

    /// Ingests the rule file at `path`. A missing file surfaces as
    /// [`IngestError::SourceMissing`](ingest::IngestError::SourceMissing) inside the
    /// returned error.
    pub async fn ingest(&self, path: &Path, granularity: Granularity) -> Result<IngestReport> {
        let store = self.open_store().await?;
        let report = ingest::ingest_file(path, &store, granularity)
            .await
            .with_context(|| format!("Failed to ingest {}", path.display()))?;
        info!(chunks = report.chunks_added, total = store.len(), "Store updated");
        Ok(report)
    }

    pub async fn search(&self, query: &str, limit: usize) -> Result<Vec<ScoredEntry>> {
        let store = self.open_store().await?;
        store
            .search(query, limit)
            .await
            .with_context(|| format!("Search for '{}' failed", query))
    }

    async fn verifier(&self, limit: Option<usize>) -> Result<Verifier> {
        let verifier = Verifier::new(self.language_model()?).with_store(self.open_store().await?);
        Ok(match limit {
            Some(limit) => verifier.verify_limit(limit).fix_limit(limit),
            None => verifier,
        })
    }

    pub async fn verify(&self, request: &VerifyRequest, limit: Option<usize>) -> Result<VerificationReport> {
        let verifier = self.verifier(limit).await?;
        verifier.verify(request).await.context("Verification failed")
    }

    pub async fn fix(&self, request: &VerifyRequest, limit: Option<usize>) -> Result<FixResult> {
        let verifier = self.verifier(limit).await?;
        verifier.fix(request).await.context("Fix failed")
    }

    pub async fn list_models(&self) -> Result<Vec<GeminiModel>> {
        self.gemini()?.list_models().await.context("Failed to list Gemini models")
    }
}
