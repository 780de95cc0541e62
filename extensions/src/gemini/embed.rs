use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, instrument, warn};
use url::Url;

use truthforge_core::embedding::{Embedder, Embedding, EmbeddingError};

use super::{error::GeminiError, shared::SharedGeminiClient};

/// Maximum number of texts per `batchEmbedContents` request.
pub const BATCH_LIMIT: usize = 100;

/// Embedder backed by the Gemini `batchEmbedContents` endpoint.
///
/// Batches larger than [`BATCH_LIMIT`] are sent as several consecutive requests; the
/// result keeps input order.
#[derive(Debug, Clone)]
pub struct GeminiEmbedder {
    shared_client: Arc<SharedGeminiClient>,
    model_name: String,
    model_path_segment: String,
    task_type: Option<String>,
    dimensions: Option<usize>,
}

impl GeminiEmbedder {
    #[instrument(name = "gemini_embedder_new", skip(shared_client), fields(model_name = %model_name))]
    pub(crate) fn new(
        shared_client: Arc<SharedGeminiClient>,
        model_name: String,
        task_type: Option<String>,
    ) -> Result<Self, GeminiError> {
        let model_name = model_name.trim_start_matches("models/").to_string();
        if model_name.is_empty() {
            return Err(GeminiError::InvalidConfiguration("Model name cannot be empty".to_string()));
        }

        let dimensions = known_dimensions(&model_name);
        if dimensions.is_none() {
            warn!(model = %model_name, "Unknown Gemini embedding model, dimensions not set");
        }
        debug!(model = %model_name, ?task_type, ?dimensions, "GeminiEmbedder created");

        Ok(Self {
            shared_client,
            model_path_segment: format!("models/{}", model_name),
            model_name,
            task_type,
            dimensions,
        })
    }

    /// Sets the task type sent with every request (e.g. "RETRIEVAL_DOCUMENT",
    /// "SEMANTIC_SIMILARITY").
    #[must_use]
    pub fn with_task_type(mut self, task_type: impl Into<String>) -> Self {
        self.task_type = Some(task_type.into());
        self
    }

    fn build_batch_embed_url(&self) -> Result<Url, GeminiError> {
        self.shared_client
            .build_url(&format!("{}:batchEmbedContents", self.model_path_segment))
    }

    async fn embed_chunk(&self, url: &Url, texts: &[&str]) -> Result<Vec<Embedding>, GeminiError> {
        let request_body = GeminiBatchRequest {
            requests: texts
                .iter()
                .map(|text| GeminiEmbedRequest {
                    model: &self.model_path_segment,
                    content: GeminiContent {
                        parts: vec![GeminiPart { text }],
                    },
                    task_type: self.task_type.as_deref(),
                })
                .collect(),
        };

        let raw_body = self.shared_client.post_json(url.clone(), &request_body).await?;
        let response: GeminiBatchResponse = serde_json::from_str(&raw_body).map_err(|e| {
            error!(parse_error = %e, "Failed to parse Gemini embed response JSON");
            GeminiError::ResponseParsing {
                context: "Parsing batch embed response".to_string(),
                source: e,
            }
        })?;

        if response.embeddings.len() != texts.len() {
            let msg = format!(
                "API returned {} embeddings, but expected {}",
                response.embeddings.len(),
                texts.len()
            );
            error!(message = %msg, "Mismatch between input count and embedding count");
            return Err(GeminiError::UnexpectedResponse(msg));
        }

        Ok(response
            .embeddings
            .into_iter()
            .map(|e| Embedding::from(e.values))
            .collect())
    }
}

fn known_dimensions(model_name: &str) -> Option<usize> {
    match model_name {
        "text-embedding-004" | "embedding-001" => Some(768),
        "gemini-embedding-001" | "gemini-embedding-exp-03-07" => Some(3072),
        _ => None,
    }
}

#[async_trait]
impl Embedder for GeminiEmbedder {
    #[instrument(skip(self, texts), fields(model = %self.model_name, num_texts = texts.len()))]
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>, EmbeddingError> {
        async {
            if texts.is_empty() {
                debug!("Input texts slice is empty, returning empty embeddings");
                return Ok(Vec::new());
            }
            if let Some(index) = texts.iter().position(|t| t.trim().is_empty()) {
                return Err(GeminiError::InvalidInput(format!(
                    "Cannot embed empty text (index {})",
                    index
                )));
            }

            let url = self.build_batch_embed_url()?;
            let mut embeddings = Vec::with_capacity(texts.len());
            for (i, chunk) in texts.chunks(BATCH_LIMIT).enumerate() {
                debug!(batch = i, size = chunk.len(), "Sending batch embed request");
                embeddings.extend(self.embed_chunk(&url, chunk).await?);
            }
            Ok(embeddings)
        }
        .await
        .map_err(Into::into)
    }

    fn dimensions(&self) -> Option<usize> {
        self.dimensions
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }

    fn max_batch_size_hint(&self) -> Option<usize> {
        Some(BATCH_LIMIT)
    }
}

// --- Gemini API request structures ---

#[derive(Serialize, Debug)]
struct GeminiBatchRequest<'a> {
    requests: Vec<GeminiEmbedRequest<'a>>,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct GeminiEmbedRequest<'a> {
    model: &'a str,
    content: GeminiContent<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    task_type: Option<&'a str>,
}

#[derive(Serialize, Debug)]
struct GeminiContent<'a> {
    parts: Vec<GeminiPart<'a>>,
}

#[derive(Serialize, Debug)]
struct GeminiPart<'a> {
    text: &'a str,
}

// --- Gemini API response structures ---

#[derive(Deserialize, Debug)]
struct GeminiBatchResponse {
    #[serde(default)]
    embeddings: Vec<GeminiEmbeddingValue>,
}

#[derive(Deserialize, Debug)]
struct GeminiEmbeddingValue {
    values: Vec<f32>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gemini::shared::GeminiConfig;

    fn embedder(model: &str) -> GeminiEmbedder {
        let shared = SharedGeminiClient::new(GeminiConfig::new("key").unwrap(), None).unwrap();
        GeminiEmbedder::new(Arc::new(shared), model.to_string(), None).unwrap()
    }

    #[test]
    fn serializes_batch_request() {
        let body = GeminiBatchRequest {
            requests: vec![GeminiEmbedRequest {
                model: "models/text-embedding-004",
                content: GeminiContent {
                    parts: vec![GeminiPart { text: "hello" }],
                },
                task_type: Some("RETRIEVAL_DOCUMENT"),
            }],
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            serde_json::json!({
                "requests": [{
                    "model": "models/text-embedding-004",
                    "content": { "parts": [{ "text": "hello" }] },
                    "taskType": "RETRIEVAL_DOCUMENT"
                }]
            })
        );
    }

    #[test]
    fn parses_batch_response() {
        let parsed: GeminiBatchResponse =
            serde_json::from_str(r#"{"embeddings":[{"values":[0.1,-0.2]},{"values":[0.3,0.4]}]}"#).unwrap();
        assert_eq!(parsed.embeddings.len(), 2);
        assert_eq!(parsed.embeddings[1].values, vec![0.3, 0.4]);
    }

    #[test]
    fn knows_common_model_dimensions() {
        assert_eq!(embedder("text-embedding-004").dimensions(), Some(768));
        assert_eq!(embedder("models/gemini-embedding-001").dimensions(), Some(3072));
        assert_eq!(embedder("models/gemini-embedding-001").model_name(), "gemini-embedding-001");
        assert_eq!(embedder("my-custom-model").dimensions(), None);
    }

    #[test]
    fn rejects_empty_model_name() {
        let shared = SharedGeminiClient::new(GeminiConfig::new("key").unwrap(), None).unwrap();
        let result = GeminiEmbedder::new(Arc::new(shared), "models/".to_string(), None);
        assert!(matches!(result, Err(GeminiError::InvalidConfiguration(_))));
    }

    #[tokio::test]
    async fn empty_inputs_are_handled_without_network() {
        let embedder = embedder("text-embedding-004");
        assert!(embedder.embed_batch(&[]).await.unwrap().is_empty());
        assert!(matches!(
            embedder.embed_batch(&["ok", " "]).await,
            Err(EmbeddingError::InvalidRequest(_))
        ));
    }
}
