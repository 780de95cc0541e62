use serde::Deserialize;
use tracing::{debug, error, instrument, warn};

use super::{error::GeminiError, shared::SharedGeminiClient};

const PAGE_SIZE: &str = "100";
/// Upper bound on followed pages, in case the server keeps returning a token.
const MAX_PAGES: usize = 50;

/// A model available through the Gemini API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeminiModel {
    /// Model id without the `models/` prefix, as accepted by
    /// [`GeminiClient::chat_model`](super::GeminiClient::chat_model) and
    /// [`GeminiClient::embedder`](super::GeminiClient::embedder).
    pub id: String,
    pub display_name: Option<String>,
    pub description: Option<String>,
    pub input_token_limit: Option<u32>,
    pub output_token_limit: Option<u32>,
    /// e.g. "generateContent", "embedContent".
    pub supported_generation_methods: Vec<String>,
}

impl GeminiModel {
    pub fn supports(&self, method: &str) -> bool {
        self.supported_generation_methods.iter().any(|m| m == method)
    }

    pub fn is_chat_model(&self) -> bool {
        self.supports("generateContent")
    }

    pub fn is_embedding_model(&self) -> bool {
        self.supports("embedContent") || self.supports("batchEmbedContents")
    }
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct GeminiListModelsResponse {
    #[serde(default)]
    models: Vec<GeminiModelInfo>,
    next_page_token: Option<String>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct GeminiModelInfo {
    /// Format: "models/{model_id}"
    name: String,
    display_name: Option<String>,
    description: Option<String>,
    input_token_limit: Option<u32>,
    output_token_limit: Option<u32>,
    #[serde(default)]
    supported_generation_methods: Vec<String>,
}

impl GeminiModelInfo {
    fn into_model(self) -> Option<GeminiModel> {
        match self.name.rsplit('/').next() {
            Some(id) if !id.is_empty() => Some(GeminiModel {
                id: id.to_string(),
                display_name: self.display_name,
                description: self.description,
                input_token_limit: self.input_token_limit,
                output_token_limit: self.output_token_limit,
                supported_generation_methods: self.supported_generation_methods,
            }),
            _ => {
                warn!(raw_name = %self.name, "Could not parse model ID from Gemini model name");
                None
            }
        }
    }
}

/// Fetches every page of `GET v1beta/models`.
#[instrument(skip(shared_client), fields(base_url = %shared_client.config().base_url))]
pub(crate) async fn list_models(shared_client: &SharedGeminiClient) -> Result<Vec<GeminiModel>, GeminiError> {
    let mut models = Vec::new();
    let mut page_token: Option<String> = None;

    for page in 0..MAX_PAGES {
        let mut url = shared_client.build_url("models")?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("pageSize", PAGE_SIZE);
            if let Some(token) = &page_token {
                query.append_pair("pageToken", token);
            }
        }
        debug!(page, "Requesting Gemini models list");

        let raw_body = shared_client.get(url).await?;
        let response = parse_page(&raw_body)?;
        models.extend(response.models.into_iter().filter_map(GeminiModelInfo::into_model));

        match response.next_page_token {
            Some(token) if !token.is_empty() => page_token = Some(token),
            _ => {
                debug!(count = models.len(), "Successfully listed models");
                return Ok(models);
            }
        }
    }

    warn!(max_pages = MAX_PAGES, "Stopped following model list pages");
    Ok(models)
}

fn parse_page(raw_body: &str) -> Result<GeminiListModelsResponse, GeminiError> {
    serde_json::from_str(raw_body).map_err(|e| {
        error!(parse_error = %e, "Failed to parse Gemini model list JSON");
        GeminiError::ResponseParsing {
            context: "Parsing model list".to_string(),
            source: e,
        }
    })
}
