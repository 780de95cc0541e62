use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, instrument, warn};

use truthforge_core::chat::{ChatError, LanguageModel};

use super::{error::GeminiError, shared::SharedGeminiClient};

/// Language model backed by the Gemini `generateContent` endpoint.
///
/// Each call sends the prompt as a single user turn and returns the concatenated text
/// parts of the first candidate.
#[derive(Debug, Clone)]
pub struct GeminiChatModel {
    shared_client: Arc<SharedGeminiClient>,
    model_id: String,
    temperature: Option<f32>,
    max_output_tokens: Option<u32>,
}

impl GeminiChatModel {
    pub(crate) fn new(shared_client: Arc<SharedGeminiClient>, model_id: String) -> Result<Self, GeminiError> {
        let model_id = model_id.trim_start_matches("models/").to_string();
        if model_id.is_empty() {
            return Err(GeminiError::InvalidConfiguration("Model id cannot be empty".to_string()));
        }
        Ok(Self {
            shared_client,
            model_id,
            temperature: None,
            max_output_tokens: None,
        })
    }

    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    #[must_use]
    pub fn with_max_output_tokens(mut self, max_output_tokens: u32) -> Self {
        self.max_output_tokens = Some(max_output_tokens);
        self
    }

    fn request_body<'a>(&self, prompt: &'a str) -> GeminiGenerateRequest<'a> {
        let generation_config = GeminiGenerationConfig {
            temperature: self.temperature,
            max_output_tokens: self.max_output_tokens,
            candidate_count: Some(1),
        };
        GeminiGenerateRequest {
            contents: vec![GeminiContent {
                role: "user",
                parts: vec![GeminiRequestPart { text: prompt }],
            }],
            generation_config: Some(generation_config)
                .filter(|c| c.temperature.is_some() || c.max_output_tokens.is_some()),
        }
    }
}

#[async_trait]
impl LanguageModel for GeminiChatModel {
    #[instrument(skip(self, prompt), fields(model = %self.model_id, prompt_len = prompt.len()))]
    async fn generate(&self, prompt: &str) -> Result<String, ChatError> {
        async {
            let url = self
                .shared_client
                .build_url(&format!("models/{}:generateContent", self.model_id))?;
            debug!(%url, "Sending generate request to Gemini");

            let raw_body = self.shared_client.post_json(url, &self.request_body(prompt)).await?;
            let response: GeminiGenerateResponse = serde_json::from_str(&raw_body).map_err(|e| {
                error!(parse_error = %e, "Failed to parse Gemini generate response JSON");
                GeminiError::ResponseParsing {
                    context: "Parsing generate response".to_string(),
                    source: e,
                }
            })?;

            response.into_text()
        }
        .await
        .map_err(Into::into)
    }

    fn model_name(&self) -> &str {
        &self.model_id
    }
}

// --- Request structures ---

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerateRequest<'a> {
    contents: Vec<GeminiContent<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GeminiGenerationConfig>,
}

#[derive(Serialize, Debug)]
struct GeminiContent<'a> {
    role: &'a str,
    parts: Vec<GeminiRequestPart<'a>>,
}

#[derive(Serialize, Debug)]
struct GeminiRequestPart<'a> {
    text: &'a str,
}

#[derive(Serialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    candidate_count: Option<u32>,
}

// --- Response structures ---

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerateResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    prompt_feedback: Option<GeminiPromptFeedback>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    content: Option<GeminiResponseContent>,
    finish_reason: Option<String>,
}

#[derive(Deserialize, Debug)]
struct GeminiResponseContent {
    #[serde(default)]
    parts: Vec<GeminiResponsePart>,
}

#[derive(Deserialize, Debug)]
struct GeminiResponsePart {
    text: Option<String>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct GeminiPromptFeedback {
    block_reason: Option<String>,
}

impl GeminiGenerateResponse {
    fn into_text(self) -> Result<String, GeminiError> {
        if let Some(reason) = self.prompt_feedback.and_then(|f| f.block_reason) {
            warn!(%reason, "Gemini blocked the prompt");
            return Err(GeminiError::Blocked(reason));
        }

        let Some(candidate) = self.candidates.into_iter().next() else {
            warn!("Gemini response contained no candidates");
            return Err(GeminiError::EmptyResponse);
        };

        let text: String = candidate
            .content
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(match candidate.finish_reason.as_deref() {
                Some(reason @ ("SAFETY" | "PROHIBITED_CONTENT" | "BLOCKLIST" | "SPII")) => {
                    GeminiError::Blocked(reason.to_string())
                }
                other => {
                    debug!(finish_reason = ?other, "Gemini candidate has no text");
                    GeminiError::EmptyResponse
                }
            });
        }
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gemini::shared::GeminiConfig;

    fn model() -> GeminiChatModel {
        let shared = SharedGeminiClient::new(GeminiConfig::new("key").unwrap(), None).unwrap();
        GeminiChatModel::new(Arc::new(shared), "models/gemini-2.0-flash".to_string()).unwrap()
    }

    fn parse(json: &str) -> Result<String, GeminiError> {
        serde_json::from_str::<GeminiGenerateResponse>(json).unwrap().into_text()
    }

    #[test]
    fn serializes_single_turn_request() {
        let body = model().request_body("Is water wet?");
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            serde_json::json!({
                "contents": [{ "role": "user", "parts": [{ "text": "Is water wet?" }] }]
            })
        );

        let body = model().with_temperature(0.2).request_body("x");
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["generationConfig"]["candidateCount"], 1);
        assert!(value["generationConfig"]["temperature"].is_number());
    }

    #[test]
    fn joins_text_parts_of_first_candidate() {
        let text = parse(
            r#"{"candidates":[
                {"content":{"role":"model","parts":[{"text":"{\"a\":"},{"text":"1}"}]},"finishReason":"STOP"},
                {"content":{"role":"model","parts":[{"text":"ignored"}]}}
            ]}"#,
        )
        .unwrap();
        assert_eq!(text, r#"{"a":1}"#);
    }

    #[test]
    fn missing_text_is_an_empty_response() {
        assert!(matches!(parse(r#"{"candidates":[]}"#), Err(GeminiError::EmptyResponse)));
        assert!(matches!(parse(r#"{}"#), Err(GeminiError::EmptyResponse)));
        assert!(matches!(
            parse(r#"{"candidates":[{"finishReason":"MAX_TOKENS"}]}"#),
            Err(GeminiError::EmptyResponse)
        ));
    }

    #[test]
    fn blocked_content_is_reported() {
        assert!(matches!(
            parse(r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#),
            Err(GeminiError::Blocked(r)) if r == "SAFETY"
        ));
        assert!(matches!(
            parse(r#"{"candidates":[{"finishReason":"SAFETY"}]}"#),
            Err(GeminiError::Blocked(_))
        ));
    }

    #[test]
    fn strips_models_prefix() {
        assert_eq!(model().model_name(), "gemini-2.0-flash");
    }
}
