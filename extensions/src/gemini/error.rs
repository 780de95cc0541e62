use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;
use tracing::warn;

use truthforge_core::{chat::ChatError, embedding::EmbeddingError};

/// Error body returned by the Gemini API.
#[derive(Deserialize, Debug, Clone)]
pub struct GeminiErrorResponse {
    pub error: GeminiErrorDetail,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct GeminiErrorDetail {
    /// Usually matches the HTTP status.
    pub code: u16,
    pub message: String,
    /// e.g. "INVALID_ARGUMENT", "UNAUTHENTICATED".
    #[serde(default)]
    pub status: String,
}

/// Internal error type of the Gemini client.
///
/// Converted into [`ChatError`] or [`EmbeddingError`] at the trait boundaries; only
/// [`GeminiClient::list_models`](super::GeminiClient::list_models) and the constructors
/// return it directly.
#[derive(Error, Debug)]
pub enum GeminiError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Failed to serialize request body: {0}")]
    RequestSerialization(#[source] serde_json::Error),

    #[error("Failed to parse successful response body ({context}): {source}")]
    ResponseParsing {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Gemini API error: status={status}, message='{body_text}'")]
    ApiError {
        status: StatusCode,
        detail: Option<GeminiErrorDetail>,
        body_text: String,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Rejected before sending (e.g. an empty text).
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A successful response that does not match the API contract (e.g. wrong number of
    /// embeddings).
    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    /// The prompt or the candidate was blocked by safety filters.
    #[error("Content blocked: {0}")]
    Blocked(String),

    /// The response contained no text.
    #[error("Empty response")]
    EmptyResponse,
}

impl GeminiError {
    /// Human-readable message for an API error, preferring the parsed detail.
    fn api_message(detail: Option<GeminiErrorDetail>, body_text: String) -> String {
        detail
            .map(|d| format!("{} (Status: {}, Code: {})", d.message, d.status, d.code))
            .unwrap_or(body_text)
    }
}

/// Converts a non-success response into `GeminiError::ApiError`.
///
/// The body is parsed as a [`GeminiErrorResponse`] when possible; otherwise the raw text
/// is kept. Failing to read the body at all is reported as `GeminiError::Network`.
pub(crate) async fn map_response_error(response: reqwest::Response) -> GeminiError {
    let status = response.status();
    match response.text().await {
        Ok(body_text) => {
            let detail = match serde_json::from_str::<GeminiErrorResponse>(&body_text) {
                Ok(parsed) => Some(parsed.error),
                Err(parse_err) => {
                    warn!(
                        %status,
                        error = %parse_err,
                        body = %body_text,
                        "Failed to parse Gemini error response JSON, keeping raw body"
                    );
                    None
                }
            };
            GeminiError::ApiError { status, detail, body_text }
        }
        Err(e) => {
            warn!(%status, error = %e, "Failed to read Gemini error response body");
            GeminiError::Network(e)
        }
    }
}

impl From<GeminiError> for ChatError {
    fn from(err: GeminiError) -> Self {
        match err {
            GeminiError::Network(source) => ChatError::Network(Box::new(source)),
            GeminiError::RequestSerialization(source) => {
                ChatError::InvalidRequest(format!("Failed to serialize request: {}", source))
            }
            GeminiError::ResponseParsing { source, .. } => ChatError::Parsing(Box::new(source)),
            GeminiError::ApiError { status, detail, body_text } => {
                let message = GeminiError::api_message(detail, body_text);
                match status {
                    StatusCode::BAD_REQUEST => ChatError::InvalidRequest(message),
                    StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ChatError::Authentication(message),
                    StatusCode::NOT_FOUND => ChatError::ModelNotFound(message),
                    StatusCode::TOO_MANY_REQUESTS => ChatError::RateLimited,
                    _ => ChatError::Api {
                        status: Some(status.as_u16()),
                        message,
                    },
                }
            }
            GeminiError::InvalidConfiguration(msg) => ChatError::Configuration(msg),
            GeminiError::InvalidInput(msg) => ChatError::InvalidRequest(msg),
            GeminiError::UnexpectedResponse(msg) => ChatError::Provider(msg.into()),
            GeminiError::Blocked(reason) => ChatError::ContentBlocked(reason),
            GeminiError::EmptyResponse => ChatError::EmptyResponse,
        }
    }
}

impl From<GeminiError> for EmbeddingError {
    fn from(err: GeminiError) -> Self {
        match err {
            GeminiError::Network(source) => EmbeddingError::Network(Box::new(source)),
            GeminiError::RequestSerialization(source) => {
                EmbeddingError::Provider(Box::new(GeminiError::RequestSerialization(source)))
            }
            GeminiError::ResponseParsing { source, .. } => EmbeddingError::Parsing(Box::new(source)),
            GeminiError::ApiError { status, detail, body_text } => {
                let message = GeminiError::api_message(detail, body_text);
                match status {
                    StatusCode::BAD_REQUEST => EmbeddingError::InvalidRequest(message),
                    StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => EmbeddingError::Authentication(message),
                    StatusCode::NOT_FOUND => EmbeddingError::ModelNotFound(message),
                    StatusCode::TOO_MANY_REQUESTS => EmbeddingError::RateLimited,
                    _ => EmbeddingError::Api {
                        status: Some(status.as_u16()),
                        message,
                        source: None,
                    },
                }
            }
            GeminiError::InvalidConfiguration(msg) => EmbeddingError::Configuration(msg),
            GeminiError::InvalidInput(msg) => EmbeddingError::InvalidRequest(msg),
            GeminiError::UnexpectedResponse(msg) => EmbeddingError::Provider(msg.into()),
            err @ (GeminiError::Blocked(_) | GeminiError::EmptyResponse) => {
                EmbeddingError::Provider(Box::new(err))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api_error(status: u16, body: &str) -> GeminiError {
        GeminiError::ApiError {
            status: StatusCode::from_u16(status).unwrap(),
            detail: serde_json::from_str::<GeminiErrorResponse>(body).ok().map(|r| r.error),
            body_text: body.to_string(),
        }
    }

    const NOT_FOUND_BODY: &str = r#"{"error":{"code":404,"message":"models/nope is not found","status":"NOT_FOUND"}}"#;

    #[test]
    fn parses_error_body() {
        let parsed: GeminiErrorResponse = serde_json::from_str(NOT_FOUND_BODY).unwrap();
        assert_eq!(parsed.error.code, 404);
        assert_eq!(parsed.error.status, "NOT_FOUND");
    }

    #[test]
    fn maps_statuses_to_chat_errors() {
        assert!(matches!(ChatError::from(api_error(400, "bad")), ChatError::InvalidRequest(m) if m == "bad"));
        assert!(matches!(ChatError::from(api_error(401, "")), ChatError::Authentication(_)));
        assert!(matches!(ChatError::from(api_error(403, "")), ChatError::Authentication(_)));
        assert!(matches!(
            ChatError::from(api_error(404, NOT_FOUND_BODY)),
            ChatError::ModelNotFound(m) if m.starts_with("models/nope is not found")
        ));
        assert!(matches!(ChatError::from(api_error(429, "")), ChatError::RateLimited));
        assert!(matches!(ChatError::from(api_error(503, "")), ChatError::Api { status: Some(503), .. }));
        assert!(matches!(ChatError::from(GeminiError::EmptyResponse), ChatError::EmptyResponse));
    }

    #[test]
    fn maps_statuses_to_embedding_errors() {
        assert!(matches!(EmbeddingError::from(api_error(400, "")), EmbeddingError::InvalidRequest(_)));
        assert!(matches!(EmbeddingError::from(api_error(403, "")), EmbeddingError::Authentication(_)));
        assert!(matches!(EmbeddingError::from(api_error(404, "")), EmbeddingError::ModelNotFound(_)));
        assert!(matches!(EmbeddingError::from(api_error(429, "")), EmbeddingError::RateLimited));

        let server = EmbeddingError::from(api_error(500, "oops"));
        assert!(matches!(server, EmbeddingError::Api { status: Some(500), .. }));
        assert!(server.is_transient());
        assert!(!EmbeddingError::from(api_error(401, "")).is_transient());
    }

    #[test]
    fn display_includes_status_and_body() {
        let err = api_error(502, "upstream down");
        assert_eq!(err.to_string(), "Gemini API error: status=502 Bad Gateway, message='upstream down'");
    }
}
