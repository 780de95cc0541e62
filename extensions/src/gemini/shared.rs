use std::time::Duration;

use reqwest::{Client, RequestBuilder};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use tracing::{debug, error, instrument, trace};
use url::Url;

use super::error::{GeminiError, map_response_error};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Configuration for Gemini clients.
#[derive(Clone, Debug)]
pub struct GeminiConfig {
    pub(crate) api_key: SecretString,
    pub(crate) base_url: Url,
    pub(crate) timeout: Duration,
}

impl GeminiConfig {
    /// Creates a configuration for the public Generative Language endpoint with a 60 second
    /// request timeout.
    ///
    /// # Errors
    /// Returns `GeminiError::InvalidConfiguration` if the API key is empty.
    pub fn new(api_key: impl Into<String>) -> Result<Self, GeminiError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(GeminiError::InvalidConfiguration("API key cannot be empty".to_string()));
        }

        let base_url = Url::parse(DEFAULT_BASE_URL).map_err(|e| {
            GeminiError::InvalidConfiguration(format!("Failed to parse default base URL: {}", e))
        })?;

        Ok(Self {
            api_key: api_key.into(),
            base_url,
            timeout: DEFAULT_TIMEOUT,
        })
    }

    /// Overrides the base URL (e.g. for a proxy or a local test server).
    pub fn base_url(mut self, url: &str) -> Result<Self, GeminiError> {
        let parsed = Url::parse(url).map_err(|e| {
            GeminiError::InvalidConfiguration(format!("Invalid base URL '{}': {}", url, e))
        })?;
        if parsed.cannot_be_a_base() {
            return Err(GeminiError::InvalidConfiguration(format!(
                "Base URL '{}' cannot be used as a base",
                url
            )));
        }
        self.base_url = parsed;
        Ok(self)
    }

    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// HTTP client and configuration shared by the Gemini embedder, chat model and model
/// listing.
#[derive(Clone, Debug)]
pub(crate) struct SharedGeminiClient {
    config: GeminiConfig,
    http_client: Client,
}

impl SharedGeminiClient {
    /// Builds a default reqwest client with the configured timeout unless one is provided.
    #[instrument(name = "shared_gemini_client_new", skip(config, client_override))]
    pub(crate) fn new(config: GeminiConfig, client_override: Option<Client>) -> Result<Self, GeminiError> {
        let http_client = match client_override {
            Some(client) => {
                debug!("Using provided HTTP client");
                client
            }
            None => {
                debug!(timeout = ?config.timeout, "Building default HTTP client");
                Client::builder()
                    .timeout(config.timeout)
                    .build()
                    .map_err(|e| {
                        GeminiError::InvalidConfiguration(format!("Failed to build HTTP client: {}", e))
                    })?
            }
        };

        debug!(base_url = %config.base_url, "Shared Gemini client initialized");
        Ok(Self { config, http_client })
    }

    pub(crate) fn config(&self) -> &GeminiConfig {
        &self.config
    }

    /// Appends `v1beta/{relative_path}` to the base URL. The API key is not part of the URL.
    pub(crate) fn build_url(&self, relative_path: &str) -> Result<Url, GeminiError> {
        let mut url = self.config.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| GeminiError::InvalidConfiguration("Base URL cannot be a base".to_string()))?
            .pop_if_empty()
            .push("v1beta")
            .extend(relative_path.split('/'));
        trace!(built_url = %url, "Built Gemini API URL");
        Ok(url)
    }

    /// Sends `body` as JSON to `url` and returns the raw success body.
    pub(crate) async fn post_json<T: Serialize + ?Sized>(
        &self,
        url: Url,
        body: &T,
    ) -> Result<String, GeminiError> {
        let request_json = serde_json::to_string(body).map_err(|e| {
            error!(error = %e, "Failed to serialize Gemini request body");
            GeminiError::RequestSerialization(e)
        })?;
        trace!(body = %request_json, "Constructed Gemini request body");

        let request = self
            .http_client
            .post(url)
            .header("Content-Type", "application/json")
            .body(request_json);
        self.send(request).await
    }

    /// Sends a GET request to `url` and returns the raw success body.
    pub(crate) async fn get(&self, url: Url) -> Result<String, GeminiError> {
        self.send(self.http_client.get(url)).await
    }

    async fn send(&self, request: RequestBuilder) -> Result<String, GeminiError> {
        let response = request
            .header("x-goog-api-key", self.config.api_key.expose_secret())
            .send()
            .await
            .map_err(GeminiError::Network)?;

        let status = response.status();
        if !status.is_success() {
            error!(%status, "Gemini API returned error status");
            return Err(map_response_error(response).await);
        }

        debug!(%status, "Received successful Gemini response");
        let raw_body = response.text().await.map_err(|e| {
            error!(error = %e, "Failed to read successful response body");
            GeminiError::Network(e)
        })?;
        trace!(body = %raw_body, "Received Gemini response body");
        Ok(raw_body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base_url: &str) -> SharedGeminiClient {
        let config = GeminiConfig::new("test-key").unwrap().base_url(base_url).unwrap();
        SharedGeminiClient::new(config, None).unwrap()
    }

    #[test]
    fn rejects_empty_api_key() {
        assert!(matches!(GeminiConfig::new(""), Err(GeminiError::InvalidConfiguration(_))));
        assert!(matches!(GeminiConfig::new("  "), Err(GeminiError::InvalidConfiguration(_))));
    }

    #[test]
    fn rejects_invalid_base_url() {
        let config = GeminiConfig::new("key").unwrap();
        assert!(config.clone().base_url("not a url").is_err());
        assert!(config.base_url("mailto:someone@example.com").is_err());
    }

    #[test]
    fn api_key_is_not_printed() {
        let config = GeminiConfig::new("super-secret-key").unwrap();
        assert!(!format!("{:?}", config).contains("super-secret-key"));
    }

    #[test]
    fn builds_versioned_urls() {
        let url = client("https://generativelanguage.googleapis.com")
            .build_url("models/text-embedding-004:batchEmbedContents")
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://generativelanguage.googleapis.com/v1beta/models/text-embedding-004:batchEmbedContents"
        );

        let url = client("http://localhost:8080/proxy/").build_url("models").unwrap();
        assert_eq!(url.as_str(), "http://localhost:8080/proxy/v1beta/models");
    }

    #[test]
    fn default_timeout_is_sixty_seconds() {
        assert_eq!(GeminiConfig::new("key").unwrap().timeout, Duration::from_secs(60));
    }
}
