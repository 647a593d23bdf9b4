//! Ollama Text Client
//!
//! Talks to a self-hosted Ollama server via `POST /api/generate` with
//! streaming disabled.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::{TextGenerator, base_string, normalize_base};
use crate::ai::timeout::with_timeout;
use crate::config::LlmConfig;
use crate::constants::{llm, network};
use crate::types::{ErrorClassifier, ProviderError, Result, TaleError};

const PROVIDER: &str = "ollama";

pub struct OllamaClient {
    api_base: String,
    model: String,
    temperature: f32,
    timeout: Duration,
    client: reqwest::Client,
}

impl OllamaClient {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let api_base = Self::validate_endpoint(
            config.api_base.as_deref().unwrap_or(llm::OLLAMA_API_BASE),
        )?;
        let model = config
            .model
            .clone()
            .unwrap_or_else(|| llm::OLLAMA_MODEL.to_string());
        let timeout = Duration::from_secs(config.timeout_secs);

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TaleError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            api_base,
            model,
            temperature: config.temperature,
            timeout,
            client,
        })
    }

    /// Only http/https; warns for non-localhost endpoints.
    fn validate_endpoint(endpoint: &str) -> Result<String> {
        let url = normalize_base(endpoint, "Ollama")?;

        if let Some(host) = url.host_str()
            && !matches!(host, "localhost" | "127.0.0.1" | "[::1]")
        {
            warn!(
                "Ollama endpoint is not localhost: {}. Ensure this is intentional.",
                host
            );
        }

        Ok(base_string(&url))
    }

    async fn send(&self, prompt: &str) -> Result<String> {
        let request = OllamaRequest {
            model: &self.model,
            prompt,
            stream: false,
            options: OllamaOptions {
                temperature: self.temperature,
            },
        };
        let url = format!("{}/api/generate", self.api_base);

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    ProviderError::transport(
                        PROVIDER,
                        format!(
                            "Failed to connect to Ollama at {}. Is Ollama running? Start with: ollama serve",
                            self.api_base
                        ),
                    )
                } else {
                    ErrorClassifier::from_reqwest(&e, PROVIDER)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ErrorClassifier::from_status(status.as_u16(), &body, PROVIDER).into());
        }

        let body: OllamaResponse = response
            .json()
            .await
            .map_err(|e| {
                ProviderError::malformed(PROVIDER, format!("Failed to parse response: {}", e))
            })?;

        if body.response.trim().is_empty() {
            return Err(ProviderError::malformed(PROVIDER, "Empty response field").into());
        }

        Ok(body.response)
    }
}

#[async_trait]
impl TextGenerator for OllamaClient {
    async fn invoke(&self, prompt: &str) -> Result<String> {
        info!(
            "Generating with Ollama (model: {}, temperature: {})",
            self.model, self.temperature
        );
        let start = Instant::now();

        let text = with_timeout(self.timeout, self.send(prompt), "ollama generate").await?;

        debug!(
            elapsed_ms = start.elapsed().as_millis() as u64,
            chars = text.len(),
            "Received response from Ollama"
        );
        Ok(text)
    }

    fn name(&self) -> &str {
        PROVIDER
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn health_check(&self) -> Result<bool> {
        let url = format!("{}/api/tags", self.api_base);
        let probe = async {
            self.client
                .get(&url)
                .send()
                .await
                .map_err(|e| TaleError::from(ErrorClassifier::from_reqwest(&e, PROVIDER)))
        };

        match with_timeout(
            Duration::from_secs(network::HEALTH_TIMEOUT_SECS),
            probe,
            "ollama health",
        )
        .await
        {
            Ok(resp) if resp.status().is_success() => {
                let Ok(tags) = resp.json::<OllamaTagsResponse>().await else {
                    info!("Ollama is available");
                    return Ok(true);
                };
                let base_model = self.model.trim_end_matches(":latest");
                let model_available = tags
                    .models
                    .iter()
                    .any(|m| m.name == self.model || m.name.starts_with(base_model));

                if model_available {
                    info!("Ollama is available with model: {}", self.model);
                    Ok(true)
                } else {
                    warn!(
                        "Ollama is running but model '{}' not found. Pull with: ollama pull {}",
                        self.model, self.model
                    );
                    Ok(false)
                }
            }
            Ok(resp) => {
                warn!("Ollama API check failed: {}", resp.status());
                Ok(false)
            }
            Err(e) => {
                warn!("Ollama not available: {}. Start with: ollama serve", e);
                Ok(false)
            }
        }
    }
}

// Request/Response types

#[derive(Debug, Serialize)]
struct OllamaRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct OllamaResponse {
    response: String,
}

#[derive(Debug, Deserialize)]
struct OllamaTagsResponse {
    models: Vec<OllamaModel>,
}

#[derive(Debug, Deserialize)]
struct OllamaModel {
    name: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{closed_port, request_body, serve_hang, serve_once};
    use crate::types::ErrorCategory;

    fn config_for(base: &str) -> LlmConfig {
        LlmConfig {
            api_base: Some(base.to_string()),
            timeout_secs: 2,
            ..Default::default()
        }
    }

    #[test]
    fn test_default_config() {
        let client = OllamaClient::new(&LlmConfig::default()).unwrap();
        assert_eq!(client.api_base, llm::OLLAMA_API_BASE);
        assert_eq!(client.model, llm::OLLAMA_MODEL);
    }

    #[test]
    fn test_rejects_non_http_endpoint() {
        let config = LlmConfig {
            api_base: Some("file:///etc/passwd".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            OllamaClient::new(&config),
            Err(TaleError::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_invoke_returns_response_field() {
        let (base, request) = serve_once(200, r#"{"response":"{\"scenes\":[]}","done":true}"#).await;
        let client = OllamaClient::new(&config_for(&base)).unwrap();

        let text = client.invoke("tell a story").await.unwrap();
        assert_eq!(text, r#"{"scenes":[]}"#);

        let raw = request.await.unwrap();
        assert!(raw.starts_with("POST /api/generate"));
        let body = request_body(&raw);
        assert_eq!(body["prompt"], "tell a story");
        assert_eq!(body["stream"], false);
        assert_eq!(body["model"], llm::OLLAMA_MODEL);
    }

    #[tokio::test]
    async fn test_invoke_status_error() {
        let (base, _request) = serve_once(500, r#"{"error":"model crashed"}"#).await;
        let client = OllamaClient::new(&config_for(&base)).unwrap();

        match client.invoke("x").await {
            Err(TaleError::Provider(e)) => {
                assert_eq!(e.category, ErrorCategory::UpstreamStatus);
                assert_eq!(e.status, Some(500));
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_invoke_malformed_body() {
        let (base, _request) = serve_once(200, r#"{"unexpected":true}"#).await;
        let client = OllamaClient::new(&config_for(&base)).unwrap();

        match client.invoke("x").await {
            Err(TaleError::Provider(e)) => assert_eq!(e.category, ErrorCategory::MalformedPayload),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_invoke_connection_refused() {
        let base = closed_port().await;
        let client = OllamaClient::new(&config_for(&base)).unwrap();

        match client.invoke("x").await {
            Err(TaleError::Provider(e)) => assert_eq!(e.category, ErrorCategory::Transport),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_invoke_times_out() {
        let base = serve_hang().await;
        let client = OllamaClient::new(&config_for(&base)).unwrap();

        let err = client.invoke("x").await.unwrap_err();
        assert_eq!(err.category(), Some(ErrorCategory::Transport));
    }

    #[tokio::test]
    async fn test_health_check_unreachable_is_false() {
        let base = closed_port().await;
        let client = OllamaClient::new(&config_for(&base)).unwrap();
        assert!(!client.health_check().await.unwrap());
    }

    #[tokio::test]
    async fn test_health_check_finds_model() {
        let (base, _request) = serve_once(200, r#"{"models":[{"name":"llama3:latest"}]}"#).await;
        let client = OllamaClient::new(&config_for(&base)).unwrap();
        assert!(client.health_check().await.unwrap());
    }
}
