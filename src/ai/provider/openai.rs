//! OpenAI Chat Completions Client
//!
//! Hosted text backend. Returns the first choice's message content.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::{TextGenerator, base_string, normalize_base};
use crate::ai::timeout::with_timeout;
use crate::config::LlmConfig;
use crate::constants::{llm, network};
use crate::types::{ErrorClassifier, ProviderError, Result, TaleError};

const PROVIDER: &str = "openai";
const SYSTEM_PROMPT: &str =
    "You are a creative storyteller. When asked for a structured story, respond with JSON only.";

/// OpenAI client with secure API key handling
pub struct OpenAiClient {
    /// Never exposed in logs or debug output
    api_key: SecretString,
    api_base: String,
    model: String,
    temperature: f32,
    max_tokens: usize,
    timeout: Duration,
    client: reqwest::Client,
}

impl std::fmt::Debug for OpenAiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiClient")
            .field("api_key", &"[REDACTED]")
            .field("api_base", &self.api_base)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

impl OpenAiClient {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                TaleError::Config(
                    "OpenAI API key not found. Set OPENAI_API_KEY env var or provide in config"
                        .to_string(),
                )
            })?;

        let api_base = normalize_base(
            config.api_base.as_deref().unwrap_or(llm::OPENAI_API_BASE),
            "OpenAI",
        )?;
        let model = config
            .model
            .clone()
            .unwrap_or_else(|| llm::OPENAI_MODEL.to_string());
        let timeout = Duration::from_secs(config.timeout_secs);

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TaleError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            api_key: SecretString::from(api_key),
            api_base: base_string(&api_base),
            model,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            timeout,
            client,
        })
    }

    fn build_request<'a>(&'a self, prompt: &'a str) -> ChatCompletionRequest<'a> {
        ChatCompletionRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }

    async fn send(&self, prompt: &str) -> Result<String> {
        let url = format!("{}/chat/completions", self.api_base);

        let response = self
            .client
            .post(&url)
            .bearer_auth(self.api_key.expose_secret())
            .json(&self.build_request(prompt))
            .send()
            .await
            .map_err(|e| ErrorClassifier::from_reqwest(&e, PROVIDER))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ErrorClassifier::from_status(status.as_u16(), &body, PROVIDER).into());
        }

        let body: ChatCompletionResponse = response.json().await.map_err(|e| {
            ProviderError::malformed(PROVIDER, format!("Failed to parse response: {}", e))
        })?;

        body.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| ProviderError::malformed(PROVIDER, "No content in response").into())
    }
}

#[async_trait]
impl TextGenerator for OpenAiClient {
    async fn invoke(&self, prompt: &str) -> Result<String> {
        info!(
            "Generating with OpenAI (model: {}, temperature: {})",
            self.model, self.temperature
        );
        let start = Instant::now();

        let text = with_timeout(self.timeout, self.send(prompt), "openai chat completion").await?;

        debug!(
            elapsed_ms = start.elapsed().as_millis() as u64,
            chars = text.len(),
            "Received response from OpenAI"
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
        let url = format!("{}/models", self.api_base);
        let probe = async {
            self.client
                .get(&url)
                .bearer_auth(self.api_key.expose_secret())
                .send()
                .await
                .map_err(|e| TaleError::from(ErrorClassifier::from_reqwest(&e, PROVIDER)))
        };

        match with_timeout(
            Duration::from_secs(network::HEALTH_TIMEOUT_SECS),
            probe,
            "openai health",
        )
        .await
        {
            Ok(resp) if resp.status().is_success() => {
                info!("OpenAI API is available");
                Ok(true)
            }
            Ok(resp) => {
                warn!("OpenAI API check failed: {}", resp.status());
                Ok(false)
            }
            Err(e) => {
                warn!("OpenAI API check failed: {}", e);
                Ok(false)
            }
        }
    }
}

// Request/Response types

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: usize,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{request_body, serve_once};
    use crate::types::ErrorCategory;

    fn config_for(base: &str) -> LlmConfig {
        LlmConfig {
            backend: "openai".to_string(),
            api_base: Some(base.to_string()),
            api_key: Some("sk-test".to_string()),
            timeout_secs: 2,
            ..Default::default()
        }
    }

    #[test]
    fn test_debug_redacts_key() {
        let client = OpenAiClient::new(&config_for("https://api.openai.com/v1")).unwrap();
        let debug = format!("{:?}", client);
        assert!(!debug.contains("sk-test"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[tokio::test]
    async fn test_invoke_reads_first_choice() {
        let (base, request) = serve_once(
            200,
            r#"{"choices":[{"message":{"role":"assistant","content":"{\"title\":\"T\"}"}}]}"#,
        )
        .await;
        let client = OpenAiClient::new(&config_for(&base)).unwrap();

        let text = client.invoke("write").await.unwrap();
        assert_eq!(text, r#"{"title":"T"}"#);

        let raw = request.await.unwrap();
        assert!(raw.starts_with("POST /chat/completions"));
        assert!(raw.to_lowercase().contains("authorization: bearer sk-test"));
        let body = request_body(&raw);
        assert_eq!(body["messages"][1]["content"], "write");
    }

    #[tokio::test]
    async fn test_invoke_without_choices_is_malformed() {
        let (base, _request) = serve_once(200, r#"{"choices":[]}"#).await;
        let client = OpenAiClient::new(&config_for(&base)).unwrap();

        match client.invoke("x").await {
            Err(TaleError::Provider(e)) => assert_eq!(e.category, ErrorCategory::MalformedPayload),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_invoke_unauthorized() {
        let (base, _request) = serve_once(401, r#"{"error":{"message":"bad key"}}"#).await;
        let client = OpenAiClient::new(&config_for(&base)).unwrap();

        match client.invoke("x").await {
            Err(TaleError::Provider(e)) => assert_eq!(e.status, Some(401)),
            other => panic!("unexpected: {:?}", other),
        }
    }
}
