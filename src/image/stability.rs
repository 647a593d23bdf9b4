//! Stability AI Backend

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use super::{ImageBackend, decorate_prompt};
use crate::constants::image as image_constants;
use crate::types::{ErrorClassifier, ImagePayload, ProviderError, Result, TaleError};

const PROVIDER: &str = "stability";

pub struct StabilityBackend {
    api_key: SecretString,
    endpoint: String,
    size: u32,
    client: reqwest::Client,
}

impl std::fmt::Debug for StabilityBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StabilityBackend")
            .field("api_key", &"[REDACTED]")
            .field("endpoint", &self.endpoint)
            .field("size", &self.size)
            .finish()
    }
}

impl StabilityBackend {
    pub fn new(api_key: impl Into<String>, size: u32) -> Result<Self> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| TaleError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            api_key: SecretString::from(api_key.into()),
            endpoint: image_constants::STABILITY_URL.to_string(),
            size,
            client,
        })
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[async_trait]
impl ImageBackend for StabilityBackend {
    fn name(&self) -> &str {
        PROVIDER
    }

    async fn generate(&self, description: &str, style: &str) -> Result<ImagePayload> {
        let request = StabilityRequest {
            text_prompts: vec![TextPrompt {
                text: decorate_prompt(description, style),
                weight: 1.0,
            }],
            cfg_scale: image_constants::STABILITY_CFG_SCALE,
            height: self.size,
            width: self.size,
            samples: 1,
            steps: image_constants::STABILITY_STEPS,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(self.api_key.expose_secret())
            .header("Accept", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| ErrorClassifier::from_reqwest(&e, PROVIDER))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ErrorClassifier::from_status(status.as_u16(), &body, PROVIDER).into());
        }

        let body: StabilityResponse = response.json().await.map_err(|e| {
            ProviderError::malformed(PROVIDER, format!("Failed to parse response: {}", e))
        })?;

        body.artifacts
            .into_iter()
            .next()
            .map(|a| a.base64)
            .filter(|b| !b.trim().is_empty())
            .map(ImagePayload::png)
            .ok_or_else(|| ProviderError::malformed(PROVIDER, "No artifacts in response").into())
    }
}

#[derive(Debug, Serialize)]
struct StabilityRequest {
    text_prompts: Vec<TextPrompt>,
    cfg_scale: u32,
    height: u32,
    width: u32,
    samples: u32,
    steps: u32,
}

#[derive(Debug, Serialize)]
struct TextPrompt {
    text: String,
    weight: f32,
}

#[derive(Debug, Deserialize)]
struct StabilityResponse {
    #[serde(default)]
    artifacts: Vec<Artifact>,
}

#[derive(Debug, Deserialize)]
struct Artifact {
    #[serde(default)]
    base64: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{request_body, serve_once};
    use crate::types::ErrorCategory;

    #[tokio::test]
    async fn test_generate_reads_first_artifact() {
        let (base, request) = serve_once(
            200,
            r#"{"artifacts":[{"base64":"WFla","seed":1,"finishReason":"SUCCESS"}]}"#,
        )
        .await;
        let backend = StabilityBackend::new("st-key", 1024)
            .unwrap()
            .with_endpoint(base);

        let payload = backend.generate("a lighthouse", "oil painting").await.unwrap();
        assert_eq!(payload.data, "WFla");

        let raw = request.await.unwrap();
        assert!(raw.to_lowercase().contains("authorization: bearer st-key"));
        let body = request_body(&raw);
        assert_eq!(
            body["text_prompts"][0]["text"],
            "a lighthouse, oil painting style, high quality, detailed"
        );
        assert_eq!(body["steps"], 30);
        assert_eq!(body["cfg_scale"], 7);
        assert_eq!(body["width"], 1024);
    }

    #[tokio::test]
    async fn test_generate_status_error() {
        let (base, _request) = serve_once(402, r#"{"message":"insufficient balance"}"#).await;
        let backend = StabilityBackend::new("k", 1024).unwrap().with_endpoint(base);

        match backend.generate("x", "y").await {
            Err(TaleError::Provider(e)) => {
                assert_eq!(e.category, ErrorCategory::UpstreamStatus);
                assert_eq!(e.status, Some(402));
            }
            other => panic!("unexpected: {:?}", other),
        }
    }
}
