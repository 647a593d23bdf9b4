//! OpenAI Images Backend

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use super::{ImageBackend, decorate_prompt};
use crate::constants::image as image_constants;
use crate::types::{ErrorClassifier, ImagePayload, ProviderError, Result, TaleError};

const PROVIDER: &str = "dalle";

pub struct DalleBackend {
    api_key: SecretString,
    endpoint: String,
    model: String,
    size: u32,
    client: reqwest::Client,
}

impl std::fmt::Debug for DalleBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DalleBackend")
            .field("api_key", &"[REDACTED]")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("size", &self.size)
            .finish()
    }
}

impl DalleBackend {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>, size: u32) -> Result<Self> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| TaleError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            api_key: SecretString::from(api_key.into()),
            endpoint: image_constants::OPENAI_IMAGES_URL.to_string(),
            model: model.into(),
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
impl ImageBackend for DalleBackend {
    fn name(&self) -> &str {
        PROVIDER
    }

    async fn generate(&self, description: &str, style: &str) -> Result<ImagePayload> {
        let size = format!("{}x{}", self.size, self.size);
        let request = DalleRequest {
            model: &self.model,
            prompt: decorate_prompt(description, style),
            n: 1,
            size: &size,
            response_format: "b64_json",
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(self.api_key.expose_secret())
            .json(&request)
            .send()
            .await
            .map_err(|e| ErrorClassifier::from_reqwest(&e, PROVIDER))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ErrorClassifier::from_status(status.as_u16(), &body, PROVIDER).into());
        }

        let body: DalleResponse = response.json().await.map_err(|e| {
            ProviderError::malformed(PROVIDER, format!("Failed to parse response: {}", e))
        })?;

        body.data
            .into_iter()
            .next()
            .and_then(|d| d.b64_json)
            .filter(|b| !b.trim().is_empty())
            .map(ImagePayload::png)
            .ok_or_else(|| ProviderError::malformed(PROVIDER, "No b64_json in response").into())
    }
}

#[derive(Debug, Serialize)]
struct DalleRequest<'a> {
    model: &'a str,
    prompt: String,
    n: u32,
    size: &'a str,
    response_format: &'a str,
}

#[derive(Debug, Deserialize)]
struct DalleResponse {
    #[serde(default)]
    data: Vec<DalleImage>,
}

#[derive(Debug, Deserialize)]
struct DalleImage {
    b64_json: Option<String>,
}
