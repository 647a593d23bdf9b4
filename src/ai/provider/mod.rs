//! Text Generation Providers
//!
//! Defines the [`TextGenerator`] trait: one prompt in, raw text out.
//! The backend is chosen once from configuration and shared for the
//! lifetime of the process.
//!
//! Every failure mode (transport, timeout, non-success status, unexpected
//! body) surfaces as `TaleError::Provider` or `TaleError::Timeout`. Clients
//! never retry internally.

mod ollama;
mod openai;

pub use ollama::OllamaClient;
pub use openai::OpenAiClient;

use async_trait::async_trait;
use std::sync::Arc;

use crate::config::{LlmConfig, TextBackend};
use crate::types::Result;

/// Shared text client for concurrent access across invocations.
pub type SharedTextClient = Arc<dyn TextGenerator>;

// =============================================================================
// Text Generator Trait
// =============================================================================

#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Send one prompt and return the generated text verbatim
    async fn invoke(&self, prompt: &str) -> Result<String>;

    /// Provider name for logging
    fn name(&self) -> &str;

    /// Model name currently in use
    fn model(&self) -> &str;

    /// Check if the backend is reachable without generating
    async fn health_check(&self) -> Result<bool>;
}

/// Create the configured text client
pub fn create_text_client(config: &LlmConfig) -> Result<SharedTextClient> {
    match config.backend.parse::<TextBackend>()? {
        TextBackend::Ollama => Ok(Arc::new(OllamaClient::new(config)?)),
        TextBackend::OpenAi => Ok(Arc::new(OpenAiClient::new(config)?)),
    }
}

/// Trim a trailing slash and validate the scheme of a configured base URL
pub(crate) fn normalize_base(endpoint: &str, provider: &str) -> Result<url::Url> {
    let url = url::Url::parse(endpoint).map_err(|e| {
        crate::types::TaleError::Config(format!(
            "Invalid {} endpoint URL '{}': {}",
            provider, endpoint, e
        ))
    })?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(crate::types::TaleError::Config(format!(
            "{} endpoint must use http or https scheme, got: {}",
            provider,
            url.scheme()
        )));
    }

    Ok(url)
}

pub(crate) fn base_string(url: &url::Url) -> String {
    let mut result = url.to_string();
    if result.ends_with('/') {
        result.pop();
    }
    result
}
