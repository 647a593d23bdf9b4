//! Image Synthesis
//!
//! [`ImageSynthesizer`] walks an ordered list of [`ImageBackend`]s and returns
//! the first usable payload. Any failure (error, timeout, empty or
//! undecodable payload) demotes to the next tier. The final tier is the
//! [`LocalRenderer`], which cannot fail, so `synthesize` is infallible.
//!
//! Hosted backends are only included when their credential is configured.

mod dalle;
mod render;
mod stability;

pub use dalle::DalleBackend;
pub use render::{LocalRenderer, PLACEHOLDER_PNG_BASE64};
pub use stability::StabilityBackend;

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::ai::timeout::with_timeout;
use crate::config::ImageConfig;
use crate::types::{ImagePayload, Result};

/// Name reported for the local rendering tier
pub const LOCAL_TIER: &str = "local";

pub type SharedImageBackend = Arc<dyn ImageBackend>;

/// One network image provider
#[async_trait]
pub trait ImageBackend: Send + Sync {
    fn name(&self) -> &str;

    async fn generate(&self, description: &str, style: &str) -> Result<ImagePayload>;
}

/// Prompt sent to hosted providers
pub fn decorate_prompt(description: &str, style: &str) -> String {
    format!("{}, {} style, high quality, detailed", description, style)
}

pub struct ImageSynthesizer {
    backends: Vec<SharedImageBackend>,
    timeout: Duration,
    renderer: LocalRenderer,
}

impl ImageSynthesizer {
    /// Local rendering only
    pub fn local(renderer: LocalRenderer) -> Self {
        Self {
            backends: Vec::new(),
            timeout: Duration::from_secs(crate::constants::network::IMAGE_TIMEOUT_SECS),
            renderer,
        }
    }

    /// Build the cascade from configuration: OpenAI Images, then Stability,
    /// each only when a key is available
    pub fn from_config(config: &ImageConfig) -> Result<Self> {
        let mut synthesizer = Self::local(LocalRenderer::new(config.render_size))
            .with_timeout(Duration::from_secs(config.timeout_secs));

        if let Some(key) = config.resolved_openai_key() {
            synthesizer = synthesizer.with_backend(Arc::new(DalleBackend::new(
                key,
                config.openai_model.clone(),
                config.size,
            )?));
        }
        if let Some(key) = config.resolved_stability_key() {
            synthesizer =
                synthesizer.with_backend(Arc::new(StabilityBackend::new(key, config.size)?));
        }

        debug!(tiers = ?synthesizer.tiers(), "Image cascade configured");
        Ok(synthesizer)
    }

    /// Append a backend after the existing ones
    pub fn with_backend(mut self, backend: SharedImageBackend) -> Self {
        self.backends.push(backend);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Tier names in cascade order, ending with the local renderer
    pub fn tiers(&self) -> Vec<String> {
        self.backends
            .iter()
            .map(|b| b.name().to_string())
            .chain(std::iter::once(LOCAL_TIER.to_string()))
            .collect()
    }

    /// Produce an image for `description`. Never fails.
    pub async fn synthesize(&self, description: &str, style: &str) -> ImagePayload {
        for backend in &self.backends {
            let name = backend.name();
            match with_timeout(self.timeout, backend.generate(description, style), name).await {
                Ok(payload) if is_usable(&payload) => {
                    debug!(provider = %name, "Image generated");
                    return payload;
                }
                Ok(_) => {
                    warn!(provider = %name, "Image provider returned an unusable payload");
                }
                Err(e) => {
                    let category = e
                        .category()
                        .map(|c| c.to_string())
                        .unwrap_or_else(|| "OTHER".to_string());
                    warn!(provider = %name, category = %category, error = %e, "Image provider failed");
                }
            }
        }

        self.renderer.render(description, style)
    }
}

fn is_usable(payload: &ImagePayload) -> bool {
    !payload.is_empty() && payload.decode().is_ok_and(|bytes| !bytes.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{MockImageBackend, MockImageBehavior};

    fn renderer() -> LocalRenderer {
        LocalRenderer::new(64)
    }

    #[tokio::test]
    async fn test_first_success_wins() {
        let a = Arc::new(MockImageBackend::new("a", MockImageBehavior::Succeed("QUFB")));
        let b = Arc::new(MockImageBackend::new("b", MockImageBehavior::Succeed("QkJC")));
        let synth = ImageSynthesizer::local(renderer())
            .with_backend(a.clone())
            .with_backend(b.clone());

        let payload = synth.synthesize("x", "y").await;
        assert_eq!(payload.data, "QUFB");
        assert_eq!(a.call_count(), 1);
        assert_eq!(b.call_count(), 0);
    }

    #[tokio::test]
    async fn test_failure_demotes_to_next_tier() {
        let a = Arc::new(MockImageBackend::new("a", MockImageBehavior::Fail));
        let b = Arc::new(MockImageBackend::new("b", MockImageBehavior::Succeed("QkJC")));
        let synth = ImageSynthesizer::local(renderer())
            .with_backend(a.clone())
            .with_backend(b.clone());

        assert_eq!(synth.synthesize("x", "y").await.data, "QkJC");
        assert_eq!(a.call_count(), 1);
        assert_eq!(b.call_count(), 1);
    }

    #[tokio::test]
    async fn test_empty_payload_demotes() {
        let a = Arc::new(MockImageBackend::new("a", MockImageBehavior::Empty));
        let b = Arc::new(MockImageBackend::new("b", MockImageBehavior::Succeed("not base64!!")));
        let synth = ImageSynthesizer::local(renderer())
            .with_backend(a)
            .with_backend(b);

        let payload = synth.synthesize("x", "y").await;
        assert_eq!(payload, renderer().render("x", "y"));
    }

    #[tokio::test]
    async fn test_timeout_demotes() {
        let slow = Arc::new(MockImageBackend::new("slow", MockImageBehavior::Hang));
        let synth = ImageSynthesizer::local(renderer())
            .with_backend(slow)
            .with_timeout(Duration::from_millis(20));

        let payload = synth.synthesize("x", "y").await;
        assert!(!payload.is_empty());
        assert_eq!(payload, renderer().render("x", "y"));
    }

    #[tokio::test]
    async fn test_no_providers_renders_locally() {
        let synth = ImageSynthesizer::local(renderer());
        let payload = synth.synthesize("a quiet forest", "pastel").await;
        assert!(!payload.is_empty());
        assert!(payload.decode().is_ok());
        assert_eq!(synth.tiers(), vec![LOCAL_TIER.to_string()]);
    }

    #[test]
    fn test_from_config_includes_only_keyed_backends() {
        let config = ImageConfig {
            openai_api_key: Some("sk".into()),
            stability_api_key: Some("st".into()),
            ..Default::default()
        };
        let synth = ImageSynthesizer::from_config(&config).unwrap();
        assert_eq!(synth.tiers(), vec!["dalle", "stability", LOCAL_TIER]);
    }

    #[test]
    fn test_decorate_prompt() {
        assert_eq!(
            decorate_prompt("a cat", "anime"),
            "a cat, anime style, high quality, detailed"
        );
    }
}
