//! Configuration Types
//!
//! All configuration structures with sensible defaults.
//! Credentials are never serialized; they are read from config files or
//! fall back to the conventional provider environment variables.

use serde::{Deserialize, Serialize};

use crate::constants::{image, llm, network, story};
use crate::types::{Result, TaleError};

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Configuration version
    pub version: String,

    /// Text generation backend
    pub llm: LlmConfig,

    /// Image provider cascade
    pub image: ImageConfig,

    /// Story request defaults and limits
    pub story: StoryConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            llm: LlmConfig::default(),
            image: ImageConfig::default(),
            story: StoryConfig::default(),
        }
    }
}

impl Config {
    /// Validate configuration values are within acceptable ranges.
    /// Returns `TaleError::Config` on validation failure.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(TaleError::Config(format!(
                "LLM temperature must be between 0.0 and 2.0, got {}",
                self.llm.temperature
            )));
        }

        if self.llm.timeout_secs == 0 {
            return Err(TaleError::Config(
                "LLM timeout_secs must be greater than 0".to_string(),
            ));
        }

        if self.image.timeout_secs == 0 {
            return Err(TaleError::Config(
                "Image timeout_secs must be greater than 0".to_string(),
            ));
        }

        if self.image.concurrency == 0 {
            return Err(TaleError::Config(
                "Image concurrency must be greater than 0".to_string(),
            ));
        }

        if self.image.render_size < 64 {
            return Err(TaleError::Config(format!(
                "Image render_size must be at least 64, got {}",
                self.image.render_size
            )));
        }

        if self.story.max_scene_count == 0 {
            return Err(TaleError::Config(
                "Story max_scene_count must be greater than 0".to_string(),
            ));
        }

        if self.story.default_scene_count == 0
            || self.story.default_scene_count > self.story.max_scene_count
        {
            return Err(TaleError::Config(format!(
                "Story default_scene_count must be in 1..={}, got {}",
                self.story.max_scene_count, self.story.default_scene_count
            )));
        }

        // Parse to surface unknown backends at load time
        self.llm.backend.parse::<TextBackend>()?;

        Ok(())
    }
}

// =============================================================================
// LLM Configuration
// =============================================================================

/// Supported text-generation backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextBackend {
    #[default]
    Ollama,
    OpenAi,
}

impl std::fmt::Display for TextBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TextBackend::Ollama => write!(f, "ollama"),
            TextBackend::OpenAi => write!(f, "openai"),
        }
    }
}

impl std::str::FromStr for TextBackend {
    type Err = TaleError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "ollama" => Ok(TextBackend::Ollama),
            "openai" => Ok(TextBackend::OpenAi),
            _ => Err(TaleError::Config(format!(
                "Unknown text backend: {}. Supported: ollama, openai",
                s
            ))),
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Backend name: "ollama" or "openai"
    pub backend: String,

    /// Model name (backend default when unset)
    pub model: Option<String>,

    /// API base URL (backend default when unset)
    pub api_base: Option<String>,

    /// API key for hosted backends. Never serialized.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// Temperature for generation (0.0 = deterministic, 1.0 = creative)
    pub temperature: f32,

    /// Maximum tokens to generate (hosted backends only)
    pub max_tokens: usize,
}

impl std::fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmConfig")
            .field("backend", &self.backend)
            .field("model", &self.model)
            .field("api_base", &self.api_base)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("timeout_secs", &self.timeout_secs)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            backend: TextBackend::Ollama.to_string(),
            model: None,
            api_base: None,
            api_key: None,
            timeout_secs: network::TEXT_TIMEOUT_SECS,
            temperature: llm::DEFAULT_TEMPERATURE,
            max_tokens: llm::DEFAULT_MAX_TOKENS,
        }
    }
}

// =============================================================================
// Image Configuration
// =============================================================================

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageConfig {
    /// OpenAI Images credential. Falls back to OPENAI_API_KEY.
    #[serde(skip_serializing)]
    pub openai_api_key: Option<String>,

    /// Stability AI credential. Falls back to STABILITY_API_KEY.
    #[serde(skip_serializing)]
    pub stability_api_key: Option<String>,

    /// OpenAI image model
    pub openai_model: String,

    /// Edge length requested from hosted providers
    pub size: u32,

    /// Per-call timeout in seconds
    pub timeout_secs: u64,

    /// Maximum scenes illustrated at once
    pub concurrency: usize,

    /// Edge length of locally rendered images
    pub render_size: u32,
}

impl std::fmt::Debug for ImageConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageConfig")
            .field(
                "openai_api_key",
                &self.openai_api_key.as_ref().map(|_| "[REDACTED]"),
            )
            .field(
                "stability_api_key",
                &self.stability_api_key.as_ref().map(|_| "[REDACTED]"),
            )
            .field("openai_model", &self.openai_model)
            .field("size", &self.size)
            .field("timeout_secs", &self.timeout_secs)
            .field("concurrency", &self.concurrency)
            .field("render_size", &self.render_size)
            .finish()
    }
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            openai_api_key: None,
            stability_api_key: None,
            openai_model: image::OPENAI_IMAGE_MODEL.to_string(),
            size: image::REMOTE_SIZE,
            timeout_secs: network::IMAGE_TIMEOUT_SECS,
            concurrency: image::DEFAULT_CONCURRENCY,
            render_size: image::RENDER_SIZE,
        }
    }
}

impl ImageConfig {
    /// Effective OpenAI Images key (config, then environment)
    pub fn resolved_openai_key(&self) -> Option<String> {
        non_blank(self.openai_api_key.clone())
            .or_else(|| non_blank(std::env::var("OPENAI_API_KEY").ok()))
    }

    /// Effective Stability AI key (config, then environment)
    pub fn resolved_stability_key(&self) -> Option<String> {
        non_blank(self.stability_api_key.clone())
            .or_else(|| non_blank(std::env::var("STABILITY_API_KEY").ok()))
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

// =============================================================================
// Story Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoryConfig {
    pub default_genre: String,
    pub default_audience: String,
    pub default_scene_count: usize,
    /// Requests above this are rejected
    pub max_scene_count: usize,
}

impl Default for StoryConfig {
    fn default() -> Self {
        Self {
            default_genre: story::DEFAULT_GENRE.to_string(),
            default_audience: story::DEFAULT_AUDIENCE.to_string(),
            default_scene_count: story::DEFAULT_SCENE_COUNT,
            max_scene_count: story::MAX_SCENES,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
