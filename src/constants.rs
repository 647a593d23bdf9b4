//! Global Constants
//!
//! Centralized constants for configuration and tuning.
//! All magic numbers should be defined here with documentation.

/// Network constants
pub mod network {
    /// Default text-generation request timeout (seconds)
    pub const TEXT_TIMEOUT_SECS: u64 = 120;

    /// Default per-call image provider timeout (seconds)
    pub const IMAGE_TIMEOUT_SECS: u64 = 60;

    /// Timeout for health probes (seconds)
    pub const HEALTH_TIMEOUT_SECS: u64 = 10;
}

/// Text backend defaults
pub mod llm {
    pub const OLLAMA_API_BASE: &str = "http://localhost:11434";
    pub const OLLAMA_MODEL: &str = "llama3";

    pub const OPENAI_API_BASE: &str = "https://api.openai.com/v1";
    pub const OPENAI_MODEL: &str = "gpt-4o-mini";

    pub const DEFAULT_TEMPERATURE: f32 = 0.7;
    pub const DEFAULT_MAX_TOKENS: usize = 2048;
}

/// Image backend defaults
pub mod image {
    pub const OPENAI_IMAGES_URL: &str = "https://api.openai.com/v1/images/generations";
    pub const OPENAI_IMAGE_MODEL: &str = "dall-e-3";

    pub const STABILITY_URL: &str =
        "https://api.stability.ai/v1/generation/stable-diffusion-xl-1024-v1-0/text-to-image";
    pub const STABILITY_CFG_SCALE: u32 = 7;
    pub const STABILITY_STEPS: u32 = 30;

    /// Edge length requested from hosted providers (pixels)
    pub const REMOTE_SIZE: u32 = 1024;

    /// Edge length of locally rendered images (pixels)
    pub const RENDER_SIZE: u32 = 512;

    /// Characters per line when laying out words on a rendered image
    pub const RENDER_WRAP_CHARS: usize = 30;

    /// Maximum scenes illustrated concurrently
    pub const DEFAULT_CONCURRENCY: usize = 4;
}

/// Story defaults and limits
pub mod story {
    pub const DEFAULT_GENRE: &str = "fantasy";
    pub const DEFAULT_AUDIENCE: &str = "children";
    pub const DEFAULT_SCENE_COUNT: usize = 5;

    /// Upper bound on scenes per request
    pub const MAX_SCENES: usize = 20;

    /// Style tag used when neither a theme nor a genre is available
    pub const FALLBACK_STYLE: &str = "digital art";
}

/// Text processing capability limits
pub mod text {
    pub const MAX_INPUT_CHARS: usize = 10_000;
    pub const MIN_OUTPUT_WORDS: usize = 10;
    pub const MAX_OUTPUT_WORDS: usize = 1000;
    pub const DEFAULT_OUTPUT_WORDS: usize = 100;
}
