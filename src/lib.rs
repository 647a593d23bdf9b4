//! TinyTales - Illustrated Story Generation
//!
//! Turns a short prompt into a multi-scene illustrated story. Every request
//! yields a complete result: when the text backend fails or returns
//! unusable output a deterministic fallback story is used, and when every
//! image provider fails a local renderer draws the scene.
//!
//! ## Quick Start
//!
//! ```ignore
//! use tinytales::{CapabilityRegistry, ConfigLoader, InvocationContext, Services};
//!
//! let services = Services::from_config(ConfigLoader::load()?)?;
//! let registry = CapabilityRegistry::builtin(services);
//! let story = registry
//!     .invoke(
//!         "generate_story",
//!         serde_json::json!({"username": "ana", "prompt": "a brave kite"}),
//!         &InvocationContext::new(),
//!     )
//!     .await?;
//! ```
//!
//! ## Modules
//!
//! - [`ai`]: text backends, timeouts, structured response extraction
//! - [`image`]: image provider cascade and local renderer
//! - [`story`]: prompting, fallback content, narrative assembly
//! - [`capability`]: compile-time capability registry
//! - [`config`]: layered configuration

pub mod ai;
pub mod capability;
pub mod cli;
pub mod config;
pub mod constants;
pub mod image;
pub mod story;
pub mod types;

#[cfg(test)]
mod test_support;

// =============================================================================
// Core Re-exports
// =============================================================================

pub use config::{Config, ConfigLoader};
pub use types::error::{ErrorCategory, Result, TaleError};
pub use types::{GenerationRequest, ImagePayload, Narrative, Scene};

// =============================================================================
// Pipeline Re-exports
// =============================================================================

pub use ai::{
    SharedTextClient, StructuredResponseExtractor, TextGenerator, TimeoutConfig,
    create_text_client, with_timeout,
};
pub use capability::{
    Capability, CapabilityInfo, CapabilityRegistry, InvocationContext, Services,
};
pub use crate::image::{ImageBackend, ImageSynthesizer, LocalRenderer};
pub use story::{FallbackNarrativeBuilder, NarrativeAssembler};
