//! AI Integration Layer
//!
//! Text generation clients, response extraction and timeouts.

pub mod provider;
pub mod timeout;
pub mod validation;

pub use provider::{OllamaClient, OpenAiClient, SharedTextClient, TextGenerator, create_text_client};
pub use timeout::{TimeoutConfig, with_timeout};
pub use validation::{ExtractionPath, StructuredResponseExtractor};
