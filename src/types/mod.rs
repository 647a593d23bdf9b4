pub mod error;
pub mod story;

pub use error::{
    ErrorCategory, ErrorClassifier, ProviderError, Result, TaleError, ValidationError,
    ValidationErrorKind,
};
pub use story::{DraftScene, GenerationRequest, ImagePayload, Narrative, Scene, StoryDraft};
