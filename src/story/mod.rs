//! Story Pipeline
//!
//! Prompting, fallback content and the [`NarrativeAssembler`] that ties the
//! text client, extractor and image cascade together.

mod assembler;
mod fallback;
mod prompt;

pub use assembler::{DraftSource, NarrativeAssembler, reconcile, select_style, validate};
pub use fallback::{
    FallbackNarrativeBuilder, fallback_scene_text, fallback_title, image_hint, library_scene_text,
};
pub use prompt::build_story_prompt;
