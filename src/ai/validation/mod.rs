//! Response Validation
//!
//! Coercion of raw generator text into structured drafts.

mod extractor;
pub mod json_repair;

pub use extractor::{ExtractionPath, StructuredResponseExtractor};
