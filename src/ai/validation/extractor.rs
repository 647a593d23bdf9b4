//! Structured Response Extraction
//!
//! Turns raw generator text into a [`StoryDraft`]:
//!
//! 1. Strict decode of the whole text
//! 2. Strict decode of the outer `{ ... }` span (drops surrounding prose)
//! 3. One pass of the repair grammar over that span, then one more decode
//!
//! Anything still undecodable is an [`TaleError::Extraction`]. Partial
//! results are never returned.

use tracing::{debug, warn};

use super::json_repair::{outer_object_span, preprocess, repair};
use crate::types::{Result, StoryDraft, TaleError};

/// How the draft was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionPath {
    Direct,
    Span,
    Repaired,
}

/// Stateless extractor; see module docs for the decode sequence
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuredResponseExtractor;

impl StructuredResponseExtractor {
    pub fn new() -> Self {
        Self
    }

    pub fn extract(&self, raw: &str) -> Result<StoryDraft> {
        self.extract_with_path(raw).map(|(draft, _)| draft)
    }

    pub fn extract_with_path(&self, raw: &str) -> Result<(StoryDraft, ExtractionPath)> {
        let cleaned = preprocess(raw);

        if let Ok(draft) = decode(cleaned) {
            return Ok((draft, ExtractionPath::Direct));
        }

        let span = outer_object_span(cleaned).ok_or_else(|| {
            TaleError::Extraction(format!(
                "no JSON object found. Content preview: {}...",
                preview(cleaned)
            ))
        })?;

        match decode(span) {
            Ok(draft) => {
                debug!("Extracted JSON object from surrounding text");
                return Ok((draft, ExtractionPath::Span));
            }
            Err(e) => debug!(error = %e, "Span decode failed, attempting repair"),
        }

        let repaired = repair(span);
        match decode(&repaired) {
            Ok(draft) => {
                warn!("Generator output needed JSON repair");
                Ok((draft, ExtractionPath::Repaired))
            }
            Err(e) => Err(TaleError::Extraction(format!(
                "{}. Content preview: {}...",
                e,
                preview(cleaned)
            ))),
        }
    }
}

fn decode(s: &str) -> std::result::Result<StoryDraft, serde_json::Error> {
    let mut draft: StoryDraft = serde_json::from_str(s)?;
    order_scenes(&mut draft);
    Ok(draft)
}

/// Declared ordinals first, ascending; undeclared after, in array order.
/// Stable, so equal ordinals keep their relative order.
fn order_scenes(draft: &mut StoryDraft) {
    draft
        .scenes
        .sort_by_key(|scene| (scene.ordinal.is_none(), scene.ordinal));
}

fn preview(s: &str) -> String {
    s.chars().take(200).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn extract(raw: &str) -> Result<StoryDraft> {
        StructuredResponseExtractor::new().extract(raw)
    }

    #[test]
    fn test_direct_decode() {
        let (draft, path) = StructuredResponseExtractor::new()
            .extract_with_path(r#"{"title":"Moon","scenes":[{"id":1,"description":"a"}]}"#)
            .unwrap();
        assert_eq!(path, ExtractionPath::Direct);
        assert_eq!(draft.title.as_deref(), Some("Moon"));
        assert_eq!(draft.scenes[0].text, "a");
    }

    #[test]
    fn test_prose_wrapped_json() {
        let raw = "Sure! Here is your story:\n```json\n{\"title\":\"T\",\"scenes\":[{\"scene_number\":1,\"story_text\":\"x\"}]}\n```\nEnjoy!";
        let (draft, path) = StructuredResponseExtractor::new()
            .extract_with_path(raw)
            .unwrap();
        assert_eq!(path, ExtractionPath::Span);
        assert_eq!(draft.scenes.len(), 1);
        assert_eq!(draft.scenes[0].ordinal, Some(1));
    }

    #[test]
    fn test_missing_separator_between_scenes() {
        let raw = r#"{"scenes":[{"id":1,"description":"a"}{"id":2,"description":"b"}]}"#;
        let (draft, path) = StructuredResponseExtractor::new()
            .extract_with_path(raw)
            .unwrap();
        assert_eq!(path, ExtractionPath::Repaired);
        let ordinals: Vec<_> = draft.scenes.iter().map(|s| s.ordinal).collect();
        assert_eq!(ordinals, vec![Some(1), Some(2)]);
        assert_eq!(draft.scenes[1].text, "b");
    }

    #[test]
    fn test_trailing_commas_and_dangling_brace() {
        let raw = r#"{"title":"T","scenes":[{"id":1,"description":"a",},{"id":2,"description":"b"}}],}"#;
        let draft = extract(raw).unwrap();
        assert_eq!(draft.scenes.len(), 2);
    }

    #[test]
    fn test_unrecoverable_is_extraction_error() {
        assert!(matches!(
            extract("I could not write a story today."),
            Err(TaleError::Extraction(_))
        ));
        assert!(matches!(
            extract(r#"{"title": "T", "scenes": [{"id": 1, "description": "#),
            Err(TaleError::Extraction(_))
        ));
        assert!(matches!(extract(""), Err(TaleError::Extraction(_))));
    }

    #[test]
    fn test_missing_scenes_is_extraction_error() {
        assert!(matches!(
            extract(r#"{"title":"no scenes here"}"#),
            Err(TaleError::Extraction(_))
        ));
    }

    #[test]
    fn test_scenes_ordered_by_ordinal() {
        let raw = r#"{"scenes":[{"id":3,"text":"c"},{"text":"x"},{"id":1,"text":"a"},{"id":"2","text":"b"}]}"#;
        let draft = extract(raw).unwrap();
        let texts: Vec<_> = draft.scenes.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(texts, vec!["a", "b", "c", "x"]);
    }

    #[test]
    fn test_extraction_is_idempotent() {
        let raw = r#"noise {"title":"T","scenes":[{"id":2,"text":"b"},{"id":1,"text":"a"}]} noise"#;
        let first = extract(raw).unwrap();
        let reencoded = serde_json::to_string(&first).unwrap();
        let second = extract(&reencoded).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_scene_with_several_field_spellings_decodes_directly() {
        let raw = r#"{"title":"T","scenes":[{"scene_number":1,"id":1,"story_text":"a","description":"a long desc"}]}"#;
        let (draft, path) = StructuredResponseExtractor::new()
            .extract_with_path(raw)
            .unwrap();
        assert_eq!(path, ExtractionPath::Direct);
        assert_eq!(draft.scenes.len(), 1);
        assert_eq!(draft.scenes[0].ordinal, Some(1));
        assert_eq!(draft.scenes[0].text, "a");
    }

    #[test]
    fn test_null_scene_text_keeps_the_draft() {
        let raw = r#"{"scenes":[{"scene_number":1,"story_text":"a"},{"scene_number":2,"story_text":null}]}"#;
        let draft = extract(raw).unwrap();
        assert_eq!(draft.scenes.len(), 2);
        assert_eq!(draft.scenes[0].text, "a");
        assert_eq!(draft.scenes[1].text, "");
    }

    #[test]
    fn test_repair_leaves_string_contents_alone() {
        let draft = extract(r#"{"scenes":[{"id":1,"text":"wait, }"},]}"#).unwrap();
        assert_eq!(draft.scenes.len(), 1);
        assert_eq!(draft.scenes[0].text, "wait, }");

        let draft =
            extract(r#"{"scenes":[{"id":1,"text":"x}}]"},{"id":2,"text":"b"}}]}"#).unwrap();
        assert_eq!(draft.scenes.len(), 2);
        assert_eq!(draft.scenes[0].text, "x}}]");
        assert_eq!(draft.scenes[1].text, "b");
    }

    proptest! {
        #[test]
        fn prop_order_independent(
            texts in proptest::collection::vec("[a-z ]{1,12}", 1..8),
            seed in any::<u64>(),
        ) {
            let scenes: Vec<serde_json::Value> = texts
                .iter()
                .enumerate()
                .map(|(i, t)| serde_json::json!({"id": i + 1, "description": t}))
                .collect();

            let mut shuffled = scenes.clone();
            let len = shuffled.len();
            let mut state = seed;
            for i in (1..len).rev() {
                state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
                shuffled.swap(i, (state >> 33) as usize % (i + 1));
            }

            let a = extract(&serde_json::json!({"scenes": scenes}).to_string()).unwrap();
            let b = extract(&serde_json::json!({"scenes": shuffled}).to_string()).unwrap();
            prop_assert_eq!(a, b);
        }

        #[test]
        fn prop_never_panics(raw in ".{0,400}") {
            let _ = extract(&raw);
        }

        #[test]
        fn prop_prose_wrapping_is_transparent(
            prefix in "[A-Za-z .!]{0,40}",
            suffix in "[A-Za-z .!]{0,40}",
            n in 1usize..6,
        ) {
            let scenes: Vec<serde_json::Value> = (1..=n)
                .map(|i| serde_json::json!({"scene_number": i, "story_text": format!("s{}", i)}))
                .collect();
            let body = serde_json::json!({"title": "T", "scenes": scenes}).to_string();
            let wrapped = format!("{}{}{}", prefix, body, suffix);

            let draft = extract(&wrapped).unwrap();
            prop_assert_eq!(draft.scenes.len(), n);
            prop_assert_eq!(draft, extract(&body).unwrap());
        }
    }
}
