//! Story Domain Types
//!
//! Request, draft and final narrative shapes. Drafts are the tolerant
//! intermediate form decoded from generator output; [`Narrative`] is the
//! validated result handed back to callers.

use base64::{Engine, engine::general_purpose::STANDARD};
use serde::{Deserialize, Deserializer, Serialize};

use super::error::{Result, TaleError, ValidationError};
use crate::constants::story as defaults;

// =============================================================================
// Request
// =============================================================================

/// Inbound generation request, immutable once accepted
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GenerationRequest {
    #[serde(alias = "username")]
    pub requester: String,
    pub prompt: String,
    #[serde(default = "default_genre")]
    pub genre: String,
    #[serde(alias = "age_group", default = "default_audience")]
    pub audience: String,
    #[serde(default = "default_scene_count")]
    pub scene_count: usize,
}

fn default_genre() -> String {
    defaults::DEFAULT_GENRE.to_string()
}

fn default_audience() -> String {
    defaults::DEFAULT_AUDIENCE.to_string()
}

fn default_scene_count() -> usize {
    defaults::DEFAULT_SCENE_COUNT
}

impl GenerationRequest {
    pub fn new(requester: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            requester: requester.into(),
            prompt: prompt.into(),
            genre: default_genre(),
            audience: default_audience(),
            scene_count: default_scene_count(),
        }
    }

    pub fn with_genre(mut self, genre: impl Into<String>) -> Self {
        self.genre = genre.into();
        self
    }

    pub fn with_audience(mut self, audience: impl Into<String>) -> Self {
        self.audience = audience.into();
        self
    }

    pub fn with_scene_count(mut self, scene_count: usize) -> Self {
        self.scene_count = scene_count;
        self
    }

    /// Checks that hold regardless of configuration
    pub fn check_fields(&self) -> std::result::Result<(), ValidationError> {
        if self.requester.trim().is_empty() {
            return Err(ValidationError::missing("requester"));
        }
        if self.prompt.trim().is_empty() {
            return Err(ValidationError::missing("prompt"));
        }
        if self.scene_count == 0 {
            return Err(ValidationError::range("scene_count", "at least 1", 0));
        }
        Ok(())
    }

    /// Reject requests the pipeline cannot honor
    pub fn check(&self, max_scenes: usize) -> std::result::Result<(), ValidationError> {
        self.check_fields()?;
        if self.scene_count > max_scenes {
            return Err(ValidationError::range(
                "scene_count",
                format!("1..={}", max_scenes),
                self.scene_count,
            ));
        }
        Ok(())
    }
}

// =============================================================================
// Image Payload
// =============================================================================

/// Encoded image, serialized as a `data:<mime>;base64,<payload>` URI
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ImagePayload {
    pub mime: String,
    /// Base64-encoded bytes
    pub data: String,
}

impl ImagePayload {
    pub fn png(data: impl Into<String>) -> Self {
        Self {
            mime: "image/png".to_string(),
            data: data.into(),
        }
    }

    /// Encode raw PNG bytes
    pub fn from_png_bytes(bytes: &[u8]) -> Self {
        Self::png(STANDARD.encode(bytes))
    }

    /// Parse a base64 data URI. Returns `None` for anything else, including
    /// URIs with an empty payload.
    pub fn from_data_uri(uri: &str) -> Option<Self> {
        let rest = uri.trim().strip_prefix("data:")?;
        let (mime, data) = rest.split_once(";base64,")?;
        if mime.is_empty() || data.is_empty() {
            return None;
        }
        Some(Self {
            mime: mime.to_string(),
            data: data.to_string(),
        })
    }

    pub fn to_data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime, self.data)
    }

    pub fn is_empty(&self) -> bool {
        self.data.trim().is_empty()
    }

    /// Decode the payload back into raw bytes
    pub fn decode(&self) -> Result<Vec<u8>> {
        STANDARD
            .decode(self.data.trim())
            .map_err(|e| TaleError::InvariantViolation(format!("invalid base64 payload: {}", e)))
    }
}

impl TryFrom<String> for ImagePayload {
    type Error = String;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        Self::from_data_uri(&value).ok_or_else(|| "expected a base64 data URI".to_string())
    }
}

impl From<ImagePayload> for String {
    fn from(payload: ImagePayload) -> Self {
        payload.to_data_uri()
    }
}

// =============================================================================
// Narrative
// =============================================================================

/// One illustrated scene of a finished narrative
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    /// 1-based, contiguous
    pub scene_number: usize,
    pub story_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_prompt: Option<String>,
    pub image: ImagePayload,
}

/// Validated, fully illustrated story
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Narrative {
    pub title: String,
    pub theme: String,
    pub target_age: String,
    pub scenes: Vec<Scene>,
}

// =============================================================================
// Draft
// =============================================================================

/// Story as produced by the generator or the fallback builder, before
/// reconciliation and illustration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoryDraft {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub theme: Option<String>,
    #[serde(default, alias = "targetAge")]
    pub target_age: Option<String>,
    pub scenes: Vec<DraftScene>,
}

/// One generated scene.
///
/// Generators name the same field several ways and sometimes emit more than
/// one spelling per scene, so decoding goes through `RawScene` and takes
/// the first usable value in priority order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawScene")]
pub struct DraftScene {
    /// Declared ordinal, if the generator supplied a usable one
    #[serde(rename = "id")]
    pub ordinal: Option<usize>,
    pub text: String,
    pub image_prompt: Option<String>,
    pub image: Option<String>,
}

/// Every accepted spelling as its own field
#[derive(Deserialize)]
struct RawScene {
    #[serde(default, deserialize_with = "lenient_ordinal")]
    scene_number: Option<usize>,
    #[serde(default, deserialize_with = "lenient_ordinal")]
    id: Option<usize>,
    #[serde(default, deserialize_with = "lenient_ordinal")]
    number: Option<usize>,

    #[serde(default, deserialize_with = "lenient_text")]
    story_text: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    text: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    description: Option<String>,

    #[serde(default, deserialize_with = "lenient_text")]
    image_prompt: Option<String>,
    #[serde(default, rename = "imagePrompt", deserialize_with = "lenient_text")]
    image_prompt_camel: Option<String>,

    #[serde(default, deserialize_with = "lenient_text")]
    image: Option<String>,
    #[serde(default, rename = "imageUrl", deserialize_with = "lenient_text")]
    image_url: Option<String>,
}

impl From<RawScene> for DraftScene {
    fn from(raw: RawScene) -> Self {
        Self {
            ordinal: raw.scene_number.or(raw.id).or(raw.number),
            text: first_non_blank([raw.story_text, raw.text, raw.description]).unwrap_or_default(),
            image_prompt: first_non_blank([raw.image_prompt, raw.image_prompt_camel]),
            image: first_non_blank([raw.image, raw.image_url]),
        }
    }
}

fn first_non_blank<const N: usize>(candidates: [Option<String>; N]) -> Option<String> {
    candidates
        .into_iter()
        .flatten()
        .find(|value| !value.trim().is_empty())
}

impl DraftScene {
    pub fn new(ordinal: usize, text: impl Into<String>) -> Self {
        Self {
            ordinal: Some(ordinal),
            text: text.into(),
            image_prompt: None,
            image: None,
        }
    }

    /// A pre-existing image that can be kept as-is
    pub fn usable_image(&self) -> Option<ImagePayload> {
        self.image
            .as_deref()
            .and_then(ImagePayload::from_data_uri)
            .filter(|p| !p.is_empty())
    }
}

/// Accepts `3`, `3.0` or `"3"`; anything else is treated as absent
fn lenient_ordinal<'de, D>(deserializer: D) -> std::result::Result<Option<usize>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0 && f.fract() == 0.0).map(|f| f as u64))
            .map(|n| n as usize),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

/// Strings pass through, numbers and booleans are stringified, anything
/// else (including `null`) is treated as absent
fn lenient_text<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::String(s) => Some(s),
        serde_json::Value::Number(n) => Some(n.to_string()),
        serde_json::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_defaults_and_aliases() {
        let req: GenerationRequest =
            serde_json::from_str(r#"{"username":"ana","prompt":"a dragon","age_group":"teens"}"#)
                .unwrap();
        assert_eq!(req.requester, "ana");
        assert_eq!(req.audience, "teens");
        assert_eq!(req.genre, "fantasy");
        assert_eq!(req.scene_count, 5);
    }

    #[test]
    fn test_request_check() {
        let req = GenerationRequest::new("ana", "a dragon");
        assert!(req.check(20).is_ok());
        assert!(req.clone().with_scene_count(0).check(20).is_err());
        assert!(req.clone().with_scene_count(21).check(20).is_err());
        assert!(GenerationRequest::new("ana", "   ").check(20).is_err());
        assert!(GenerationRequest::new("", "x").check(20).is_err());

        let large = req.with_scene_count(25);
        assert!(large.check_fields().is_ok());
        assert!(large.check(30).is_ok());
        assert!(large.clone().with_scene_count(0).check_fields().is_err());
    }

    #[test]
    fn test_data_uri_roundtrip() {
        let payload = ImagePayload::png("aGVsbG8=");
        let uri = payload.to_data_uri();
        assert_eq!(uri, "data:image/png;base64,aGVsbG8=");
        assert_eq!(ImagePayload::from_data_uri(&uri), Some(payload.clone()));
        assert_eq!(payload.decode().unwrap(), b"hello");
    }

    #[test]
    fn test_data_uri_rejects_other_forms() {
        assert!(ImagePayload::from_data_uri("https://example.com/a.png").is_none());
        assert!(ImagePayload::from_data_uri("data:image/png;base64,").is_none());
        assert!(ImagePayload::from_data_uri("").is_none());
    }

    #[test]
    fn test_scene_serializes_image_as_uri() {
        let scene = Scene {
            scene_number: 1,
            story_text: "once".into(),
            image_prompt: None,
            image: ImagePayload::png("QQ=="),
        };
        let json = serde_json::to_value(&scene).unwrap();
        assert_eq!(json["image"], "data:image/png;base64,QQ==");
        assert!(json.get("image_prompt").is_none());
    }

    #[test]
    fn test_draft_scene_aliases() {
        let a: DraftScene =
            serde_json::from_str(r#"{"scene_number":2,"story_text":"x","image_prompt":"p"}"#)
                .unwrap();
        let b: DraftScene =
            serde_json::from_str(r#"{"id":"2","description":"x","imagePrompt":"p"}"#).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.ordinal, Some(2));

        let c: DraftScene = serde_json::from_str(r#"{"number":3.0,"text":"y"}"#).unwrap();
        assert_eq!(c.ordinal, Some(3));

        let d: DraftScene = serde_json::from_str(r#"{"id":"first","text":"y"}"#).unwrap();
        assert_eq!(d.ordinal, None);
    }

    #[test]
    fn test_draft_scene_duplicate_spellings_use_priority() {
        let scene: DraftScene = serde_json::from_str(
            r#"{"id":7,"scene_number":1,"text":"","description":"long","story_text":"short",
                "imagePrompt":"camel","image_prompt":"snake","imageUrl":"u"}"#,
        )
        .unwrap();
        assert_eq!(scene.ordinal, Some(1));
        assert_eq!(scene.text, "short");
        assert_eq!(scene.image_prompt.as_deref(), Some("snake"));
        assert_eq!(scene.image.as_deref(), Some("u"));

        let blank_first: DraftScene =
            serde_json::from_str(r#"{"story_text":"  ","text":"kept"}"#).unwrap();
        assert_eq!(blank_first.text, "kept");
    }

    #[test]
    fn test_draft_scene_null_and_numeric_text() {
        let scene: DraftScene =
            serde_json::from_str(r#"{"scene_number":2,"story_text":null,"image":null}"#).unwrap();
        assert_eq!(scene.text, "");
        assert!(scene.image.is_none());

        let numeric: DraftScene = serde_json::from_str(r#"{"text":42}"#).unwrap();
        assert_eq!(numeric.text, "42");
    }

    #[test]
    fn test_usable_image() {
        let mut scene = DraftScene::new(1, "x");
        assert!(scene.usable_image().is_none());
        scene.image = Some("http://example.com/x.png".into());
        assert!(scene.usable_image().is_none());
        scene.image = Some("data:image/png;base64,QQ==".into());
        assert!(scene.usable_image().is_some());
    }
}
