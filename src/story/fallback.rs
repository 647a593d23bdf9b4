//! Deterministic story content used when the generator cannot be trusted.
//!
//! Two fixed sources live here: the fallback narrative (parameterized by the
//! request prompt) and the generic scene library used to pad short stories.

use crate::types::{DraftScene, GenerationRequest, StoryDraft};

/// Builds a complete draft without calling any backend
pub struct FallbackNarrativeBuilder;

impl FallbackNarrativeBuilder {
    /// Exactly `request.scene_count` scenes, ordinals 1..=N
    pub fn build(request: &GenerationRequest) -> StoryDraft {
        let prompt = request.prompt.trim();
        let scenes = (1..=request.scene_count)
            .map(|ordinal| DraftScene {
                ordinal: Some(ordinal),
                text: fallback_scene_text(prompt, ordinal),
                image_prompt: Some(image_hint(prompt, ordinal, &request.genre)),
                image: None,
            })
            .collect();

        StoryDraft {
            title: Some(fallback_title(prompt)),
            theme: Some(request.genre.clone()),
            target_age: Some(request.audience.clone()),
            scenes,
        }
    }
}

pub fn fallback_title(prompt: &str) -> String {
    format!("Adventure of {}", prompt.trim())
}

/// Templated scene text for the fallback narrative
pub fn fallback_scene_text(prompt: &str, ordinal: usize) -> String {
    match ordinal {
        1 => format!("The beginning of {}", prompt),
        2 => format!("The adventure continues with {}", prompt),
        3 => format!("A challenge appears in {}", prompt),
        4 => format!("Overcoming obstacles in {}", prompt),
        5 => format!("The happy ending of {}", prompt),
        n => format!("Chapter {} of {}", n, prompt),
    }
}

/// Generic text used to pad or repair generated stories
pub fn library_scene_text(ordinal: usize) -> String {
    match ordinal {
        1 => "The beginning of our adventure".to_string(),
        2 => "The journey begins".to_string(),
        3 => "A challenge appears".to_string(),
        4 => "Overcoming obstacles".to_string(),
        5 => "The happy ending".to_string(),
        n => format!("Scene {} of the story", n),
    }
}

fn scene_keywords(ordinal: usize) -> &'static str {
    match ordinal {
        1 => "beginning, colorful, detailed",
        2 => "journey, adventure, vibrant",
        3 => "challenge, dramatic, intense",
        4 => "victory, triumph, bright",
        5 => "ending, happy, peaceful",
        _ => "scene, colorful, detailed",
    }
}

/// Image prompt hint for scenes the generator did not describe
pub fn image_hint(prompt: &str, ordinal: usize, genre: &str) -> String {
    format!(
        "{} - scene {}, {}, {} style, colorful, detailed",
        prompt.trim(),
        ordinal,
        scene_keywords(ordinal),
        genre
    )
}
