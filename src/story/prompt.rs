//! Story generation prompt.

use crate::types::GenerationRequest;

const STORY_PROMPT: &str = r#"You are a creative storyteller who creates engaging picture stories for {audience}.

Create a {genre} story based on the following prompt: "{prompt}"

Requirements:
- Create exactly {scene_count} scenes
- Each scene should be engaging and visually descriptive
- The story should have a clear beginning, middle, and end
- Make it appropriate for {audience}

Respond with a single JSON object and nothing else, in this format:
{
    "title": "Story title",
    "theme": "One or two words describing the visual style",
    "scenes": [
        {
            "scene_number": 1,
            "story_text": "Detailed scene description",
            "image_prompt": "Visual prompt for image generation"
        }
    ]
}

The image_prompt should describe the setting, characters, actions and lighting
with vibrant colors, suitable for an illustrated storybook."#;

/// Render the generation prompt for a request
pub fn build_story_prompt(request: &GenerationRequest) -> String {
    STORY_PROMPT
        .replace("{audience}", &request.audience)
        .replace("{genre}", &request.genre)
        .replace("{prompt}", request.prompt.trim())
        .replace("{scene_count}", &request.scene_count.to_string())
}
