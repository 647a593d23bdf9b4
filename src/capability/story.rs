use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;

use super::{Capability, InvocationContext, Services, Validate};
use crate::story::NarrativeAssembler;
use crate::types::{GenerationRequest, Narrative, Result, ValidationError};

/// The scene ceiling is configurable, so it is enforced in `execute`
impl Validate for GenerationRequest {
    fn validate(&self) -> std::result::Result<(), ValidationError> {
        self.check_fields()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoryMetadata {
    pub request_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub user: String,
    pub genre: String,
    pub age_group: String,
    pub scene_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoryOutput {
    pub story: Narrative,
    pub metadata: StoryMetadata,
}

/// Illustrated story generation
pub struct GenerateStory {
    services: Services,
}

impl GenerateStory {
    pub fn new(services: Services) -> Self {
        Self { services }
    }

    fn assembler(&self) -> NarrativeAssembler {
        let config = &self.services.config;
        NarrativeAssembler::new(self.services.text.clone(), self.services.images.clone())
            .with_text_timeout(std::time::Duration::from_secs(config.llm.timeout_secs))
            .with_concurrency(config.image.concurrency)
    }
}

#[async_trait]
impl Capability for GenerateStory {
    type Input = GenerationRequest;
    type Output = StoryOutput;

    const NAME: &'static str = "generate_story";
    const DESCRIPTION: &'static str =
        "Generate an illustrated multi-scene story from a prompt, genre and audience";

    #[instrument(skip_all, fields(request_id = %ctx.request_id, user = %input.requester))]
    async fn execute(&self, input: GenerationRequest, ctx: &InvocationContext) -> Result<StoryOutput> {
        input.check(self.services.config.story.max_scene_count)?;

        let story = self.assembler().assemble(&input).await?;
        info!(scenes = story.scenes.len(), "Story generated");

        Ok(StoryOutput {
            story,
            metadata: StoryMetadata {
                request_id: ctx.request_id,
                generated_at: Utc::now(),
                user: input.requester,
                genre: input.genre,
                age_group: input.audience,
                scene_count: input.scene_count,
            },
        })
    }
}
