//! Narrative Assembly
//!
//! Orchestrates one generation request:
//!
//! ```text
//! prompt ─▶ text client ─▶ extractor ─┐
//!    │ failure        │ failure        ├─▶ reconcile ─▶ illustrate ─▶ validate
//!    └────────────────┴─▶ fallback ────┘
//! ```
//!
//! Upstream failures never reach the caller. The only error `assemble`
//! can return is [`TaleError::InvariantViolation`], which indicates a bug.

use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};

use super::fallback::{FallbackNarrativeBuilder, fallback_title, image_hint, library_scene_text};
use super::prompt::build_story_prompt;
use crate::ai::provider::SharedTextClient;
use crate::ai::timeout::with_timeout;
use crate::ai::validation::StructuredResponseExtractor;
use crate::constants::{image as image_constants, network, story};
use crate::image::ImageSynthesizer;
use crate::types::{
    DraftScene, GenerationRequest, Narrative, Result, Scene, StoryDraft, TaleError,
};

/// Where the scene text came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DraftSource {
    Generated,
    Fallback,
}

pub struct NarrativeAssembler {
    text: SharedTextClient,
    images: Arc<ImageSynthesizer>,
    extractor: StructuredResponseExtractor,
    text_timeout: Duration,
    concurrency: usize,
}

impl NarrativeAssembler {
    pub fn new(text: SharedTextClient, images: Arc<ImageSynthesizer>) -> Self {
        Self {
            text,
            images,
            extractor: StructuredResponseExtractor::new(),
            text_timeout: Duration::from_secs(network::TEXT_TIMEOUT_SECS),
            concurrency: image_constants::DEFAULT_CONCURRENCY,
        }
    }

    pub fn with_text_timeout(mut self, timeout: Duration) -> Self {
        self.text_timeout = timeout;
        self
    }

    /// Maximum scenes illustrated at once
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub async fn assemble(&self, request: &GenerationRequest) -> Result<Narrative> {
        self.assemble_with_source(request)
            .await
            .map(|(narrative, _)| narrative)
    }

    #[instrument(skip_all, fields(requester = %request.requester, scenes = request.scene_count))]
    pub async fn assemble_with_source(
        &self,
        request: &GenerationRequest,
    ) -> Result<(Narrative, DraftSource)> {
        let (draft, source) = self.draft(request).await;
        let draft = reconcile(draft, request);

        let theme = non_blank(draft.theme.as_deref()).map(str::to_string);
        let style = select_style(theme.as_deref(), &request.genre);
        let scenes = self.illustrate(draft.scenes, &style).await;

        let narrative = Narrative {
            title: non_blank(draft.title.as_deref())
                .map(str::to_string)
                .unwrap_or_else(|| fallback_title(&request.prompt)),
            theme: theme.unwrap_or_else(|| style.clone()),
            target_age: non_blank(draft.target_age.as_deref())
                .unwrap_or(&request.audience)
                .to_string(),
            scenes,
        };

        if let Err(e) = validate(&narrative, request.scene_count) {
            error!(error = %e, "Assembled narrative failed validation");
            return Err(e);
        }

        info!(source = ?source, title = %narrative.title, "Narrative assembled");
        Ok((narrative, source))
    }

    /// Generated draft, or the fallback draft if generation or extraction fails
    async fn draft(&self, request: &GenerationRequest) -> (StoryDraft, DraftSource) {
        let prompt = build_story_prompt(request);
        let provider = self.text.name();

        let raw = match with_timeout(
            self.text_timeout,
            self.text.invoke(&prompt),
            "text generation",
        )
        .await
        {
            Ok(raw) => raw,
            Err(e) => {
                warn!(
                    provider = %provider,
                    category = ?e.category(),
                    error = %e,
                    "Text generation failed, using fallback narrative"
                );
                return (FallbackNarrativeBuilder::build(request), DraftSource::Fallback);
            }
        };

        match self.extractor.extract(&raw) {
            Ok(draft) => {
                debug!(scenes = draft.scenes.len(), "Extracted story draft");
                (draft, DraftSource::Generated)
            }
            Err(e) => {
                warn!(provider = %provider, error = %e, "Extraction failed, using fallback narrative");
                (FallbackNarrativeBuilder::build(request), DraftSource::Fallback)
            }
        }
    }

    /// Fan out image synthesis across scenes, fan in by ordinal
    async fn illustrate(&self, scenes: Vec<DraftScene>, style: &str) -> Vec<Scene> {
        let mut illustrated: Vec<Scene> = futures::stream::iter(scenes.into_iter().enumerate())
            .map(|(index, draft)| {
                let images = Arc::clone(&self.images);
                async move {
                    let scene_number = draft.ordinal.unwrap_or(index + 1);
                    let image = match draft.usable_image() {
                        Some(existing) => existing,
                        None => images.synthesize(&draft.text, style).await,
                    };
                    Scene {
                        scene_number,
                        story_text: draft.text,
                        image_prompt: draft.image_prompt,
                        image,
                    }
                }
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        illustrated.sort_by_key(|scene| scene.scene_number);
        illustrated
    }
}

/// Force exactly `scene_count` scenes with ordinals 1..=N and non-blank text.
///
/// Short drafts are padded from the generic library, long drafts truncated
/// in order. Missing image hints are filled from the request.
pub fn reconcile(mut draft: StoryDraft, request: &GenerationRequest) -> StoryDraft {
    let count = request.scene_count;
    if draft.scenes.len() > count {
        debug!(
            extracted = draft.scenes.len(),
            requested = count,
            "Truncating surplus scenes"
        );
        draft.scenes.truncate(count);
    }
    if draft.scenes.len() < count {
        debug!(
            extracted = draft.scenes.len(),
            requested = count,
            "Padding with library scenes"
        );
    }
    while draft.scenes.len() < count {
        let ordinal = draft.scenes.len() + 1;
        draft
            .scenes
            .push(DraftScene::new(ordinal, library_scene_text(ordinal)));
    }

    for (index, scene) in draft.scenes.iter_mut().enumerate() {
        let ordinal = index + 1;
        scene.ordinal = Some(ordinal);
        if scene.text.trim().is_empty() {
            scene.text = library_scene_text(ordinal);
        }
        if scene
            .image_prompt
            .as_deref()
            .is_none_or(|p| p.trim().is_empty())
        {
            scene.image_prompt = Some(image_hint(&request.prompt, ordinal, &request.genre));
        }
    }

    draft
}

/// Theme, else genre, else the fixed default
pub fn select_style(theme: Option<&str>, genre: &str) -> String {
    non_blank(theme)
        .or_else(|| non_blank(Some(genre)))
        .unwrap_or(story::FALLBACK_STYLE)
        .to_string()
}

/// Shape guarantees every returned narrative must satisfy
pub fn validate(narrative: &Narrative, scene_count: usize) -> Result<()> {
    if narrative.scenes.len() != scene_count {
        return Err(TaleError::InvariantViolation(format!(
            "expected {} scenes, assembled {}",
            scene_count,
            narrative.scenes.len()
        )));
    }

    for (index, scene) in narrative.scenes.iter().enumerate() {
        if scene.scene_number != index + 1 {
            return Err(TaleError::InvariantViolation(format!(
                "scene at position {} has ordinal {}",
                index + 1,
                scene.scene_number
            )));
        }
        if scene.story_text.trim().is_empty() {
            return Err(TaleError::InvariantViolation(format!(
                "scene {} has empty text",
                scene.scene_number
            )));
        }
        if scene.image.is_empty() {
            return Err(TaleError::InvariantViolation(format!(
                "scene {} has no image",
                scene.scene_number
            )));
        }
    }

    Ok(())
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
