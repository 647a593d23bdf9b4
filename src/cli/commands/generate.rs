//! Generate Command
//!
//! Runs `generate_story` for a single request.
//!
//! Usage:
//!   tinytales generate --prompt "a lost kite" --user ana [--scenes 3] [--format yaml]
//!   tinytales generate ... --output story.json --images-dir ./scenes

use std::path::{Path, PathBuf};

use crate::capability::{Capability, GenerateStory, InvocationContext, StoryOutput};
use crate::cli::ui::Output;
use crate::cli::util::CommandContext;
use crate::types::{
    GenerationRequest, Narrative, Result, TaleError, ValidationError, ValidationErrorKind,
};

pub struct GenerateOptions {
    pub prompt: String,
    pub user: String,
    pub genre: Option<String>,
    pub audience: Option<String>,
    pub scenes: Option<usize>,
    pub format: String,
    pub output: Option<PathBuf>,
    pub images_dir: Option<PathBuf>,
}

pub async fn run(options: GenerateOptions) -> Result<()> {
    let out = Output::new();
    // Reject a bad format before spending a generation call on it
    let format = OutputFormat::parse(&options.format)?;

    let ctx = CommandContext::load()?;
    let defaults = &ctx.config.story;
    let request = GenerationRequest::new(options.user, options.prompt)
        .with_genre(options.genre.unwrap_or_else(|| defaults.default_genre.clone()))
        .with_audience(
            options
                .audience
                .unwrap_or_else(|| defaults.default_audience.clone()),
        )
        .with_scene_count(options.scenes.unwrap_or(defaults.default_scene_count));

    let invocation = InvocationContext::new();
    let value = ctx
        .registry
        .invoke(
            GenerateStory::NAME,
            serde_json::to_value(&request)?,
            &invocation,
        )
        .await?;
    let result: StoryOutput = serde_json::from_value(value)?;

    if let Some(dir) = &options.images_dir {
        let written = write_images(&result.story, dir)?;
        out.success(&format!(
            "Wrote {} images to {}",
            written.len(),
            dir.display()
        ));
    }

    let rendered = format.render(&result)?;
    match &options.output {
        Some(path) => {
            std::fs::write(path, rendered)?;
            out.success(&format!(
                "Story \"{}\" saved to {}",
                result.story.title,
                path.display()
            ));
        }
        None => println!("{}", rendered),
    }

    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Yaml,
}

impl OutputFormat {
    pub fn parse(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "yaml" | "yml" => Ok(Self::Yaml),
            other => Err(TaleError::InvalidInput(
                ValidationError::new(ValidationErrorKind::Format, "unsupported output format")
                    .with_field("format")
                    .with_comparison("json or yaml", other),
            )),
        }
    }

    pub fn render(self, output: &StoryOutput) -> Result<String> {
        match self {
            Self::Json => Ok(serde_json::to_string_pretty(output)?),
            Self::Yaml => Ok(serde_yaml::to_string(output)?),
        }
    }
}

/// Decode every scene image into `dir` as `scene_NN.<ext>`
pub fn write_images(narrative: &Narrative, dir: &Path) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)?;

    let mut written = Vec::with_capacity(narrative.scenes.len());
    for scene in &narrative.scenes {
        let bytes = scene.image.decode()?;
        let path = dir.join(format!(
            "scene_{:02}.{}",
            scene.scene_number,
            extension_for(&scene.image.mime)
        ));
        std::fs::write(&path, bytes)?;
        written.push(path);
    }
    Ok(written)
}

fn extension_for(mime: &str) -> &'static str {
    match mime {
        "image/jpeg" | "image/jpg" => "jpg",
        "image/webp" => "webp",
        "image/gif" => "gif",
        _ => "png",
    }
}
