use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use super::{Capability, InvocationContext, Services, Validate};
use crate::ai::timeout::with_timeout;
use crate::constants::text as limits;
use crate::types::{Result, ValidationError};

const SUMMARIZE_PROMPT: &str = r#"You are a precise assistant that writes concise summaries.
Keep the key facts and drop everything else.

Summarize the following text in at most {max_length} words:

{text}"#;

const ANALYZE_PROMPT: &str = r#"You are an analyst who explains what a text is doing.
Describe its main argument, tone and intended audience.

Analyze the following text in at most {max_length} words:

{text}"#;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PromptKind {
    #[default]
    Summarize,
    Analyze,
}

impl PromptKind {
    fn template(self) -> &'static str {
        match self {
            PromptKind::Summarize => SUMMARIZE_PROMPT,
            PromptKind::Analyze => ANALYZE_PROMPT,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProcessTextInput {
    pub text: String,
    #[serde(default = "default_max_length")]
    pub max_length: usize,
    #[serde(default)]
    pub prompt_type: PromptKind,
}

fn default_max_length() -> usize {
    limits::DEFAULT_OUTPUT_WORDS
}

impl Validate for ProcessTextInput {
    fn validate(&self) -> std::result::Result<(), ValidationError> {
        let chars = self.text.chars().count();
        if chars == 0 {
            return Err(ValidationError::missing("text"));
        }
        if chars > limits::MAX_INPUT_CHARS {
            return Err(ValidationError::range(
                "text",
                format!("at most {} characters", limits::MAX_INPUT_CHARS),
                chars,
            ));
        }
        if !(limits::MIN_OUTPUT_WORDS..=limits::MAX_OUTPUT_WORDS).contains(&self.max_length) {
            return Err(ValidationError::range(
                "max_length",
                format!("{}..={}", limits::MIN_OUTPUT_WORDS, limits::MAX_OUTPUT_WORDS),
                self.max_length,
            ));
        }
        Ok(())
    }
}

/// Lengths are in characters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessTextOutput {
    pub processed_text: String,
    pub original_length: usize,
    pub processed_length: usize,
}

/// Summarize or analyze free text with the configured text backend.
/// Backend failures propagate to the caller.
pub struct ProcessText {
    services: Services,
}

impl ProcessText {
    pub fn new(services: Services) -> Self {
        Self { services }
    }
}

pub fn build_text_prompt(input: &ProcessTextInput) -> String {
    input
        .prompt_type
        .template()
        .replace("{max_length}", &input.max_length.to_string())
        .replace("{text}", &input.text)
}

#[async_trait]
impl Capability for ProcessText {
    type Input = ProcessTextInput;
    type Output = ProcessTextOutput;

    const NAME: &'static str = "process_text";
    const DESCRIPTION: &'static str = "Summarize or analyze text using the text backend";

    #[instrument(skip_all, fields(request_id = %ctx.request_id, kind = ?input.prompt_type))]
    async fn execute(&self, input: ProcessTextInput, ctx: &InvocationContext) -> Result<ProcessTextOutput> {
        let prompt = build_text_prompt(&input);
        let timeout = std::time::Duration::from_secs(self.services.config.llm.timeout_secs);

        let processed = with_timeout(timeout, self.services.text.invoke(&prompt), "text processing")
            .await?
            .trim()
            .to_string();
        debug!(chars = processed.chars().count(), "Text processed");

        Ok(ProcessTextOutput {
            original_length: input.text.chars().count(),
            processed_length: processed.chars().count(),
            processed_text: processed,
        })
    }
}
