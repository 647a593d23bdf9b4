//! Capability Registry
//!
//! Capabilities are statically known implementations of [`Capability`],
//! registered by name when the process starts. Callers dispatch through
//! [`CapabilityRegistry::invoke`] with JSON in and JSON out.
//!
//! Input decoding and [`Validate`] failures are the only errors a caller
//! sees before a capability runs; both surface as
//! [`TaleError::InvalidInput`].

mod process_text;
mod story;

pub use process_text::{ProcessText, ProcessTextInput, ProcessTextOutput, PromptKind};
pub use story::{GenerateStory, StoryMetadata, StoryOutput};

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::ai::provider::SharedTextClient;
use crate::config::Config;
use crate::image::ImageSynthesizer;
use crate::types::{Result, TaleError, ValidationError, ValidationErrorKind};

/// Input-level checks run after decoding and before execution
pub trait Validate {
    fn validate(&self) -> std::result::Result<(), ValidationError>;
}

/// Per-invocation context. The token is carried through untouched.
#[derive(Debug, Clone)]
pub struct InvocationContext {
    pub request_id: Uuid,
    pub token: Option<Value>,
}

impl InvocationContext {
    pub fn new() -> Self {
        Self {
            request_id: Uuid::new_v4(),
            token: None,
        }
    }

    pub fn with_token(mut self, token: Value) -> Self {
        self.token = Some(token);
        self
    }
}

impl Default for InvocationContext {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
pub trait Capability: Send + Sync {
    type Input: DeserializeOwned + Validate + Send;
    type Output: Serialize + Send;

    const NAME: &'static str;
    const DESCRIPTION: &'static str;

    async fn execute(&self, input: Self::Input, ctx: &InvocationContext) -> Result<Self::Output>;
}

/// Object-safe view of a [`Capability`]
#[async_trait]
pub trait DynCapability: Send + Sync {
    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str;

    async fn invoke(&self, input: Value, ctx: &InvocationContext) -> Result<Value>;
}

#[async_trait]
impl<C: Capability> DynCapability for C {
    fn name(&self) -> &'static str {
        C::NAME
    }

    fn description(&self) -> &'static str {
        C::DESCRIPTION
    }

    async fn invoke(&self, input: Value, ctx: &InvocationContext) -> Result<Value> {
        let input: C::Input = serde_json::from_value(input).map_err(|e| {
            TaleError::InvalidInput(ValidationError::new(ValidationErrorKind::Schema, e.to_string()))
        })?;
        input.validate()?;

        let output = self.execute(input, ctx).await?;
        Ok(serde_json::to_value(output)?)
    }
}

/// Listing entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CapabilityInfo {
    pub name: String,
    pub description: String,
}

/// Dependencies shared by the built-in capabilities
#[derive(Clone)]
pub struct Services {
    pub text: SharedTextClient,
    pub images: Arc<ImageSynthesizer>,
    pub config: Arc<Config>,
}

impl Services {
    /// Build the configured text client and image cascade
    pub fn from_config(config: Config) -> Result<Self> {
        let text = crate::ai::provider::create_text_client(&config.llm)?;
        let images = ImageSynthesizer::from_config(&config.image)?;
        Ok(Self {
            text,
            images: Arc::new(images),
            config: Arc::new(config),
        })
    }
}

#[derive(Default)]
pub struct CapabilityRegistry {
    capabilities: BTreeMap<&'static str, Arc<dyn DynCapability>>,
}

impl CapabilityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in capability
    pub fn builtin(services: Services) -> Self {
        let mut registry = Self::new();
        registry.register(GenerateStory::new(services.clone()));
        registry.register(ProcessText::new(services));
        registry
    }

    /// Add a capability, replacing any previous one with the same name
    pub fn register<C: Capability + 'static>(&mut self, capability: C) {
        if self
            .capabilities
            .insert(C::NAME, Arc::new(capability))
            .is_some()
        {
            debug!(capability = C::NAME, "Replaced registered capability");
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn DynCapability>> {
        self.capabilities.get(name).cloned()
    }

    /// Registered capabilities, sorted by name
    pub fn list(&self) -> Vec<CapabilityInfo> {
        self.capabilities
            .values()
            .map(|c| CapabilityInfo {
                name: c.name().to_string(),
                description: c.description().to_string(),
            })
            .collect()
    }

    #[instrument(skip(self, input, ctx), fields(request_id = %ctx.request_id))]
    pub async fn invoke(&self, name: &str, input: Value, ctx: &InvocationContext) -> Result<Value> {
        let capability = self
            .get(name)
            .ok_or_else(|| TaleError::UnknownCapability(name.to_string()))?;
        capability.invoke(input, ctx).await
    }
}
