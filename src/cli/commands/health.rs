//! Health Command
//!
//! Probe the text backend and report the image cascade.

use crate::ai::timeout::{TimeoutConfig, with_timeout};
use crate::cli::ui::Output;
use crate::cli::util::CommandContext;
use crate::types::{Result, TaleError};

pub async fn run() -> Result<()> {
    let ctx = CommandContext::load()?;
    let out = Output::new();
    let text = &ctx.services.text;
    let timeouts = TimeoutConfig::from_config(&ctx.config);

    out.header("Text backend");
    out.field("Provider", text.name());
    out.field("Model", text.model());

    let healthy = match with_timeout(timeouts.health_check, text.health_check(), "health check").await
    {
        Ok(true) => {
            out.success("Backend reachable");
            true
        }
        Ok(false) => {
            out.warning("Backend unavailable or model missing");
            false
        }
        Err(e) => {
            out.error(&format!("Backend unreachable: {}", e));
            false
        }
    };

    out.header("Image cascade");
    for (index, tier) in ctx.services.images.tiers().iter().enumerate() {
        out.field(&format!("Tier {}", index + 1), tier);
    }

    if healthy {
        Ok(())
    } else {
        Err(TaleError::Config(format!(
            "text backend '{}' is not healthy",
            text.name()
        )))
    }
}
