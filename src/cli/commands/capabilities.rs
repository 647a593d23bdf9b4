//! Capabilities Command
//!
//! List registered capabilities.

use crate::cli::ui::Output;
use crate::cli::util::CommandContext;
use crate::types::Result;

pub fn run(format: &str) -> Result<()> {
    let ctx = CommandContext::load()?;
    let capabilities = ctx.registry.list();

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&capabilities)?);
        return Ok(());
    }

    let out = Output::new();
    out.header("Capabilities");
    for capability in &capabilities {
        out.field(&capability.name, &capability.description);
    }
    Ok(())
}
