//! Run Command
//!
//! Invoke any registered capability with a JSON document.
//!
//! Usage:
//!   tinytales run process_text --input request.json
//!   echo '{"text": "..."}' | tinytales run process_text

use std::path::PathBuf;
use tracing::info;

use crate::capability::InvocationContext;
use crate::cli::util::{CommandContext, read_json_input};
use crate::types::Result;

pub async fn run(capability: &str, input: Option<PathBuf>) -> Result<()> {
    let payload = read_json_input(input.as_deref())?;
    let ctx = CommandContext::load()?;

    let invocation = InvocationContext::new();
    info!(capability, request_id = %invocation.request_id, "Invoking capability");

    let output = ctx.registry.invoke(capability, payload, &invocation).await?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
