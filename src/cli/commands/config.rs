//! Config Command
//!
//! Manage TinyTales configuration.
//!
//! Usage:
//!   tinytales config show [-f json]
//!   tinytales config path
//!   tinytales config init [--global] [--force]

use crate::cli::ui::Output;
use crate::config::ConfigLoader;
use crate::types::Result;

/// Show the merged effective configuration
pub fn show(format: &str) -> Result<()> {
    ConfigLoader::show_config(format == "json")
}

/// Show configuration paths
pub fn path() -> Result<()> {
    ConfigLoader::show_path();
    Ok(())
}

pub fn init(global: bool, force: bool) -> Result<()> {
    let out = Output::new();
    let path = if global {
        ConfigLoader::init_global(force)?
    } else {
        ConfigLoader::init_project(force)?
    };

    let scope = if global { "global" } else { "project" };
    out.success(&format!("Initialized {} configuration", scope));
    out.field("Config", &path.display().to_string());
    Ok(())
}
