//! CLI Common Utilities
//!
//! Shared initialization for command handlers.

use std::io::Read;
use std::path::Path;

use crate::capability::{CapabilityRegistry, Services};
use crate::config::{Config, ConfigLoader};
use crate::types::Result;

/// Command execution context
///
/// Loaded configuration plus the registry built from it.
pub struct CommandContext {
    pub config: Config,
    pub services: Services,
    pub registry: CapabilityRegistry,
}

impl CommandContext {
    /// Load config, build backends and register capabilities
    pub fn load() -> Result<Self> {
        let config = ConfigLoader::load()?;
        let services = Services::from_config(config.clone())?;
        let registry = CapabilityRegistry::builtin(services.clone());

        Ok(Self {
            config,
            services,
            registry,
        })
    }
}

/// Read a JSON document from a file, or stdin for `-` / no path
pub fn read_json_input(path: Option<&Path>) -> Result<serde_json::Value> {
    let content = match path {
        Some(p) if p != Path::new("-") => std::fs::read_to_string(p)?,
        _ => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };

    if content.trim().is_empty() {
        return Ok(serde_json::Value::Object(Default::default()));
    }
    Ok(serde_json::from_str(&content)?)
}
