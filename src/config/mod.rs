//! Configuration Management
//!
//! Unified configuration system with hierarchical resolution:
//! 1. Built-in defaults
//! 2. Global config ($XDG_CONFIG_HOME/tinytales/config.toml)
//! 3. Project config (./tinytales.toml)
//! 4. Environment variables (TINYTALES_*)
//! 5. CLI arguments (highest priority)

mod loader;
mod types;

pub use loader::ConfigLoader;
pub use types::*;
