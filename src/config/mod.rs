//! Layered configuration
//!
//! Settings are merged from three layers, later layers winning:
//! 1. Built-in defaults
//! 2. Project config (`--config <file>` or `.iac-local.toml`)
//! 3. CLI flags

mod defaults;
mod effective;
mod merge;

pub use defaults::BuiltinDefaults;
pub use effective::{
    ConfigError, ConfigOrigin, ConfigSource, DiscoverySettings, EffectiveConfig, Settings,
    PROJECT_CONFIG_FILE,
};
pub use merge::{deep_merge, merge_layers};
