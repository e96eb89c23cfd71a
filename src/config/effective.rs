//! Effective configuration with provenance
//!
//! The effective config is the merged JSON value plus a record of every
//! source that contributed to it. Typed [`Settings`] are deserialized from
//! the merged value once it has been validated.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};

use super::defaults::BuiltinDefaults;
use super::merge::merge_layers;
use crate::cache::CacheDir;
use crate::checksum;

/// Project config file picked up from the working directory.
pub const PROJECT_CONFIG_FILE: &str = ".iac-local.toml";

/// Origin of a configuration source
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum ConfigOrigin {
    Builtin,
    Project,
    Cli,
}

/// A contributing config source with provenance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigSource {
    pub origin: ConfigOrigin,

    /// File path (None for builtin/cli)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// SHA-256 of the raw file bytes (None for builtin/cli)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
}

/// Typed view of the merged configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub cache_dir: PathBuf,
    pub custom_rules_artifact: String,
    pub discovery: DiscoverySettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoverySettings {
    /// Extensions (without the dot) of files to scan; empty means all files.
    #[serde(default)]
    pub extensions: Vec<String>,
    #[serde(default)]
    pub max_depth: Option<usize>,
}

impl Settings {
    /// The cache directory these settings describe.
    pub fn cache(&self) -> CacheDir {
        CacheDir::new(&self.cache_dir).with_custom_rules_artifact(&self.custom_rules_artifact)
    }
}

/// Merged configuration plus the sources it came from
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EffectiveConfig {
    /// The merged configuration object
    pub config: Value,

    /// Contributing sources in precedence order
    pub sources: Vec<ConfigSource>,
}

impl EffectiveConfig {
    /// Build effective config from layers.
    ///
    /// `project_config_path`, when given, must exist.
    pub fn build(
        project_config_path: Option<&Path>,
        cli_overrides: Option<Value>,
    ) -> Result<Self, ConfigError> {
        let mut layers = vec![BuiltinDefaults::default().to_value()];
        let mut sources = vec![ConfigSource {
            origin: ConfigOrigin::Builtin,
            path: None,
            digest: None,
        }];

        if let Some(path) = project_config_path {
            let (value, digest) = Self::load_toml_file(path)?;
            layers.push(value);
            sources.push(ConfigSource {
                origin: ConfigOrigin::Project,
                path: Some(path.to_string_lossy().to_string()),
                digest: Some(digest),
            });
        }

        if let Some(cli) = cli_overrides {
            layers.push(cli);
            sources.push(ConfigSource {
                origin: ConfigOrigin::Cli,
                path: None,
                digest: None,
            });
        }

        let merged = merge_layers(layers);
        Self::validate_config(&merged)?;

        Ok(Self {
            config: merged,
            sources,
        })
    }

    /// Load and parse a TOML file, returning the value and digest
    fn load_toml_file(path: &Path) -> Result<(Value, String), ConfigError> {
        let bytes = fs::read(path)
            .map_err(|e| ConfigError::IoError(format!("{}: {}", path.display(), e)))?;
        let digest = checksum::hash(&bytes);

        let contents = String::from_utf8(bytes)
            .map_err(|e| ConfigError::ParseError(format!("Invalid UTF-8: {}", e)))?;
        let toml_value: toml::Value = toml::from_str(&contents)
            .map_err(|e| ConfigError::ParseError(format!("TOML parse error: {}", e)))?;

        Ok((Self::toml_to_json(toml_value), digest))
    }

    fn toml_to_json(toml: toml::Value) -> Value {
        match toml {
            toml::Value::String(s) => Value::String(s),
            toml::Value::Integer(i) => Value::Number(i.into()),
            toml::Value::Float(f) => serde_json::Number::from_f64(f)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            toml::Value::Boolean(b) => Value::Bool(b),
            toml::Value::Datetime(dt) => Value::String(dt.to_string()),
            toml::Value::Array(arr) => {
                Value::Array(arr.into_iter().map(Self::toml_to_json).collect())
            }
            toml::Value::Table(table) => Value::Object(
                table
                    .into_iter()
                    .map(|(k, v)| (k, Self::toml_to_json(v)))
                    .collect(),
            ),
        }
    }

    fn validate_config(config: &Value) -> Result<(), ConfigError> {
        match config.get("cache_dir").and_then(Value::as_str) {
            Some(dir) if !dir.is_empty() => {}
            _ => {
                return Err(ConfigError::ValidationError(
                    "cache_dir must be a non-empty string".to_string(),
                ))
            }
        }

        match config.get("custom_rules_artifact").and_then(Value::as_str) {
            Some(name) if !name.is_empty() && Path::new(name).file_name() == Some(OsStr::new(name)) => {}
            _ => {
                return Err(ConfigError::ValidationError(
                    "custom_rules_artifact must be a plain file name".to_string(),
                ))
            }
        }

        if let Some(extensions) = config.pointer("/discovery/extensions") {
            let valid = extensions.as_array().is_some_and(|exts| {
                exts.iter()
                    .all(|e| e.as_str().is_some_and(|s| !s.is_empty() && !s.starts_with('.')))
            });
            if !valid {
                return Err(ConfigError::ValidationError(
                    "discovery.extensions must list extensions without a leading dot".to_string(),
                ));
            }
        }

        if let Some(depth) = config.pointer("/discovery/max_depth") {
            if !depth.is_null() && !depth.is_u64() {
                return Err(ConfigError::ValidationError(
                    "discovery.max_depth must be a non-negative integer".to_string(),
                ));
            }
        }

        Ok(())
    }

    /// Typed settings from the merged value.
    pub fn settings(&self) -> Result<Settings, ConfigError> {
        serde_json::from_value(self.config.clone())
            .map_err(|e| ConfigError::ValidationError(e.to_string()))
    }

    /// Get a config value by path (dot-separated)
    pub fn get(&self, path: &str) -> Option<&Value> {
        let mut current = &self.config;
        for part in path.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    /// Serialize to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),
}
