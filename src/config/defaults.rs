//! Built-in defaults (layer 1)

use serde::{Deserialize, Serialize};

use crate::cache::{DEFAULT_CACHE_DIR, DEFAULT_CUSTOM_RULES_ARTIFACT};

/// File extensions picked up by discovery unless configured otherwise.
const DEFAULT_EXTENSIONS: &[&str] = &["yaml", "yml", "json", "tf"];

/// Built-in default configuration values
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuiltinDefaults {
    /// Local cache directory (default: ".iac-data")
    pub cache_dir: String,

    /// Custom rules artifact inside the cache (default: "custom-bundle.tar.gz")
    pub custom_rules_artifact: String,

    /// Extensions of files handed to the scan engine
    pub extensions: Vec<String>,

    /// Traversal depth limit (default: unlimited)
    pub max_depth: Option<u64>,
}

impl Default for BuiltinDefaults {
    fn default() -> Self {
        Self {
            cache_dir: DEFAULT_CACHE_DIR.to_string(),
            custom_rules_artifact: DEFAULT_CUSTOM_RULES_ARTIFACT.to_string(),
            extensions: DEFAULT_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
            max_depth: None,
        }
    }
}

impl BuiltinDefaults {
    /// Convert to JSON Value for merging
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::json!({
            "cache_dir": self.cache_dir,
            "custom_rules_artifact": self.custom_rules_artifact,
            "discovery": {
                "extensions": self.extensions,
                "max_depth": self.max_depth
            }
        })
    }
}
