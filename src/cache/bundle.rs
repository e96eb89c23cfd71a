//! Bundle validity and checksum probes
//!
//! Both probes treat trouble as a normal state rather than an error: a bundle
//! that cannot be stat'ed is simply not valid yet, and a custom rules artifact
//! that is missing or unreadable simply has no checksum.

use serde::Serialize;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::warn;

use super::CacheDir;
use crate::checksum;

/// Policy engines that ship a compiled policy and a data file in the bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineType {
    Kubernetes,
    Terraform,
    CloudFormation,
    Arm,
}

impl EngineType {
    pub const ALL: [EngineType; 4] = [
        EngineType::Kubernetes,
        EngineType::Terraform,
        EngineType::CloudFormation,
        EngineType::Arm,
    ];

    /// File name prefix of this engine's artifacts.
    pub fn prefix(self) -> &'static str {
        match self {
            EngineType::Kubernetes => "k8s",
            EngineType::Terraform => "tf",
            EngineType::CloudFormation => "cloudformation",
            EngineType::Arm => "arm",
        }
    }
}

impl fmt::Display for EngineType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EngineType::Kubernetes => "kubernetes",
            EngineType::Terraform => "terraform",
            EngineType::CloudFormation => "cloudformation",
            EngineType::Arm => "arm",
        };
        f.write_str(name)
    }
}

/// Paths of one engine's bundle artifacts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BundleArtifacts {
    pub policy_wasm: PathBuf,
    pub data: PathBuf,
}

impl BundleArtifacts {
    pub fn is_valid(&self) -> bool {
        is_valid_bundle(&self.policy_wasm, &self.data)
    }
}

/// Validity of one engine's bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EngineStatus {
    pub engine: EngineType,
    #[serde(flatten)]
    pub artifacts: BundleArtifacts,
    pub valid: bool,
}

/// Snapshot of the cache contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BundleStatus {
    pub cache_dir: PathBuf,
    pub engines: Vec<EngineStatus>,
    pub custom_rules_checksum: Option<String>,
}

impl BundleStatus {
    /// True when every engine has both artifacts.
    pub fn is_complete(&self) -> bool {
        self.engines.iter().all(|e| e.valid)
    }
}

/// True iff both artifacts exist right now.
///
/// Any error while checking counts as "does not exist".
pub fn is_valid_bundle(wasm_path: &Path, data_path: &Path) -> bool {
    exists(wasm_path) && exists(data_path)
}

fn exists(path: &Path) -> bool {
    path.try_exists().unwrap_or(false)
}

impl CacheDir {
    /// Artifact paths for `engine` inside this cache.
    pub fn artifacts(&self, engine: EngineType) -> BundleArtifacts {
        let prefix = engine.prefix();
        BundleArtifacts {
            policy_wasm: self.path.join(format!("{prefix}_policy.wasm")),
            data: self.path.join(format!("{prefix}_data.json")),
        }
    }

    /// Checksum of the custom rules artifact, if there is one.
    ///
    /// Returns `None` when the artifact is absent (custom rules not in use)
    /// or cannot be read.
    pub fn custom_rules_checksum(&self) -> Option<String> {
        let path = self.custom_rules_path();
        match fs::read(&path) {
            Ok(content) => Some(checksum::hash(&content)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => None,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "could not read custom rules bundle");
                None
            }
        }
    }

    /// Validity of every engine bundle plus the custom rules checksum.
    pub fn bundle_status(&self) -> BundleStatus {
        let engines = EngineType::ALL
            .iter()
            .map(|&engine| {
                let artifacts = self.artifacts(engine);
                let valid = artifacts.is_valid();
                EngineStatus {
                    engine,
                    artifacts,
                    valid,
                }
            })
            .collect();

        BundleStatus {
            cache_dir: self.path.clone(),
            engines,
            custom_rules_checksum: self.custom_rules_checksum(),
        }
    }
}
