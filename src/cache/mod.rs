//! Local policy engine cache
//!
//! The cache directory holds the extracted policy bundle: one compiled policy
//! (`*.wasm`) and one data file per engine, plus an optional custom rules
//! artifact. Its location is an explicit [`CacheDir`] value rather than a
//! process-wide constant.
//!
//! The cache persists across invocations and is never cleaned up here.
//! Concurrent writers (two processes extracting at once) are not guarded
//! against; callers must serialize them.

mod bundle;
mod extract;

pub use bundle::{is_valid_bundle, BundleArtifacts, BundleStatus, EngineStatus, EngineType};
pub use extract::{ExtractSummary, ExtractionError, ExtractionStage};

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Default cache location, relative to the working directory.
pub const DEFAULT_CACHE_DIR: &str = ".iac-data";

/// Default file name of the custom rules artifact.
pub const DEFAULT_CUSTOM_RULES_ARTIFACT: &str = "custom-bundle.tar.gz";

/// The cache directory could not be created or is not writable.
///
/// Sub-causes are only available through [`std::error::Error::source`].
#[derive(Debug, Error)]
#[error("failed to initialize local cache at {}", path.display())]
pub struct CacheInitializationError {
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}

/// Handle on the local cache directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheDir {
    path: PathBuf,
    custom_rules_artifact: String,
}

impl CacheDir {
    /// Cache rooted at `path` with the default custom rules artifact name.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            custom_rules_artifact: DEFAULT_CUSTOM_RULES_ARTIFACT.to_string(),
        }
    }

    /// Override the custom rules artifact file name.
    pub fn with_custom_rules_artifact(mut self, name: impl Into<String>) -> Self {
        self.custom_rules_artifact = name.into();
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Full path of the custom rules artifact.
    pub fn custom_rules_path(&self) -> PathBuf {
        self.path.join(&self.custom_rules_artifact)
    }

    /// Make sure the cache directory exists and is writable.
    ///
    /// Missing directories are created owner-only (`0o700`). Existing content
    /// is left untouched, so calling this repeatedly is harmless.
    pub fn ensure(&self) -> Result<(), CacheInitializationError> {
        self.try_ensure().map_err(|source| CacheInitializationError {
            path: self.path.clone(),
            source,
        })
    }

    fn try_ensure(&self) -> io::Result<()> {
        match fs::metadata(&self.path) {
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => {
                return Err(io::Error::new(
                    io::ErrorKind::AlreadyExists,
                    "cache path exists and is not a directory",
                ))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                create_private_dir(&self.path)?;
                debug!(path = %self.path.display(), "created local cache directory");
            }
            Err(e) => return Err(e),
        }
        check_writable(&self.path)
    }
}

impl Default for CacheDir {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_DIR)
    }
}

#[cfg(unix)]
fn create_private_dir(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::DirBuilderExt;

    fs::DirBuilder::new().recursive(true).mode(0o700).create(path)
}

#[cfg(not(unix))]
fn create_private_dir(path: &Path) -> io::Result<()> {
    fs::create_dir_all(path)
}

#[cfg(unix)]
fn check_writable(path: &Path) -> io::Result<()> {
    use nix::unistd::{access, AccessFlags};

    access(path, AccessFlags::W_OK).map_err(io::Error::from)
}

#[cfg(not(unix))]
fn check_writable(path: &Path) -> io::Result<()> {
    let probe = path.join(".write_test");
    fs::File::create(&probe)?;
    fs::remove_file(&probe)
}
