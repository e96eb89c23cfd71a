//! iac-local - local bundle cache and scan input discovery
//!
//! Prepares a filesystem IaC scan: keeps the policy engine bundle in a local
//! cache directory (creation, extraction, validity and checksum probes) and
//! re-exports the discovery primitives that enumerate scannable files and
//! name them relative to their project.

pub mod cache;
pub mod checksum;
pub mod config;

pub use cache::{
    is_valid_bundle, BundleStatus, CacheDir, CacheInitializationError, EngineType,
    ExtractionError, ExtractionStage,
};
pub use config::{ConfigError, EffectiveConfig, Settings};
pub use iac_discovery::{walk, PathResolver, ResolvedLocation, TraversalEntry, WalkError};
