//! Scan input discovery for local IaC scans.
//!
//! Two pieces feed the scan engine:
//! - [`walk`] lazily enumerates directories and files under a scan path,
//!   pruning empty directories and honoring an optional depth limit.
//! - [`PathResolver`] turns a discovered file plus the user's scan path
//!   argument into a [`ResolvedLocation`] (project name and target file).

mod paths;
mod walker;

pub use paths::{normalize, relative_path, PathResolver, ResolvedLocation, DEFAULT_SCAN_PATH};
pub use walker::{has_extension, walk, TraversalEntry, Walk, WalkError};
