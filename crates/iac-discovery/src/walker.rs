//! Lazy depth-first traversal of a scan path.
//!
//! The walk is pre-order: a directory event always precedes the events of
//! its descendants. Children are visited in the order the filesystem lists
//! them; nothing is sorted. Empty subdirectories are pruned without producing
//! any event. Each `next()` pulls one entry from the underlying `walkdir`
//! iterator, so abandoning the walk leaves nothing to clean up.

use std::ffi::OsStr;
use std::fs;
use std::io;
use std::iter::FusedIterator;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;
use walkdir::{DirEntry, FilterEntry, WalkDir};

/// One event produced by [`walk`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TraversalEntry {
    /// Entering a directory (the root or a non-empty subdirectory).
    Directory(PathBuf),
    /// A regular file found in `dir`; `file_name` is its full path.
    File { dir: PathBuf, file_name: PathBuf },
}

impl TraversalEntry {
    /// The path this entry refers to.
    pub fn path(&self) -> &Path {
        match self {
            TraversalEntry::Directory(path) => path,
            TraversalEntry::File { file_name, .. } => file_name,
        }
    }

    pub fn is_file(&self) -> bool {
        matches!(self, TraversalEntry::File { .. })
    }
}

/// A directory could not be listed.
#[derive(Debug, Error)]
#[error("failed to read directory {}: {source}", path.display())]
pub struct WalkError {
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}

impl WalkError {
    fn from_walkdir(err: walkdir::Error, fallback: &Path) -> Self {
        let path = err
            .path()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| fallback.to_path_buf());
        let source = err
            .into_io_error()
            .unwrap_or_else(|| io::Error::new(io::ErrorKind::Other, "filesystem loop detected"));
        Self { path, source }
    }
}

type Entries = FilterEntry<walkdir::IntoIter, fn(&DirEntry) -> bool>;

/// Iterator returned by [`walk`].
///
/// Yields at most one error, after which it is exhausted.
pub struct Walk {
    root: PathBuf,
    root_emitted: bool,
    entries: Option<Entries>,
}

/// Walk `root`, descending at most `max_depth` levels below it.
///
/// `max_depth = Some(0)` yields only the root directory event; `None` means
/// no limit. Directories at depth `max_depth` are reported but not entered.
pub fn walk(root: impl Into<PathBuf>, max_depth: Option<usize>) -> Walk {
    let root = root.into();
    let entries = match max_depth {
        Some(0) => None,
        _ => {
            let mut walker = WalkDir::new(&root).follow_links(false);
            if let Some(depth) = max_depth {
                walker = walker.max_depth(depth);
            }
            let keep: fn(&DirEntry) -> bool = keep_entry;
            Some(walker.into_iter().filter_entry(keep))
        }
    };
    Walk {
        root,
        root_emitted: false,
        entries,
    }
}

/// Prunes empty subdirectories. The root is always kept.
fn keep_entry(entry: &DirEntry) -> bool {
    if entry.depth() == 0 || !entry.file_type().is_dir() {
        return true;
    }
    // A listing error is left for walkdir to report with this path.
    let non_empty = fs::read_dir(entry.path())
        .map(|mut children| children.next().is_some())
        .unwrap_or(true);
    if !non_empty {
        debug!(path = %entry.path().display(), "pruning empty directory");
    }
    non_empty
}

impl Walk {
    /// Only the paths of discovered files.
    pub fn files(self) -> impl Iterator<Item = Result<PathBuf, WalkError>> {
        self.filter_map(|entry| match entry {
            Ok(TraversalEntry::File { file_name, .. }) => Some(Ok(file_name)),
            Ok(TraversalEntry::Directory(_)) => None,
            Err(e) => Some(Err(e)),
        })
    }

    fn fail(&mut self, err: WalkError) -> Option<Result<TraversalEntry, WalkError>> {
        self.entries = None;
        Some(Err(err))
    }
}

impl Iterator for Walk {
    type Item = Result<TraversalEntry, WalkError>;

    fn next(&mut self) -> Option<Self::Item> {
        if !self.root_emitted {
            self.root_emitted = true;
            return Some(Ok(TraversalEntry::Directory(self.root.clone())));
        }

        loop {
            let entry = match self.entries.as_mut()?.next() {
                None => {
                    self.entries = None;
                    return None;
                }
                Some(Err(err)) => {
                    let err = WalkError::from_walkdir(err, &self.root);
                    return self.fail(err);
                }
                Some(Ok(entry)) => entry,
            };

            let file_type = entry.file_type();
            if entry.depth() == 0 {
                if file_type.is_dir() {
                    continue;
                }
                // The root is not a directory; report why it cannot be listed.
                match fs::read_dir(entry.path()) {
                    Ok(_) => continue,
                    Err(source) => {
                        let path = entry.into_path();
                        return self.fail(WalkError { path, source });
                    }
                }
            }

            if file_type.is_dir() {
                return Some(Ok(TraversalEntry::Directory(entry.into_path())));
            }
            if file_type.is_file() {
                let file_name = entry.into_path();
                let dir = file_name
                    .parent()
                    .map(Path::to_path_buf)
                    .unwrap_or_default();
                return Some(Ok(TraversalEntry::File { dir, file_name }));
            }
            // Symlinks and special files are neither walked nor reported.
        }
    }
}

impl FusedIterator for Walk {}

/// Case-insensitive extension check. An empty list matches every path.
pub fn has_extension(path: &Path, extensions: &[String]) -> bool {
    if extensions.is_empty() {
        return true;
    }
    path.extension()
        .and_then(OsStr::to_str)
        .is_some_and(|ext| extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
}
