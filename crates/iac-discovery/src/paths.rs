//! Project root and target file resolution.
//!
//! A scan path argument may point at a single file or at a directory. For a
//! file, the project starts at the file's parent directory and the target
//! file is the argument itself. For a directory, the project starts at the
//! directory and each discovered file is reported relative to it.

use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

/// Scan path used when the user gives none.
pub const DEFAULT_SCAN_PATH: &str = ".";

/// Where a scanned file lives, as reported to the scan engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedLocation {
    /// Absolute path of the file being scanned.
    pub target_file_path: PathBuf,
    /// Basename of the inferred project root.
    pub project_name: String,
    /// Path of the scanned file relative to the project root.
    pub target_file: PathBuf,
}

/// Resolves scan paths against a fixed working directory.
#[derive(Debug, Clone)]
pub struct PathResolver {
    cwd: PathBuf,
}

impl PathResolver {
    /// Create a resolver anchored at `cwd`.
    ///
    /// A relative `cwd` is resolved against the process working directory,
    /// which fails only when that directory cannot be read.
    pub fn new(cwd: impl AsRef<Path>) -> io::Result<Self> {
        let cwd = cwd.as_ref();
        let cwd = if cwd.is_absolute() {
            cwd.to_path_buf()
        } else {
            std::env::current_dir()?.join(cwd)
        };
        Ok(Self {
            cwd: normalize(&cwd),
        })
    }

    /// Create a resolver anchored at the process working directory.
    pub fn from_current_dir() -> io::Result<Self> {
        Self::new(std::env::current_dir()?)
    }

    /// The working directory relative paths are resolved against.
    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    /// Resolve `path` to an absolute, lexically normalized path.
    ///
    /// Symlinks are not followed and the path need not exist.
    pub fn resolve(&self, path: impl AsRef<Path>) -> PathBuf {
        normalize(&self.cwd.join(path.as_ref()))
    }

    /// Compute the project name and target file for `file_path`, given the
    /// path argument the scan was started with.
    pub fn compute_paths(
        &self,
        file_path: impl AsRef<Path>,
        scan_path_arg: impl AsRef<Path>,
    ) -> ResolvedLocation {
        let scan_path_arg = scan_path_arg.as_ref();
        let target_file_path = self.resolve(file_path);
        let cmd_path = self.resolve(scan_path_arg);

        let (project_path, target_file) = if is_local_folder(&cmd_path) {
            let target_file = relative_path(&cmd_path, &target_file_path);
            (cmd_path, target_file)
        } else {
            // A file argument: the project starts at its parent folder and the
            // argument itself names the target.
            let project_path = cmd_path
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| cmd_path.clone());
            let target_file = if scan_path_arg.is_absolute() {
                relative_path(&self.cwd, &normalize(scan_path_arg))
            } else {
                scan_path_arg.to_path_buf()
            };
            (project_path, target_file)
        };

        let project_name = project_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        ResolvedLocation {
            target_file_path,
            project_name,
            target_file,
        }
    }

    /// [`compute_paths`](Self::compute_paths) with the default `"."` argument.
    pub fn compute_paths_default(&self, file_path: impl AsRef<Path>) -> ResolvedLocation {
        self.compute_paths(file_path, DEFAULT_SCAN_PATH)
    }
}

/// True only for an existing directory; symlinks to directories do not count.
fn is_local_folder(path: &Path) -> bool {
    fs::symlink_metadata(path)
        .map(|meta| meta.is_dir())
        .unwrap_or(false)
}

/// Lexically normalize a path: drop `.` segments and fold `..` into the
/// preceding segment. `..` above the root of an absolute path is discarded;
/// leading `..` of a relative path is kept.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out: Vec<Component<'_>> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.last() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(component),
            },
            other => out.push(other),
        }
    }
    out.iter().collect()
}

/// Path from `from` to `to`, both absolute and normalized.
///
/// Returns an empty path when they are equal.
pub fn relative_path(from: &Path, to: &Path) -> PathBuf {
    let from: Vec<_> = from.components().collect();
    let to: Vec<_> = to.components().collect();

    let common = from
        .iter()
        .zip(to.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut out = PathBuf::new();
    for _ in common..from.len() {
        out.push("..");
    }
    for component in &to[common..] {
        out.push(component.as_os_str());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_normalize_drops_cur_and_folds_parent() {
        assert_eq!(normalize(Path::new("/a/./b/../c")), PathBuf::from("/a/c"));
        assert_eq!(normalize(Path::new("/../a")), PathBuf::from("/a"));
        assert_eq!(normalize(Path::new("../a/./b")), PathBuf::from("../a/b"));
        assert_eq!(normalize(Path::new("/a/b/")), PathBuf::from("/a/b"));
    }

    #[test]
    fn test_relative_path() {
        assert_eq!(
            relative_path(Path::new("/a/b"), Path::new("/a/b/c/d.yml")),
            PathBuf::from("c/d.yml")
        );
        assert_eq!(
            relative_path(Path::new("/a/c"), Path::new("/a/b/d.yml")),
            PathBuf::from("../b/d.yml")
        );
        assert_eq!(
            relative_path(Path::new("/a/b"), Path::new("/a/b")),
            PathBuf::new()
        );
    }

    #[test]
    fn test_resolve_relative_against_cwd() {
        let resolver = PathResolver::new("/work/project").unwrap();
        assert_eq!(
            resolver.resolve("sub/../main.tf"),
            PathBuf::from("/work/project/main.tf")
        );
        assert_eq!(resolver.resolve("/etc/x.yml"), PathBuf::from("/etc/x.yml"));
    }

    #[test]
    fn test_relative_cwd_resolves_against_process_dir() {
        let resolver = PathResolver::new("sub/./dir").unwrap();
        let expected = normalize(&std::env::current_dir().unwrap().join("sub/dir"));

        assert!(resolver.cwd().is_absolute());
        assert_eq!(resolver.cwd(), expected);
    }

    #[test]
    fn test_absolute_cwd_is_normalized() {
        let resolver = PathResolver::new("/work/./project/../infra").unwrap();
        assert_eq!(resolver.cwd(), Path::new("/work/infra"));
    }

    #[test]
    fn test_directory_argument() {
        let dir = TempDir::new().unwrap();
        let project = dir.path().join("a").join("b");
        fs::create_dir_all(&project).unwrap();
        let target = project.join("target.yml");
        fs::write(&target, "kind: Pod").unwrap();

        let resolver = PathResolver::new(dir.path()).unwrap();
        let location = resolver.compute_paths(&target, &project);

        assert_eq!(location.project_name, "b");
        assert_eq!(location.target_file, PathBuf::from("target.yml"));
        assert_eq!(location.target_file_path, normalize(&target));
    }

    #[test]
    fn test_directory_argument_nested_file() {
        let dir = TempDir::new().unwrap();
        let project = dir.path().join("infra");
        fs::create_dir_all(project.join("k8s")).unwrap();
        let target = project.join("k8s").join("pod.yaml");
        fs::write(&target, "kind: Pod").unwrap();

        let resolver = PathResolver::new(&project).unwrap();
        let location = resolver.compute_paths_default(&target);

        assert_eq!(location.project_name, "infra");
        assert_eq!(location.target_file, PathBuf::from("k8s/pod.yaml"));
    }

    #[test]
    fn test_relative_file_argument_passes_through() {
        let resolver = PathResolver::new("/a/b").unwrap();
        let location = resolver.compute_paths("/a/b/target.yml", "target.yml");

        assert_eq!(location.project_name, "b");
        assert_eq!(location.target_file, PathBuf::from("target.yml"));
        assert_eq!(location.target_file_path, PathBuf::from("/a/b/target.yml"));
    }

    #[test]
    fn test_relative_file_argument_kept_verbatim() {
        let resolver = PathResolver::new("/a").unwrap();
        let location = resolver.compute_paths("/a/b/target.yml", "./b/target.yml");

        assert_eq!(location.project_name, "b");
        assert_eq!(location.target_file, PathBuf::from("./b/target.yml"));
    }

    #[test]
    fn test_absolute_file_argument_is_relative_to_cwd() {
        let resolver = PathResolver::new("/a/b").unwrap();
        let location = resolver.compute_paths("/a/b/target.yml", "/a/b/target.yml");

        assert_eq!(location.project_name, "b");
        assert_eq!(location.target_file, PathBuf::from("target.yml"));
        assert!(!location.target_file.is_absolute());
    }

    #[test]
    fn test_absolute_file_argument_outside_cwd() {
        let resolver = PathResolver::new("/a/c").unwrap();
        let location = resolver.compute_paths("/a/b/target.yml", "/a/b/target.yml");

        assert_eq!(location.project_name, "b");
        assert_eq!(location.target_file, PathBuf::from("../b/target.yml"));
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_directory_is_treated_as_file() {
        let dir = TempDir::new().unwrap();
        let real = dir.path().join("real");
        fs::create_dir(&real).unwrap();
        let link = dir.path().join("link");
        std::os::unix::fs::symlink(&real, &link).unwrap();

        let resolver = PathResolver::new(dir.path()).unwrap();
        let location = resolver.compute_paths(real.join("x.tf"), "link");

        assert_eq!(location.target_file, PathBuf::from("link"));
        assert_eq!(
            location.project_name,
            dir.path().file_name().unwrap().to_string_lossy()
        );
    }

    #[test]
    fn test_serializes_camel_case() {
        let resolver = PathResolver::new("/a/b").unwrap();
        let location = resolver.compute_paths("/a/b/target.yml", "target.yml");
        let json = serde_json::to_value(&location).unwrap();

        assert_eq!(json["projectName"], "b");
        assert_eq!(json["targetFile"], "target.yml");
        assert_eq!(json["targetFilePath"], "/a/b/target.yml");
    }
}
