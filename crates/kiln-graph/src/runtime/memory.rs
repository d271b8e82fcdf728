//! In-memory runtime for tests.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use parking_lot::RwLock;

use super::{Runtime, RuntimeError, RuntimeResult};

/// A filesystem held entirely in memory. Directories exist implicitly
/// whenever a file lives beneath them.
#[derive(Debug, Default)]
pub struct MemoryRuntime {
    files: RwLock<BTreeMap<PathBuf, Vec<u8>>>,
}

impl MemoryRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file, replacing any previous content.
    pub fn add_file(&self, path: impl Into<PathBuf>, content: impl Into<Vec<u8>>) {
        self.files.write().insert(path.into(), content.into());
    }

    /// Add an empty file, typically a jar whose content is irrelevant.
    pub fn touch(&self, path: impl Into<PathBuf>) {
        self.add_file(path, Vec::new());
    }

    pub fn remove_file(&self, path: &Path) {
        self.files.write().remove(path);
    }

    fn is_dir(&self, path: &Path) -> bool {
        self.files
            .read()
            .keys()
            .any(|file| file != path && file.starts_with(path))
    }
}

impl Runtime for MemoryRuntime {
    fn read_file(&self, path: &Path) -> RuntimeResult<Vec<u8>> {
        self.files
            .read()
            .get(path)
            .cloned()
            .ok_or_else(|| RuntimeError::FileNotFound(path.to_path_buf()))
    }

    fn exists(&self, path: &Path) -> bool {
        self.is_file(path) || self.is_dir(path)
    }

    fn is_file(&self, path: &Path) -> bool {
        self.files.read().contains_key(path)
    }

    fn read_dir(&self, path: &Path) -> RuntimeResult<Vec<String>> {
        if !self.is_dir(path) {
            return Err(RuntimeError::FileNotFound(path.to_path_buf()));
        }
        let names: BTreeSet<String> = self
            .files
            .read()
            .keys()
            .filter_map(|file| file.strip_prefix(path).ok())
            .filter_map(|rel| rel.components().next())
            .map(|first| first.as_os_str().to_string_lossy().into_owned())
            .collect();
        Ok(names.into_iter().collect())
    }

    fn walk_files(&self, root: &Path, max_depth: usize) -> RuntimeResult<Vec<PathBuf>> {
        Ok(self
            .files
            .read()
            .keys()
            .filter(|file| {
                file.strip_prefix(root)
                    .map(|rel| rel.components().count() <= max_depth)
                    .unwrap_or(false)
            })
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directories_are_implicit() {
        let runtime = MemoryRuntime::new();
        runtime.touch("/ws/bazel-bin/a/liba.jar");
        runtime.add_file("/ws/bazel-bin/a/b/x.json", "{}");

        assert!(runtime.exists(Path::new("/ws/bazel-bin")));
        assert!(runtime.is_file(Path::new("/ws/bazel-bin/a/liba.jar")));
        assert!(!runtime.is_file(Path::new("/ws/bazel-bin/a")));
        assert_eq!(
            runtime.read_dir(Path::new("/ws/bazel-bin/a")).unwrap(),
            vec!["b".to_string(), "liba.jar".to_string()]
        );
        assert_eq!(runtime.read_file(Path::new("/ws/bazel-bin/a/b/x.json")).unwrap(), b"{}");
    }

    #[test]
    fn walk_files_limits_depth() {
        let runtime = MemoryRuntime::new();
        runtime.touch("/r/one.json");
        runtime.touch("/r/a/b/c/deep.json");

        assert_eq!(
            runtime.walk_files(Path::new("/r"), 2).unwrap(),
            vec![PathBuf::from("/r/one.json")]
        );
        assert_eq!(runtime.walk_files(Path::new("/r"), 4).unwrap().len(), 2);
        assert!(runtime.walk_files(Path::new("/missing"), 4).unwrap().is_empty());
    }
}
