//! Native runtime backed by `std::fs` and `walkdir`.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use super::{Runtime, RuntimeError, RuntimeResult};

/// Native filesystem Runtime implementation.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeRuntime;

impl NativeRuntime {
    pub fn new() -> Self {
        Self
    }
}

impl Runtime for NativeRuntime {
    fn read_file(&self, path: &Path) -> RuntimeResult<Vec<u8>> {
        std::fs::read(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                RuntimeError::FileNotFound(path.to_path_buf())
            } else {
                RuntimeError::io(path, e)
            }
        })
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn read_dir(&self, path: &Path) -> RuntimeResult<Vec<String>> {
        let entries = std::fs::read_dir(path).map_err(|e| RuntimeError::io(path, e))?;
        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| RuntimeError::io(path, e))?;
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        names.sort();
        Ok(names)
    }

    fn walk_files(&self, root: &Path, max_depth: usize) -> RuntimeResult<Vec<PathBuf>> {
        if !root.exists() {
            return Ok(Vec::new());
        }

        let mut files = Vec::new();
        for entry in WalkDir::new(root)
            .max_depth(max_depth)
            .follow_links(true)
            .sort_by_file_name()
        {
            match entry {
                Ok(entry) if entry.file_type().is_file() => files.push(entry.into_path()),
                Ok(_) => {}
                // Unreadable subtrees are skipped, not fatal.
                Err(err) => tracing::debug!(error = %err, "skipping unreadable path"),
            }
        }
        files.sort();
        Ok(files)
    }
}
