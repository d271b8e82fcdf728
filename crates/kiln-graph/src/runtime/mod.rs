//! Filesystem runtime abstraction.
//!
//! Metadata discovery and classpath resolution only touch the filesystem
//! through the [`Runtime`] trait. Production code uses [`NativeRuntime`];
//! tests use [`MemoryRuntime`] so jar existence and directory layouts can be
//! described without touching disk.
//!
//! ```text
//!  MetadataStore ──┐
//!                  ├──▶ dyn Runtime ──▶ NativeRuntime ──▶ std::fs / walkdir
//!  ClasspathEngine ┘                └─▶ MemoryRuntime ──▶ in-memory tree
//! ```

mod native;

#[cfg(any(test, feature = "test-utils"))]
mod memory;

pub use native::NativeRuntime;

#[cfg(any(test, feature = "test-utils"))]
pub use memory::MemoryRuntime;

use std::path::{Path, PathBuf};

/// Result type for runtime operations
pub type RuntimeResult<T> = Result<T, RuntimeError>;

/// Errors that can occur during runtime operations
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    /// File not found
    #[error("file not found: {0}")]
    FileNotFound(PathBuf),

    /// I/O error
    #[error("I/O error on {path}: {message}")]
    Io { path: PathBuf, message: String },
}

impl RuntimeError {
    pub(crate) fn io(path: &Path, err: impl std::fmt::Display) -> Self {
        RuntimeError::Io {
            path: path.to_path_buf(),
            message: err.to_string(),
        }
    }
}

/// Synchronous filesystem access used by kiln.
pub trait Runtime: Send + Sync + std::fmt::Debug {
    /// Read a whole file.
    fn read_file(&self, path: &Path) -> RuntimeResult<Vec<u8>>;

    /// Check if a path exists
    fn exists(&self, path: &Path) -> bool;

    /// Check if a path is a regular file
    fn is_file(&self, path: &Path) -> bool;

    /// List the entry names of a directory, sorted.
    fn read_dir(&self, path: &Path) -> RuntimeResult<Vec<String>>;

    /// List every file under `root` up to `max_depth` levels deep, sorted by
    /// path. A missing root yields an empty list.
    fn walk_files(&self, root: &Path, max_depth: usize) -> RuntimeResult<Vec<PathBuf>>;
}
