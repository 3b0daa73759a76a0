//! Filesystem abstraction.
//!
//! Two interchangeable implementations: `DiskFileSystem` (real disk) and
//! `MemFileSystem` (in-memory overlay with optional read-through fallback).
//! The dry-run sandbox layers a `MemFileSystem` over the real one so trial
//! executions capture writes without touching disk.

mod disk;
mod mem;

pub use disk::DiskFileSystem;
pub use mem::MemFileSystem;

use crate::errors::FsError;
use serde_json::Value;
use std::path::{Path, PathBuf};

/// One entry of a directory scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub path: PathBuf,
    pub is_dir: bool,
}

/// The abstract filesystem contract the engine runs against.
pub trait FileSystem: Send + Sync {
    fn read(&self, path: &Path) -> Result<Vec<u8>, FsError>;

    fn write(&self, path: &Path, contents: &[u8]) -> Result<(), FsError>;

    fn exists(&self, path: &Path) -> bool;

    /// Create a directory, including missing parents.
    fn mkdir(&self, path: &Path) -> Result<(), FsError>;

    /// Remove a file.
    fn delete(&self, path: &Path) -> Result<(), FsError>;

    /// Remove a directory tree.
    fn rmdir(&self, path: &Path) -> Result<(), FsError>;

    /// List the immediate entries of a directory.
    fn scan_dir(&self, path: &Path) -> Result<Vec<DirEntry>, FsError>;

    /// Record that `path` mirrors the real directory tree at `target`
    /// without copying content eagerly. Used by dry-run define tasks; a
    /// no-op on filesystems where `path` is already real.
    fn write_reference(&self, path: &Path, target: &Path) -> Result<(), FsError>;

    fn read_to_string(&self, path: &Path) -> Result<String, FsError> {
        let bytes = self.read(path)?;
        String::from_utf8(bytes).map_err(|e| FsError::Io {
            path: path.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidData, e),
        })
    }

    fn read_json(&self, path: &Path) -> Result<Value, FsError> {
        let text = self.read_to_string(path)?;
        serde_json::from_str(&text).map_err(|e| FsError::Json {
            path: path.to_path_buf(),
            source: e,
        })
    }

    fn write_json(&self, path: &Path, value: &Value) -> Result<(), FsError> {
        let text = serde_json::to_string_pretty(value).map_err(|e| FsError::Json {
            path: path.to_path_buf(),
            source: e,
        })?;
        self.write(path, text.as_bytes())
    }
}
