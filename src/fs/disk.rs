//! Real-disk filesystem implementation.

use super::{DirEntry, FileSystem};
use crate::errors::FsError;
use std::path::Path;
use walkdir::WalkDir;

/// Straight passthrough to `std::fs`.
#[derive(Debug, Default, Clone, Copy)]
pub struct DiskFileSystem;

impl FileSystem for DiskFileSystem {
    fn read(&self, path: &Path) -> Result<Vec<u8>, FsError> {
        std::fs::read(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => FsError::NotFound {
                path: path.to_path_buf(),
            },
            _ => FsError::io(path, e),
        })
    }

    fn write(&self, path: &Path, contents: &[u8]) -> Result<(), FsError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| FsError::io(parent, e))?;
        }
        std::fs::write(path, contents).map_err(|e| FsError::io(path, e))
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn mkdir(&self, path: &Path) -> Result<(), FsError> {
        std::fs::create_dir_all(path).map_err(|e| FsError::io(path, e))
    }

    fn delete(&self, path: &Path) -> Result<(), FsError> {
        std::fs::remove_file(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => FsError::NotFound {
                path: path.to_path_buf(),
            },
            _ => FsError::io(path, e),
        })
    }

    fn rmdir(&self, path: &Path) -> Result<(), FsError> {
        std::fs::remove_dir_all(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => FsError::NotFound {
                path: path.to_path_buf(),
            },
            _ => FsError::io(path, e),
        })
    }

    fn scan_dir(&self, path: &Path) -> Result<Vec<DirEntry>, FsError> {
        if !path.is_dir() {
            return Err(FsError::NotADirectory {
                path: path.to_path_buf(),
            });
        }
        let mut entries = Vec::new();
        for entry in WalkDir::new(path).min_depth(1).max_depth(1).sort_by_file_name() {
            let entry = entry.map_err(|e| FsError::Io {
                path: path.to_path_buf(),
                source: e.into(),
            })?;
            entries.push(DirEntry {
                path: entry.path().to_path_buf(),
                is_dir: entry.file_type().is_dir(),
            });
        }
        Ok(entries)
    }

    fn write_reference(&self, _path: &Path, _target: &Path) -> Result<(), FsError> {
        // On real disk the referenced tree is already in place.
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn write_creates_parent_directories() {
        let dir = tempdir().unwrap();
        let fs = DiskFileSystem;
        let path = dir.path().join("a/b/c.txt");

        fs.write(&path, b"hello").unwrap();
        assert!(fs.exists(&path));
        assert_eq!(fs.read_to_string(&path).unwrap(), "hello");
    }

    #[test]
    fn read_missing_file_is_not_found() {
        let dir = tempdir().unwrap();
        let fs = DiskFileSystem;
        let err = fs.read(&dir.path().join("missing")).unwrap_err();
        assert!(matches!(err, FsError::NotFound { .. }));
    }

    #[test]
    fn scan_dir_lists_sorted_immediate_entries() {
        let dir = tempdir().unwrap();
        let fs = DiskFileSystem;
        fs.write(&dir.path().join("b.txt"), b"").unwrap();
        fs.write(&dir.path().join("a.txt"), b"").unwrap();
        fs.mkdir(&dir.path().join("sub")).unwrap();
        fs.write(&dir.path().join("sub/nested.txt"), b"").unwrap();

        let entries = fs.scan_dir(dir.path()).unwrap();
        let names: Vec<_> = entries
            .iter()
            .map(|e| e.path.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["a.txt", "b.txt", "sub"]);
        assert!(entries[2].is_dir);
    }

    #[test]
    fn scan_dir_on_file_is_not_a_directory() {
        let dir = tempdir().unwrap();
        let fs = DiskFileSystem;
        let file = dir.path().join("f.txt");
        fs.write(&file, b"").unwrap();
        assert!(matches!(
            fs.scan_dir(&file),
            Err(FsError::NotADirectory { .. })
        ));
    }

    #[test]
    fn json_round_trip() {
        let dir = tempdir().unwrap();
        let fs = DiskFileSystem;
        let path = dir.path().join("data.json");
        let value = serde_json::json!({"name": "p", "subModules": ["a"]});
        fs.write_json(&path, &value).unwrap();
        assert_eq!(fs.read_json(&path).unwrap(), value);
    }
}
