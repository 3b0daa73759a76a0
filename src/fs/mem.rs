//! In-memory filesystem with optional read-through fallback.
//!
//! Used standalone as a pure in-memory filesystem, or layered over a real
//! one as the dry-run shadow: reads fall through to the fallback, writes
//! and deletes stay in the overlay. Deletes are tombstoned so a shadowed
//! real file reads as gone without being touched.

use super::{DirEntry, FileSystem};
use crate::errors::FsError;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

#[derive(Debug, Clone)]
enum Node {
    File(Vec<u8>),
    Dir,
    /// Lazy mirror of a real directory tree rooted at the target path.
    Reference(PathBuf),
    Tombstone,
}

#[derive(Default)]
pub struct MemFileSystem {
    nodes: RwLock<BTreeMap<PathBuf, Node>>,
    fallback: Option<Arc<dyn FileSystem>>,
}

impl MemFileSystem {
    /// A pure in-memory filesystem.
    pub fn new() -> Self {
        Self::default()
    }

    /// A read-through shadow: reads fall through to `fallback`, writes are
    /// captured in the overlay.
    pub fn shadowing(fallback: Arc<dyn FileSystem>) -> Self {
        Self {
            nodes: RwLock::new(BTreeMap::new()),
            fallback: Some(fallback),
        }
    }

    /// Whether `path` or any ancestor carries a tombstone in the overlay.
    fn shadow_deleted(&self, path: &Path) -> bool {
        let nodes = self.nodes.read().unwrap();
        let mut cursor = Some(path);
        while let Some(p) = cursor {
            if matches!(nodes.get(p), Some(Node::Tombstone)) {
                return true;
            }
            cursor = p.parent();
        }
        false
    }

    /// The reference node governing `path`, if one of its ancestors (or the
    /// path itself) mirrors a real tree: returns the redirected real path.
    fn resolve_reference(&self, path: &Path) -> Option<PathBuf> {
        let nodes = self.nodes.read().unwrap();
        let mut cursor = Some(path);
        while let Some(p) = cursor {
            if let Some(Node::Reference(target)) = nodes.get(p) {
                let suffix = path.strip_prefix(p).ok()?;
                return Some(target.join(suffix));
            }
            cursor = p.parent();
        }
        None
    }

    fn fallback_read(&self, path: &Path) -> Result<Vec<u8>, FsError> {
        match &self.fallback {
            Some(fs) => fs.read(path),
            None => Err(FsError::NotFound {
                path: path.to_path_buf(),
            }),
        }
    }
}

impl FileSystem for MemFileSystem {
    fn read(&self, path: &Path) -> Result<Vec<u8>, FsError> {
        if self.shadow_deleted(path) {
            return Err(FsError::NotFound {
                path: path.to_path_buf(),
            });
        }
        {
            let nodes = self.nodes.read().unwrap();
            match nodes.get(path) {
                Some(Node::File(bytes)) => return Ok(bytes.clone()),
                Some(Node::Dir) => {
                    return Err(FsError::Io {
                        path: path.to_path_buf(),
                        source: std::io::Error::new(
                            std::io::ErrorKind::IsADirectory,
                            "is a directory",
                        ),
                    });
                }
                _ => {}
            }
        }
        if let Some(real) = self.resolve_reference(path) {
            return self.fallback_read(&real);
        }
        self.fallback_read(path)
    }

    fn write(&self, path: &Path, contents: &[u8]) -> Result<(), FsError> {
        let mut nodes = self.nodes.write().unwrap();
        // Writing revives a tombstoned path and implies its parents.
        let mut cursor = path.parent();
        while let Some(p) = cursor {
            if matches!(nodes.get(p), Some(Node::Dir) | Some(Node::Reference(_))) {
                break;
            }
            nodes.insert(p.to_path_buf(), Node::Dir);
            cursor = p.parent();
        }
        nodes.insert(path.to_path_buf(), Node::File(contents.to_vec()));
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        if self.shadow_deleted(path) {
            return false;
        }
        {
            let nodes = self.nodes.read().unwrap();
            match nodes.get(path) {
                Some(Node::Tombstone) => return false,
                Some(_) => return true,
                None => {}
            }
        }
        if let Some(real) = self.resolve_reference(path) {
            return self
                .fallback
                .as_ref()
                .is_some_and(|fs| fs.exists(&real));
        }
        self.fallback.as_ref().is_some_and(|fs| fs.exists(path))
    }

    fn mkdir(&self, path: &Path) -> Result<(), FsError> {
        let mut nodes = self.nodes.write().unwrap();
        let mut cursor = Some(path);
        while let Some(p) = cursor {
            if matches!(nodes.get(p), Some(Node::Dir) | Some(Node::Reference(_))) {
                break;
            }
            nodes.insert(p.to_path_buf(), Node::Dir);
            cursor = p.parent();
        }
        Ok(())
    }

    fn delete(&self, path: &Path) -> Result<(), FsError> {
        if !self.exists(path) {
            return Err(FsError::NotFound {
                path: path.to_path_buf(),
            });
        }
        let mut nodes = self.nodes.write().unwrap();
        nodes.insert(path.to_path_buf(), Node::Tombstone);
        Ok(())
    }

    fn rmdir(&self, path: &Path) -> Result<(), FsError> {
        if !self.exists(path) {
            return Err(FsError::NotFound {
                path: path.to_path_buf(),
            });
        }
        let mut nodes = self.nodes.write().unwrap();
        let children: Vec<PathBuf> = nodes
            .range(path.to_path_buf()..)
            .take_while(|(p, _)| p.starts_with(path))
            .map(|(p, _)| p.clone())
            .collect();
        for child in children {
            nodes.remove(&child);
        }
        nodes.insert(path.to_path_buf(), Node::Tombstone);
        Ok(())
    }

    fn scan_dir(&self, path: &Path) -> Result<Vec<DirEntry>, FsError> {
        if self.shadow_deleted(path) {
            return Err(FsError::NotFound {
                path: path.to_path_buf(),
            });
        }

        let mut merged: BTreeMap<PathBuf, bool> = BTreeMap::new();

        // Fallback or referenced real entries first, overlay wins below.
        if let Some(real) = self.resolve_reference(path) {
            if let Some(fs) = &self.fallback {
                for entry in fs.scan_dir(&real)? {
                    let name = entry.path.file_name().map(|n| n.to_os_string());
                    if let Some(name) = name {
                        merged.insert(path.join(name), entry.is_dir);
                    }
                }
            }
        } else if let Some(fs) = &self.fallback {
            if let Ok(entries) = fs.scan_dir(path) {
                for entry in entries {
                    merged.insert(entry.path, entry.is_dir);
                }
            }
        }

        let nodes = self.nodes.read().unwrap();
        let mut known_dir = matches!(
            nodes.get(path),
            Some(Node::Dir) | Some(Node::Reference(_))
        );
        known_dir |= !merged.is_empty();
        for (p, node) in nodes.range(path.to_path_buf()..) {
            if !p.starts_with(path) {
                break;
            }
            if p.parent() != Some(path) {
                continue;
            }
            known_dir = true;
            match node {
                Node::Tombstone => {
                    merged.remove(p);
                }
                Node::File(_) => {
                    merged.insert(p.clone(), false);
                }
                Node::Dir | Node::Reference(_) => {
                    merged.insert(p.clone(), true);
                }
            }
        }
        drop(nodes);

        if !known_dir && !self.fallback.as_ref().is_some_and(|fs| fs.exists(path)) {
            return Err(FsError::NotADirectory {
                path: path.to_path_buf(),
            });
        }

        Ok(merged
            .into_iter()
            .filter(|(p, _)| !self.shadow_deleted(p))
            .map(|(p, is_dir)| DirEntry { path: p, is_dir })
            .collect())
    }

    fn write_reference(&self, path: &Path, target: &Path) -> Result<(), FsError> {
        let mut nodes = self.nodes.write().unwrap();
        nodes.insert(path.to_path_buf(), Node::Reference(target.to_path_buf()));
        Ok(())
    }
}
