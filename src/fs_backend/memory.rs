//! In-memory filesystem backend used by the unit-test suite so tests
//! never touch real disk, the way the teacher leans on `tempfile` /
//! `assert_fs` for isolation one layer further than we need here.

use super::{FileInfo, FileKind, FileSystem};
use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::SystemTime;

#[derive(Debug, Clone)]
enum Node {
    File { content: Vec<u8>, mode: u32 },
    Directory { mode: u32 },
    Symlink { target: String },
}

#[derive(Default)]
pub struct MemoryFileSystem {
    nodes: Mutex<BTreeMap<PathBuf, Node>>,
}

fn not_found(path: &Path) -> io::Error {
    io::Error::new(
        io::ErrorKind::NotFound,
        format!("{} does not exist", path.display()),
    )
}

impl MemoryFileSystem {
    pub fn new() -> Self {
        Self {
            nodes: Mutex::new(BTreeMap::new()),
        }
    }

    /// Seed a file directly, bypassing the engine, to set up test fixtures.
    pub fn seed_file(&self, path: impl Into<PathBuf>, content: impl Into<Vec<u8>>, mode: u32) {
        self.nodes.lock().unwrap().insert(
            path.into(),
            Node::File {
                content: content.into(),
                mode,
            },
        );
    }

    pub fn seed_dir(&self, path: impl Into<PathBuf>, mode: u32) {
        self.nodes
            .lock()
            .unwrap()
            .insert(path.into(), Node::Directory { mode });
    }
}

impl FileSystem for MemoryFileSystem {
    fn stat(&self, path: &Path) -> io::Result<Option<FileInfo>> {
        let nodes = self.nodes.lock().unwrap();
        let Some(node) = nodes.get(path) else {
            return Ok(None);
        };
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let info = match node {
            Node::File { content, mode } => FileInfo {
                name,
                size: content.len() as u64,
                mode: *mode,
                modified: SystemTime::now(),
                kind: FileKind::File,
            },
            Node::Directory { mode } => FileInfo {
                name,
                size: 0,
                mode: *mode,
                modified: SystemTime::now(),
                kind: FileKind::Directory,
            },
            Node::Symlink { .. } => FileInfo {
                name,
                size: 0,
                mode: 0o777,
                modified: SystemTime::now(),
                kind: FileKind::Symlink,
            },
        };
        Ok(Some(info))
    }

    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        let nodes = self.nodes.lock().unwrap();
        match nodes.get(path) {
            Some(Node::File { content, .. }) => Ok(content.clone()),
            Some(_) => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} is not a file", path.display()),
            )),
            None => Err(not_found(path)),
        }
    }

    fn readlink(&self, path: &Path) -> io::Result<String> {
        let nodes = self.nodes.lock().unwrap();
        match nodes.get(path) {
            Some(Node::Symlink { target }) => Ok(target.clone()),
            Some(_) => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} is not a symlink", path.display()),
            )),
            None => Err(not_found(path)),
        }
    }

    fn write_file(&self, path: &Path, bytes: &[u8], mode: u32) -> io::Result<()> {
        let mut nodes = self.nodes.lock().unwrap();
        nodes.insert(
            path.to_path_buf(),
            Node::File {
                content: bytes.to_vec(),
                mode,
            },
        );
        Ok(())
    }

    fn mkdir_all(&self, path: &Path, mode: u32) -> io::Result<()> {
        let mut nodes = self.nodes.lock().unwrap();
        let mut current = PathBuf::new();
        for component in path.components() {
            current.push(component);
            nodes
                .entry(current.clone())
                .or_insert(Node::Directory { mode });
        }
        Ok(())
    }

    fn remove(&self, path: &Path) -> io::Result<()> {
        let mut nodes = self.nodes.lock().unwrap();
        if nodes.remove(path).is_none() {
            return Err(not_found(path));
        }
        Ok(())
    }

    fn remove_all(&self, path: &Path) -> io::Result<()> {
        let mut nodes = self.nodes.lock().unwrap();
        if !nodes.contains_key(path) {
            return Err(not_found(path));
        }
        let to_remove: Vec<PathBuf> = nodes
            .keys()
            .filter(|p| *p == path || p.starts_with(path))
            .cloned()
            .collect();
        for p in to_remove {
            nodes.remove(&p);
        }
        Ok(())
    }

    fn rename(&self, old: &Path, new: &Path) -> io::Result<()> {
        let mut nodes = self.nodes.lock().unwrap();
        let moved: Vec<(PathBuf, Node)> = nodes
            .iter()
            .filter(|(p, _)| *p == old || p.starts_with(old))
            .map(|(p, n)| (p.clone(), n.clone()))
            .collect();
        if moved.is_empty() {
            return Err(not_found(old));
        }
        for (p, n) in moved {
            nodes.remove(&p);
            let rel = p.strip_prefix(old).unwrap_or(Path::new(""));
            let dest = if rel.as_os_str().is_empty() {
                new.to_path_buf()
            } else {
                new.join(rel)
            };
            nodes.insert(dest, n);
        }
        Ok(())
    }

    fn symlink(&self, target: &str, link: &Path) -> io::Result<()> {
        let mut nodes = self.nodes.lock().unwrap();
        nodes.insert(
            link.to_path_buf(),
            Node::Symlink {
                target: target.to_string(),
            },
        );
        Ok(())
    }

    fn walk_files(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        let nodes = self.nodes.lock().unwrap();
        let mut out = Vec::new();
        for (p, node) in nodes.iter() {
            if matches!(node, Node::File { .. }) && (p == path || p.starts_with(path)) {
                let rel = p.strip_prefix(path).unwrap_or(p).to_path_buf();
                out.push(rel);
            }
        }
        Ok(out)
    }
}
