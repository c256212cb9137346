//! Filesystem capability used by routing, middleware and rendering
//!
//! Everything that touches the routes tree goes through [`RouteFs`], so the
//! whole request path can run against [`MemoryFs`] in tests.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

/// Directory listing and file access over a routes tree.
pub trait RouteFs: Send + Sync {
    /// Names of the entries directly inside `dir`, in any order.
    fn read_dir(&self, dir: &Path) -> io::Result<Vec<String>>;

    fn is_dir(&self, path: &Path) -> bool;

    fn is_file(&self, path: &Path) -> bool;

    fn read(&self, path: &Path) -> io::Result<Vec<u8>>;

    fn exists(&self, path: &Path) -> bool {
        self.is_dir(path) || self.is_file(path)
    }
}

/// The real filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiskFs;

impl RouteFs for DiskFs {
    fn read_dir(&self, dir: &Path) -> io::Result<Vec<String>> {
        fs::read_dir(dir)?
            .map(|entry| entry.map(|e| e.file_name().to_string_lossy().into_owned()))
            .collect()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        fs::read(path)
    }
}

#[derive(Debug, Clone)]
enum Node {
    Dir,
    File(Vec<u8>),
}

/// In-memory routes tree.
///
/// Adding a file creates its parent directories. The tree can be changed
/// through a shared reference, which lets tests mutate it between requests.
#[derive(Debug, Default)]
pub struct MemoryFs {
    nodes: RwLock<BTreeMap<PathBuf, Node>>,
}

impl MemoryFs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`MemoryFs::add_file`].
    #[must_use]
    pub fn with_file(self, path: impl AsRef<Path>, contents: impl AsRef<[u8]>) -> Self {
        self.add_file(path, contents);
        self
    }

    /// Builder form of [`MemoryFs::add_dir`].
    #[must_use]
    pub fn with_dir(self, path: impl AsRef<Path>) -> Self {
        self.add_dir(path);
        self
    }

    pub fn add_file(&self, path: impl AsRef<Path>, contents: impl AsRef<[u8]>) {
        let path = path.as_ref();
        let mut nodes = self.nodes.write().unwrap_or_else(PoisonError::into_inner);
        insert_ancestors(&mut nodes, path);
        nodes.insert(path.to_path_buf(), Node::File(contents.as_ref().to_vec()));
    }

    pub fn add_dir(&self, path: impl AsRef<Path>) {
        let path = path.as_ref();
        let mut nodes = self.nodes.write().unwrap_or_else(PoisonError::into_inner);
        insert_ancestors(&mut nodes, path);
        nodes.insert(path.to_path_buf(), Node::Dir);
    }

    /// Remove `path` and everything below it.
    pub fn remove(&self, path: impl AsRef<Path>) {
        let path = path.as_ref();
        let mut nodes = self.nodes.write().unwrap_or_else(PoisonError::into_inner);
        nodes.retain(|key, _| !key.starts_with(path));
    }

    fn node(&self, path: &Path) -> Option<Node> {
        self.nodes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(path)
            .cloned()
    }
}

fn insert_ancestors(nodes: &mut BTreeMap<PathBuf, Node>, path: &Path) {
    for ancestor in path.ancestors().skip(1) {
        if ancestor.as_os_str().is_empty() {
            break;
        }
        nodes.insert(ancestor.to_path_buf(), Node::Dir);
    }
}

impl RouteFs for MemoryFs {
    fn read_dir(&self, dir: &Path) -> io::Result<Vec<String>> {
        let nodes = self.nodes.read().unwrap_or_else(PoisonError::into_inner);
        match nodes.get(dir) {
            Some(Node::Dir) => Ok(nodes
                .keys()
                .filter(|key| key.parent() == Some(dir))
                .filter_map(|key| key.file_name())
                .map(|name| name.to_string_lossy().into_owned())
                .collect()),
            Some(Node::File(_)) => Err(io::Error::other(format!(
                "not a directory: {}",
                dir.display()
            ))),
            None => Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("no such directory: {}", dir.display()),
            )),
        }
    }

    fn is_dir(&self, path: &Path) -> bool {
        matches!(self.node(path), Some(Node::Dir))
    }

    fn is_file(&self, path: &Path) -> bool {
        matches!(self.node(path), Some(Node::File(_)))
    }

    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        match self.node(path) {
            Some(Node::File(contents)) => Ok(contents),
            Some(Node::Dir) => Err(io::Error::other(format!(
                "is a directory: {}",
                path.display()
            ))),
            None => Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("no such file: {}", path.display()),
            )),
        }
    }
}
