//! Route resolution
//!
//! Walks the routes tree one directory per request segment. At each level
//! an exact entry wins over a dynamic one, and a dynamic one over the most
//! recently seen catch-all. A catch-all always ends the walk.
//!
//! Falling back to a remembered catch-all keeps the dynamic parameters bound
//! above it (`/[user]/[...path]` yields both `user` and `path`) rather than
//! replacing the map with the catch-all binding alone. Bindings made below
//! the catch-all during the failed descent are dropped.

use std::path::{Path, PathBuf};

use super::fs::RouteFs;
use super::index::{DirectoryEntry, DirectoryIndex, INDEX_FILE};
use super::params::RouteParams;
use super::segments::split_path;

/// Target file and parameters of a successful resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRoute {
    pub file_path: PathBuf,
    pub params: RouteParams,
}

impl ResolvedRoute {
    pub fn new(file_path: impl Into<PathBuf>, params: RouteParams) -> Self {
        Self {
            file_path: file_path.into(),
            params,
        }
    }
}

/// Outcome of resolving one request path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteOutcome {
    Found(ResolvedRoute),
    /// No entry matched and no catch-all was available.
    NotFound,
}

impl RouteOutcome {
    fn from_catch_all(candidate: Option<ResolvedRoute>) -> Self {
        candidate.map_or(Self::NotFound, Self::Found)
    }
}

/// Resolver over a routes root.
pub struct Resolver<'a> {
    fs: &'a dyn RouteFs,
    root: &'a Path,
}

impl<'a> Resolver<'a> {
    pub fn new(fs: &'a dyn RouteFs, root: &'a Path) -> Self {
        Self { fs, root }
    }

    pub fn resolve(&self, request_path: &str) -> RouteOutcome {
        let segments = split_path(request_path);
        let mut file_path = self.root.to_path_buf();
        let mut params = RouteParams::new();
        // At most one remembered catch-all; a deeper one replaces it.
        let mut catch_all: Option<ResolvedRoute> = None;

        for (i, segment) in segments.iter().enumerate() {
            let is_last = i + 1 == segments.len();
            let index = self.index(&file_path);

            if let Some((entry, param)) = index.catch_all() {
                catch_all = self.catch_all_candidate(&file_path, entry, param, &segments[i..], &params);
            }

            if let Some(entry) = index.exact(segment, is_last) {
                file_path.push(&entry.name);
                continue;
            }

            if let Some((entry, param)) = index.dynamic(is_last) {
                params.insert(param, *segment);
                file_path.push(&entry.name);
                continue;
            }

            return RouteOutcome::from_catch_all(catch_all);
        }

        if self.fs.is_dir(&file_path) {
            let index_file = file_path.join(INDEX_FILE);
            if self.fs.is_file(&index_file) {
                return RouteOutcome::Found(ResolvedRoute::new(index_file, params));
            }
            return RouteOutcome::from_catch_all(catch_all);
        }

        if self.fs.is_file(&file_path) {
            RouteOutcome::Found(ResolvedRoute::new(file_path, params))
        } else {
            RouteOutcome::NotFound
        }
    }

    /// Unreadable directories (permissions, a file reached mid-path) are
    /// treated as empty.
    fn index(&self, dir: &Path) -> DirectoryIndex {
        DirectoryIndex::read(self.fs, dir).unwrap_or_else(|err| {
            tracing::debug!(dir = %dir.display(), error = %err, "directory unreadable during resolution");
            DirectoryIndex::default()
        })
    }

    /// Candidate for a catch-all entry found in `dir`.
    ///
    /// Parameters bound so far are kept and the catch-all parameter takes the
    /// remaining segments. A catch-all folder only counts when it holds an
    /// index template.
    fn catch_all_candidate(
        &self,
        dir: &Path,
        entry: &DirectoryEntry,
        param: &str,
        rest: &[&str],
        params: &RouteParams,
    ) -> Option<ResolvedRoute> {
        let mut file_path = dir.join(&entry.name);
        if self.fs.is_dir(&file_path) {
            file_path.push(INDEX_FILE);
            if !self.fs.is_file(&file_path) {
                return None;
            }
        }
        let mut params = params.clone();
        params.insert(param, rest.join("/"));
        Some(ResolvedRoute::new(file_path, params))
    }
}
