//! Middleware discovery
//!
//! For a target such as `routes/admin/posts.ejs` the candidates are, in order:
//!
//! ```text
//! routes.middleware.toml
//! routes/middleware.toml
//! routes/admin.middleware.toml
//! routes/admin/middleware.toml
//! routes/admin/posts.middleware.toml
//! routes/admin/posts/middleware.toml
//! ```
//!
//! Only files that exist are returned.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::routing::{RouteFs, MIDDLEWARE_FILE, MIDDLEWARE_SUFFIX, TEMPLATE_EXT};

pub struct MiddlewareDiscoverer<'a> {
    fs: &'a dyn RouteFs,
    root: PathBuf,
}

impl<'a> MiddlewareDiscoverer<'a> {
    pub fn new(fs: &'a dyn RouteFs, root: &Path) -> Self {
        Self {
            fs,
            root: root.components().collect(),
        }
    }

    /// Existing middleware files for `target`, most general first.
    pub fn discover(&self, target: &Path) -> Vec<PathBuf> {
        self.prefixes(target)
            .into_iter()
            .flat_map(|prefix| [route_scoped(&prefix), prefix.join(MIDDLEWARE_FILE)])
            .filter(|candidate| self.fs.is_file(candidate))
            .collect()
    }

    /// Root, then every path below it down to `target` without `.ejs`.
    fn prefixes(&self, target: &Path) -> Vec<PathBuf> {
        let target: PathBuf = target.components().collect();
        let Ok(relative) = target.strip_prefix(&self.root) else {
            return vec![self.root.clone()];
        };

        let names: Vec<&str> = relative
            .components()
            .filter_map(|c| c.as_os_str().to_str())
            .collect();
        let mut prefixes = Vec::with_capacity(names.len() + 1);
        let mut current = self.root.clone();
        prefixes.push(current.clone());

        for (i, name) in names.iter().copied().enumerate() {
            let name = if i + 1 == names.len() {
                name.strip_suffix(TEMPLATE_EXT).unwrap_or(name)
            } else {
                name
            };
            current.push(name);
            prefixes.push(current.clone());
        }
        prefixes
    }
}

fn route_scoped(prefix: &Path) -> PathBuf {
    let mut name = OsString::from(prefix.as_os_str());
    name.push(MIDDLEWARE_SUFFIX);
    PathBuf::from(name)
}
