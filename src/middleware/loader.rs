//! Middleware loading
//!
//! A loader turns one middleware file into its handlers. [`AlwaysFreshLoader`]
//! re-reads the file on every request so edits apply without a restart;
//! [`CachedLoader`] keeps the first successful result for the process
//! lifetime.

use dashmap::DashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::chain::Handler;
use super::registry::{HandlerRegistry, HandlerSpec};
use crate::error::{RouterError, RouterResult};
use crate::routing::RouteFs;

pub trait HandlerLoader: Send + Sync {
    fn load(&self, path: &Path) -> RouterResult<Vec<Arc<dyn Handler>>>;
}

/// Parse a middleware file.
///
/// Either a single handler:
///
/// ```toml
/// use = "set_header"
/// header = "Cache-Control"
/// value = "no-store"
/// ```
///
/// or an ordered list:
///
/// ```toml
/// [[handlers]]
/// use = "log_request"
///
/// [[handlers]]
/// use = "count_views"
/// ```
pub fn parse_unit(source: &str) -> Result<Vec<HandlerSpec>, String> {
    let mut table: toml::Table = toml::from_str(source).map_err(|e| e.message().to_string())?;

    match (table.remove("use"), table.remove("handlers")) {
        (Some(_), Some(_)) => Err("`use` and `[[handlers]]` cannot be combined".to_string()),
        (Some(name), None) => Ok(vec![spec_from(name, table)?]),
        (None, Some(toml::Value::Array(items))) => {
            if let Some(key) = table.keys().next() {
                return Err(format!("unexpected key `{key}` next to `[[handlers]]`"));
            }
            items
                .into_iter()
                .enumerate()
                .map(|(i, item)| match item {
                    toml::Value::Table(mut options) => {
                        let name = options
                            .remove("use")
                            .ok_or_else(|| format!("handlers[{i}] is missing `use`"))?;
                        spec_from(name, options)
                    }
                    _ => Err(format!("handlers[{i}] must be a table")),
                })
                .collect()
        }
        (None, Some(_)) => Err("`handlers` must be an array of tables".to_string()),
        (None, None) if table.is_empty() => Ok(Vec::new()),
        (None, None) => Err("missing `use`".to_string()),
    }
}

fn spec_from(name: toml::Value, options: toml::Table) -> Result<HandlerSpec, String> {
    match name {
        toml::Value::String(name) => Ok(HandlerSpec { name, options }),
        _ => Err("`use` must be a string".to_string()),
    }
}

/// Reads and builds the handlers of a file on every call.
pub struct AlwaysFreshLoader {
    fs: Arc<dyn RouteFs>,
    registry: Arc<HandlerRegistry>,
}

impl AlwaysFreshLoader {
    pub fn new(fs: Arc<dyn RouteFs>, registry: Arc<HandlerRegistry>) -> Self {
        Self { fs, registry }
    }
}

impl HandlerLoader for AlwaysFreshLoader {
    fn load(&self, path: &Path) -> RouterResult<Vec<Arc<dyn Handler>>> {
        let fail = |reason: String| RouterError::middleware_load(path, reason);
        let bytes = self.fs.read(path).map_err(|e| fail(e.to_string()))?;
        let source = String::from_utf8(bytes).map_err(|_| fail("file is not UTF-8".to_string()))?;

        parse_unit(&source)
            .map_err(fail)?
            .iter()
            .map(|spec| self.registry.build(spec).map_err(fail))
            .collect()
    }
}

/// Memoizes handlers per file. Failed loads are retried on the next request.
pub struct CachedLoader {
    inner: AlwaysFreshLoader,
    cache: DashMap<PathBuf, Vec<Arc<dyn Handler>>>,
}

impl CachedLoader {
    pub fn new(inner: AlwaysFreshLoader) -> Self {
        Self {
            inner,
            cache: DashMap::new(),
        }
    }

    pub fn cached(&self) -> usize {
        self.cache.len()
    }
}

impl HandlerLoader for CachedLoader {
    fn load(&self, path: &Path) -> RouterResult<Vec<Arc<dyn Handler>>> {
        if let Some(handlers) = self.cache.get(path) {
            return Ok(handlers.clone());
        }
        let handlers = self.inner.load(path)?;
        self.cache.insert(path.to_path_buf(), handlers.clone());
        Ok(handlers)
    }
}

/// Pick the loading strategy for the `cache_middleware` setting.
pub fn loader_for(
    cache: bool,
    fs: Arc<dyn RouteFs>,
    registry: Arc<HandlerRegistry>,
) -> Box<dyn HandlerLoader> {
    let fresh = AlwaysFreshLoader::new(fs, registry);
    if cache {
        Box::new(CachedLoader::new(fresh))
    } else {
        Box::new(fresh)
    }
}

/// Load every discovered file and flatten the handlers in discovery order.
pub fn compose(loader: &dyn HandlerLoader, paths: &[PathBuf]) -> RouterResult<Vec<Arc<dyn Handler>>> {
    let mut chain = Vec::new();
    for path in paths {
        chain.extend(loader.load(path)?);
    }
    Ok(chain)
}
