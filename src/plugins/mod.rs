//! Plugin registry
//!
//! The plugins folder is scanned once at startup. Every `.toml` or `.json`
//! file becomes a value named after its stem, folders become nested
//! namespaces, and `index.*` entries merge into their parent namespace.

mod store;

pub use store::{KvStore, StoreError};

use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PluginError {
    #[error("failed to read plugin {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse plugin {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },
}

/// Immutable plugin namespace shared by every request.
#[derive(Default)]
pub struct PluginRegistry {
    values: Map<String, Value>,
    store: Option<Arc<KvStore>>,
}

impl PluginRegistry {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_values(values: Map<String, Value>) -> Self {
        Self {
            values,
            store: None,
        }
    }

    #[must_use]
    pub fn with_store(mut self, store: Arc<KvStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Scan `path`. A missing folder yields an empty registry.
    pub fn load(path: &Path, store: Option<Arc<KvStore>>) -> Result<Self, PluginError> {
        if !path.is_dir() {
            tracing::warn!(path = %path.display(), "plugins folder not found, no plugins loaded");
            return Ok(Self { values: Map::new(), store });
        }
        let values = scan_dir(path)?;
        tracing::info!(count = values.len(), path = %path.display(), "plugins loaded");
        Ok(Self { values, store })
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn store(&self) -> Option<&Arc<KvStore>> {
        self.store.as_ref()
    }

    /// Template view: every plugin, plus `store` as a snapshot of the store.
    pub async fn to_value(&self) -> Value {
        let mut values = self.values.clone();
        if let Some(store) = &self.store {
            values.insert("store".to_string(), Value::Object(store.snapshot().await));
        }
        Value::Object(values)
    }
}

fn scan_dir(dir: &Path) -> Result<Map<String, Value>, PluginError> {
    let read_err = |source| PluginError::Io {
        path: dir.to_path_buf(),
        source,
    };
    let mut entries: Vec<PathBuf> = fs::read_dir(dir)
        .map_err(read_err)?
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .collect();
    entries.sort();

    let mut namespace = Map::new();
    for path in entries {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if name.starts_with('.') {
            continue;
        }

        if path.is_dir() {
            let nested = scan_dir(&path)?;
            if name == "index" {
                namespace.extend(nested);
            } else {
                namespace.insert(name.to_string(), Value::Object(nested));
            }
            continue;
        }

        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        let Some(value) = parse_plugin(&path)? else {
            tracing::debug!(path = %path.display(), "skipping non-plugin file");
            continue;
        };
        if stem == "index" {
            match value {
                Value::Object(props) => namespace.extend(props),
                _ => tracing::warn!(path = %path.display(), "index plugin is not an object, skipped"),
            }
        } else {
            namespace.insert(stem.to_string(), value);
        }
    }
    Ok(namespace)
}

fn parse_plugin(path: &Path) -> Result<Option<Value>, PluginError> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or_default();
    if ext != "toml" && ext != "json" {
        return Ok(None);
    }
    let content = fs::read_to_string(path).map_err(|source| PluginError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let parse_err = |message: String| PluginError::Parse {
        path: path.to_path_buf(),
        message,
    };

    let value = if ext == "toml" {
        let table: toml::Table = toml::from_str(&content).map_err(|e| parse_err(e.to_string()))?;
        serde_json::to_value(table).map_err(|e| parse_err(e.to_string()))?
    } else {
        serde_json::from_str(&content).map_err(|e| parse_err(e.to_string()))?
    };
    Ok(Some(value))
}
