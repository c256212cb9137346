// Key-value store plugin
// A single JSON object persisted to disk, rewritten on every set

use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::sync::RwLock;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to access store file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("store file {} is not a JSON object: {message}", path.display())]
    Corrupt { path: PathBuf, message: String },
}

/// JSON-object store backed by one file.
///
/// Concurrent writers are not coordinated beyond the in-memory lock; the
/// last completed write wins on disk.
pub struct KvStore {
    path: PathBuf,
    data: RwLock<Map<String, Value>>,
}

impl KvStore {
    /// Open the store at `path`, creating `{}` (and parent folders) if absent.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let data = match tokio::fs::read_to_string(&path).await {
            Ok(content) => parse_object(&path, &content)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    tokio::fs::create_dir_all(parent)
                        .await
                        .map_err(|source| io_error(&path, source))?;
                }
                tokio::fs::write(&path, "{}")
                    .await
                    .map_err(|source| io_error(&path, source))?;
                tracing::info!(path = %path.display(), "created key-value store");
                Map::new()
            }
            Err(source) => return Err(io_error(&path, source)),
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    /// Default location under the plugins folder.
    pub fn default_path(plugins_path: &Path) -> PathBuf {
        plugins_path.join("store").join(".data").join("data.json")
    }

    pub async fn get(&self, key: &str) -> Option<Value> {
        self.data.read().await.get(key).cloned()
    }

    pub async fn set(&self, key: impl Into<String>, value: Value) -> Result<(), StoreError> {
        let content = {
            let mut data = self.data.write().await;
            data.insert(key.into(), value);
            serde_json::to_string_pretty(&*data).map_err(|e| StoreError::Corrupt {
                path: self.path.clone(),
                message: e.to_string(),
            })?
        };

        tokio::fs::write(&self.path, content)
            .await
            .map_err(|source| io_error(&self.path, source))
    }

    pub async fn snapshot(&self) -> Map<String, Value> {
        self.data.read().await.clone()
    }
}

fn parse_object(path: &Path, content: &str) -> Result<Map<String, Value>, StoreError> {
    if content.trim().is_empty() {
        return Ok(Map::new());
    }
    match serde_json::from_str(content) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(StoreError::Corrupt {
            path: path.to_path_buf(),
            message: "top-level value must be an object".to_string(),
        }),
        Err(e) => Err(StoreError::Corrupt {
            path: path.to_path_buf(),
            message: e.to_string(),
        }),
    }
}

fn io_error(path: &Path, source: std::io::Error) -> StoreError {
    StoreError::Io {
        path: path.to_path_buf(),
        source,
    }
}
