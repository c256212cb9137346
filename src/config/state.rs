// Application state module
// Everything a request needs, built once at startup and shared by reference

use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;

use super::types::Config;
use crate::middleware::{loader_for, HandlerLoader, HandlerRegistry};
use crate::plugins::{KvStore, PluginRegistry};
use crate::routing::{DiskFs, RouteFs};
use crate::template::{EjsRenderer, TemplateRenderer};

pub struct AppState {
    pub config: Config,
    pub fs: Arc<dyn RouteFs>,
    pub plugins: Arc<PluginRegistry>,
    pub loader: Box<dyn HandlerLoader>,
    pub renderer: Arc<dyn TemplateRenderer>,
}

impl AppState {
    /// Wire collaborators over an arbitrary filesystem.
    pub fn new(
        config: Config,
        fs: Arc<dyn RouteFs>,
        plugins: PluginRegistry,
        registry: HandlerRegistry,
    ) -> Self {
        let loader = loader_for(config.cache_middleware, fs.clone(), Arc::new(registry));
        let renderer = Arc::new(EjsRenderer::new(fs.clone()));
        Self {
            config,
            fs,
            plugins: Arc::new(plugins),
            loader,
            renderer,
        }
    }

    /// Production wiring: disk routes, scanned plugins, and the key-value
    /// store when a plugins folder or an explicit store file exists.
    pub async fn build(
        config: Config,
        registry: HandlerRegistry,
    ) -> Result<Self, Box<dyn Error + Send + Sync>> {
        if !config.routes_path.is_dir() {
            tracing::warn!(path = %config.routes_path.display(), "routes folder not found");
        }

        let store = match store_path(&config) {
            Some(path) => Some(Arc::new(KvStore::open(path).await?)),
            None => None,
        };
        let plugins = PluginRegistry::load(&config.plugins_path, store)?;
        Ok(Self::new(config, Arc::new(DiskFs), plugins, registry))
    }

    pub fn not_found_path(&self) -> PathBuf {
        self.config.not_found_path()
    }

    pub fn error_path(&self) -> PathBuf {
        self.config.error_path()
    }
}

fn store_path(config: &Config) -> Option<PathBuf> {
    match &config.store_file {
        Some(path) => Some(path.clone()),
        None if config.plugins_path.is_dir() => Some(KvStore::default_path(&config.plugins_path)),
        None => None,
    }
}
