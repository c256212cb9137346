// Configuration types

use serde::Deserialize;
use std::net::SocketAddr;
use std::path::PathBuf;

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_ROUTES_PATH: &str = "routes";
pub const DEFAULT_PLUGINS_PATH: &str = "plugins";
pub const DEFAULT_NOT_FOUND_ROUTE: &str = "404.ejs";
pub const DEFAULT_ERROR_ROUTE: &str = "500.ejs";
pub const DEFAULT_MAX_BODY_SIZE: u64 = 10 * 1024 * 1024;
pub const DEFAULT_LOG_LEVEL: &str = "info";
pub const DEFAULT_ACCESS_LOG_FORMAT: &str = "combined";

/// Process settings, fixed at startup.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub host: String,
    pub port: u16,

    /// Root of the routes tree
    pub routes_path: PathBuf,
    /// Folder scanned into the plugin registry
    pub plugins_path: PathBuf,
    /// Keep loaded middleware for the process lifetime
    pub cache_middleware: bool,
    /// Rendered with 404 when nothing matches, relative to `routes_path`
    pub not_found_route: String,
    /// Rendered with 500 when a request fails, relative to `routes_path`
    pub error_route: String,

    /// Key-value store file; defaults to `<plugins_path>/store/.data/data.json`
    #[serde(default)]
    pub store_file: Option<PathBuf>,

    /// Requests with a larger body get 413
    pub max_body_size: u64,

    pub log_level: String,
    pub access_log: bool,
    /// `combined`, `common`, `json` or a `$variable` pattern
    pub access_log_format: String,
    #[serde(default)]
    pub access_log_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            routes_path: PathBuf::from(DEFAULT_ROUTES_PATH),
            plugins_path: PathBuf::from(DEFAULT_PLUGINS_PATH),
            cache_middleware: false,
            not_found_route: DEFAULT_NOT_FOUND_ROUTE.to_string(),
            error_route: DEFAULT_ERROR_ROUTE.to_string(),
            store_file: None,
            max_body_size: DEFAULT_MAX_BODY_SIZE,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            access_log: false,
            access_log_format: DEFAULT_ACCESS_LOG_FORMAT.to_string(),
            access_log_file: None,
        }
    }
}

impl Config {
    pub fn socket_addr(&self) -> Result<SocketAddr, String> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| format!("invalid listen address {}:{}: {e}", self.host, self.port))
    }

    pub fn not_found_path(&self) -> PathBuf {
        self.routes_path.join(&self.not_found_route)
    }

    pub fn error_path(&self) -> PathBuf {
        self.routes_path.join(&self.error_route)
    }
}
