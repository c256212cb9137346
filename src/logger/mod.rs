//! Logger module
//!
//! Diagnostics are `tracing` events filtered by `RUST_LOG` or the configured
//! level. The access log and the console route line are plain text written
//! outside of `tracing` so their format stays stable.

mod format;
pub mod writer;

pub use format::AccessLogEntry;

use hyper::Method;
use std::net::SocketAddr;
use std::path::Path;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;

const BLUE: &str = "\x1b[34m";
const CYAN: &str = "\x1b[36m";
const GRAY: &str = "\x1b[90m";
const RESET: &str = "\x1b[0m";

/// Install the tracing subscriber and the access log writer.
///
/// Call once at startup; a second subscriber install is ignored.
pub fn init(config: &Config) -> std::io::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("fsrouter={}", config.log_level)));
    if tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .is_err()
    {
        tracing::debug!("tracing subscriber already installed");
    }

    if config.access_log {
        writer::init(config.access_log_file.as_deref())?;
    }
    Ok(())
}

pub fn log_server_start(addr: &SocketAddr, config: &Config) {
    tracing::info!(
        %addr,
        routes = %config.routes_path.display(),
        plugins = %config.plugins_path.display(),
        cache_middleware = config.cache_middleware,
        "server started"
    );
    println!("{CYAN}Server is up: http://localhost:{}{RESET}", addr.port());
}

/// Console line printed by the `log_request` handler: `METHOD path << file`.
pub fn route_line(method: &Method, path: &str, file: &Path) -> String {
    format!("{BLUE}{method}{RESET} {path} {GRAY}<< {}{RESET}", file.display())
}

pub fn log_route(method: &Method, path: &str, file: &Path) {
    println!("{}", route_line(method, path, file));
}

pub fn log_access(entry: &AccessLogEntry, format: &str) {
    writer::write_access(&entry.format(format));
}
