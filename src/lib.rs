//! fsrouter
//!
//! A web router whose routing table is a directory tree. Files under the
//! routes folder become URLs, `[name]` entries capture path segments,
//! `[...name]` entries capture the rest of the path, and `middleware.toml`
//! files wrap every route at or below them.

pub mod config;
pub mod error;
pub mod handler;
pub mod http;
pub mod logger;
pub mod middleware;
pub mod plugins;
pub mod routing;
pub mod server;
pub mod template;

pub use error::{RouterError, RouterResult};
