//! Middleware module
//!
//! Discovers middleware files along a resolved route, loads their handlers
//! and runs them as one chain in front of the terminal render.

mod builtin;
mod chain;
mod discover;
mod loader;
mod registry;

pub use builtin::{CountViews, LogRequest, Redirect, Respond, SetHeader};
pub use chain::{FnHandler, Handler, Next, NoopTerminal, Terminal};
pub use discover::MiddlewareDiscoverer;
pub use loader::{compose, loader_for, parse_unit, AlwaysFreshLoader, CachedLoader, HandlerLoader};
pub use registry::{options, HandlerFactory, HandlerRegistry, HandlerSpec};
