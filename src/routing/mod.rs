//! Routing module
//!
//! The routes directory is the routing table:
//! - `name`, `name.ejs` match a segment literally
//! - `[param]`, `[param].ejs` bind one segment
//! - `[...param]`, `[...param].ejs` bind every remaining segment
//! - `(group)` folders and middleware files are never matched
//! - `index.ejs` is the default file of a directory

pub mod fs;
mod index;
mod params;
mod resolver;
mod segments;

pub use fs::{DiskFs, MemoryFs, RouteFs};
pub use index::{
    classify, DirectoryEntry, DirectoryIndex, EntryKind, INDEX_FILE, MIDDLEWARE_FILE,
    MIDDLEWARE_SUFFIX, TEMPLATE_EXT,
};
pub use params::RouteParams;
pub use resolver::{ResolvedRoute, Resolver, RouteOutcome};
pub use segments::split_path;
