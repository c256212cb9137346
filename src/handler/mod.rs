//! Request handler module
//!
//! Turns an HTTP request into a [`RequestContext`], routes it through the
//! middleware chain and renders the result.

pub mod context;
mod render;
mod router;
pub mod static_files;

pub use context::{RequestContext, ResponseState};
pub use render::{is_template, template_context, PageRenderer};
pub use router::{dispatch, handle_request};
