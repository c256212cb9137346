//! HTTP helpers shared by the request handler and the static file transfer

pub mod cache;
pub mod response;

pub use cache::{etag_for, is_not_modified, DEFAULT_CACHE_CONTROL};
pub use response::{build_400_response, build_413_response, INTERNAL_ERROR_BODY, NOT_FOUND_BODY};
