//! Conditional request helpers
//!
//! Static files carry a content-hash `ETag`; a matching `If-None-Match`
//! turns the response into a bodyless 304.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// `Cache-Control` for static files unless a middleware set its own.
pub const DEFAULT_CACHE_CONTROL: &str = "public, max-age=0";

/// Quoted hash of `content`, e.g. `"1f3a9c"`.
pub fn etag_for(content: &[u8]) -> String {
    let mut hasher = DefaultHasher::new();
    content.hash(&mut hasher);
    format!("\"{:x}\"", hasher.finish())
}

/// Whether an `If-None-Match` value (a list, or `*`) covers `etag`.
///
/// Weak validators (`W/"..."`) compare equal to their strong form.
pub fn is_not_modified(if_none_match: Option<&str>, etag: &str) -> bool {
    if_none_match.is_some_and(|header| {
        header.split(',').map(str::trim).any(|candidate| {
            candidate == "*" || candidate.strip_prefix("W/").unwrap_or(candidate) == etag
        })
    })
}
