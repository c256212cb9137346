//! Static file transfer
//!
//! Sends a non-template route target as-is with a guessed content type and
//! an `ETag` for conditional requests.

use hyper::header::{CACHE_CONTROL, ETAG};
use hyper::StatusCode;
use std::io;
use std::path::Path;

use crate::error::RouterResult;
use crate::handler::RequestContext;
use crate::http::{self, cache};
use crate::routing::RouteFs;

/// Content type for `path`; text types are marked UTF-8.
pub fn content_type_for(path: &Path) -> String {
    let mime = mime_guess::from_path(path).first_or_octet_stream();
    if mime.type_() == mime_guess::mime::TEXT && mime.get_param(mime_guess::mime::CHARSET).is_none() {
        format!("{mime}; charset=utf-8")
    } else {
        mime.to_string()
    }
}

/// Send `ctx.file_path`. A file that vanished since resolution becomes a
/// plain 404; other read failures are errors.
pub fn send_file(fs: &dyn RouteFs, ctx: &mut RequestContext) -> RouterResult<()> {
    if ctx.response.is_sent() {
        return Ok(());
    }

    let data = match fs.read(&ctx.file_path) {
        Ok(data) => data,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            tracing::debug!(file = %ctx.file_path.display(), "static file disappeared");
            ctx.response.set_status(StatusCode::NOT_FOUND);
            ctx.response.send_text(http::NOT_FOUND_BODY);
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    let etag = cache::etag_for(&data);
    ctx.response.set_header(ETAG.as_str(), &etag)?;
    if ctx.response.header(CACHE_CONTROL.as_str()).is_none() {
        ctx.response
            .set_header(CACHE_CONTROL.as_str(), cache::DEFAULT_CACHE_CONTROL)?;
    }

    if cache::is_not_modified(ctx.header("if-none-match"), &etag) {
        ctx.response.set_status(StatusCode::NOT_MODIFIED);
        ctx.response.send_empty();
        return Ok(());
    }

    let content_type = content_type_for(&ctx.file_path);
    ctx.response.send(&content_type, data);
    Ok(())
}
