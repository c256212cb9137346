//! Request dispatch
//!
//! Entry point for every HTTP request: body limits, route resolution,
//! middleware discovery and the handler chain, then the access log.

use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::{Body, Bytes};
use hyper::{Method, Request, Response, StatusCode};
use std::convert::Infallible;
use std::error::Error as StdError;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use super::context::RequestContext;
use super::render::PageRenderer;
use crate::config::AppState;
use crate::error::RouterResult;
use crate::http;
use crate::logger::{self, AccessLogEntry};
use crate::middleware::{compose, MiddlewareDiscoverer, Next};
use crate::routing::{RouteOutcome, Resolver};

/// Serve one request. Every failure becomes a response.
pub async fn handle_request<B>(
    req: Request<B>,
    state: Arc<AppState>,
    peer: SocketAddr,
) -> Result<Response<Full<Bytes>>, Infallible>
where
    B: Body,
    B::Error: Into<Box<dyn StdError + Send + Sync>>,
{
    let started = Instant::now();
    let max_body_size = state.config.max_body_size;

    if let Some(resp) = check_body_size(&req, max_body_size) {
        return Ok(resp);
    }

    let (parts, body) = req.into_parts();
    let limit = usize::try_from(max_body_size).unwrap_or(usize::MAX);
    let body = match Limited::new(body, limit).collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) if e.is::<LengthLimitError>() => {
            tracing::warn!(max_body_size, "request body too large");
            return Ok(http::build_413_response());
        }
        Err(e) => {
            tracing::warn!(error = %e, "failed to read request body");
            return Ok(http::build_400_response());
        }
    };

    let mut entry = state.config.access_log.then(|| {
        let mut entry = AccessLogEntry::new(peer.ip().to_string(), parts.method.as_str(), parts.uri.path());
        entry.query = parts.uri.query().map(ToString::to_string);
        entry.http_version = version_label(parts.version).to_string();
        entry.referer = header_string(&parts.headers, "referer");
        entry.user_agent = header_string(&parts.headers, "user-agent");
        entry
    });

    let ctx = RequestContext::new(parts.method, parts.uri, parts.headers, body, state.plugins.clone());
    let (response, file) = dispatch(&state, ctx).await;

    if let Some(entry) = entry.as_mut() {
        entry.status = response.status().as_u16();
        entry.body_bytes = usize::try_from(response.body().size_hint().exact().unwrap_or(0)).unwrap_or(0);
        entry.file = Some(file);
        entry.request_time_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);
        logger::log_access(entry, &state.config.access_log_format);
    }

    Ok(response)
}

/// Resolve, run the middleware chain and render.
///
/// Also returns the file that ended up handling the request.
pub async fn dispatch(state: &AppState, mut ctx: RequestContext) -> (Response<Full<Bytes>>, String) {
    let is_head = ctx.method == Method::HEAD;
    let root = state.config.routes_path.as_path();

    match Resolver::new(state.fs.as_ref(), root).resolve(ctx.path()) {
        RouteOutcome::Found(route) => ctx.bind_route(route),
        RouteOutcome::NotFound => {
            tracing::debug!(path = %ctx.path(), "no route matched");
            ctx.file_path = state.not_found_path();
            ctx.response.set_status(StatusCode::NOT_FOUND);
        }
    }

    let pages = PageRenderer::new(state);
    if let Err(e) = run_chain(state, &pages, &mut ctx).await {
        pages.render_error(&mut ctx, &e).await;
    }
    if !ctx.response.is_sent() {
        tracing::debug!(path = %ctx.path(), "chain ended without a response body");
    }

    let file = ctx.file_path.display().to_string();
    (ctx.response.into_response(is_head), file)
}

async fn run_chain(
    state: &AppState,
    pages: &PageRenderer<'_>,
    ctx: &mut RequestContext,
) -> RouterResult<()> {
    let paths = MiddlewareDiscoverer::new(state.fs.as_ref(), &state.config.routes_path)
        .discover(&ctx.file_path);
    let chain = compose(state.loader.as_ref(), &paths)?;
    Next::new(&chain, pages).run(ctx).await
}

/// Reject early when `Content-Length` already exceeds the limit.
fn check_body_size<B>(req: &Request<B>, max_body_size: u64) -> Option<Response<Full<Bytes>>> {
    let value = req.headers().get(hyper::header::CONTENT_LENGTH)?;
    match value.to_str().ok().and_then(|v| v.parse::<u64>().ok()) {
        Some(size) if size > max_body_size => {
            tracing::warn!(size, max_body_size, "request body too large");
            Some(http::build_413_response())
        }
        Some(_) => None,
        None => {
            tracing::debug!("invalid Content-Length, relying on streaming limit");
            None
        }
    }
}

fn header_string(headers: &hyper::HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(ToString::to_string)
}

fn version_label(version: hyper::Version) -> &'static str {
    match version {
        hyper::Version::HTTP_09 => "0.9",
        hyper::Version::HTTP_10 => "1.0",
        hyper::Version::HTTP_2 => "2",
        hyper::Version::HTTP_3 => "3",
        _ => "1.1",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::middleware::HandlerRegistry;
    use crate::plugins::PluginRegistry;
    use crate::routing::MemoryFs;

    fn state(fs: MemoryFs) -> (Arc<MemoryFs>, AppState) {
        let fs = Arc::new(fs);
        let state = AppState::new(
            Config::default(),
            fs.clone(),
            PluginRegistry::empty(),
            HandlerRegistry::with_builtins(),
        );
        (fs, state)
    }

    async fn get(state: &AppState, method: Method, path: &str) -> (StatusCode, String, String) {
        let req = Request::builder()
            .method(method)
            .uri(path)
            .body(Full::new(Bytes::new()))
            .unwrap();
        let (parts, _) = req.into_parts();
        let ctx = RequestContext::new(
            parts.method,
            parts.uri,
            parts.headers,
            Bytes::new(),
            state.plugins.clone(),
        );
        let (response, file) = dispatch(state, ctx).await;
        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, String::from_utf8(body.to_vec()).unwrap(), file)
    }

    fn site() -> MemoryFs {
        MemoryFs::new()
            .with_file("routes/index.ejs", "home")
            .with_file("routes/404.ejs", "missing <%= request.path %> (<%= status %>)")
            .with_file("routes/500.ejs", "broken")
            .with_file("routes/[category]/[id].ejs", "<%= params.category %>/<%= params.id %>")
            .with_file("routes/docs/[...slug].ejs", "doc <%= params.slug %>")
            .with_file("routes/static/app.css", "body{}")
    }

    #[tokio::test]
    async fn test_renders_resolved_template() {
        let (_, state) = state(site());
        let (status, body, file) = get(&state, Method::GET, "/shoes/42").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "shoes/42");
        assert_eq!(file, "routes/[category]/[id].ejs");
    }

    #[tokio::test]
    async fn test_catch_all_route() {
        let (_, state) = state(site());
        let (_, body, _) = get(&state, Method::GET, "/docs/a/b/c").await;
        assert_eq!(body, "doc a/b/c");
    }

    #[tokio::test]
    async fn test_not_found_renders_404_route() {
        let (_, state) = state(site());
        let (status, body, file) = get(&state, Method::GET, "/nope/deeper/still").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, "missing /nope/deeper/still (404)");
        assert_eq!(file, "routes/404.ejs");
    }

    #[tokio::test]
    async fn test_missing_404_route_falls_back_to_text() {
        let (fs, state) = state(site());
        fs.remove("routes/404.ejs");
        let (status, body, _) = get(&state, Method::GET, "/a/b/c").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, "404 Not Found");
    }

    #[tokio::test]
    async fn test_template_error_renders_500_route() {
        let (fs, state) = state(site());
        fs.add_file("routes/bad.ejs", "<% oops %>");
        let (status, body, _) = get(&state, Method::GET, "/bad").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, "broken");
    }

    #[tokio::test]
    async fn test_failing_500_route_falls_back_to_text() {
        let (fs, state) = state(site());
        fs.add_file("routes/bad.ejs", "<%= undefinedThing %>");
        fs.add_file("routes/500.ejs", "<%= alsoUndefined %>");
        let (status, body, _) = get(&state, Method::GET, "/bad").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, "500 Internal Server Error");
    }

    #[tokio::test]
    async fn test_middleware_runs_root_to_leaf() {
        let (fs, state) = state(site());
        fs.add_file("routes/admin/posts.ejs", "posts");
        fs.add_file("routes/middleware.toml", "use = \"set_header\"\nheader = \"x-trail\"\nvalue = \"root\"");
        fs.add_file(
            "routes/admin.middleware.toml",
            "use = \"set_header\"\nheader = \"x-trail\"\nvalue = \"admin-file\"",
        );
        fs.add_file(
            "routes/admin/middleware.toml",
            "[[handlers]]\nuse = \"set_header\"\nheader = \"x-trail\"\nvalue = \"admin-folder\"\n[[handlers]]\nuse = \"set_header\"\nheader = \"x-last\"\nvalue = \"yes\"",
        );

        let req = Request::builder().uri("/admin/posts").body(Full::new(Bytes::new())).unwrap();
        let response = handle_request(req, Arc::new(state), "127.0.0.1:9".parse().unwrap())
            .await
            .unwrap();
        assert_eq!(response.headers()["x-trail"], "admin-folder");
        assert_eq!(response.headers()["x-last"], "yes");
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(body.as_ref(), b"posts");
    }

    #[tokio::test]
    async fn test_short_circuit_skips_later_handlers_and_render() {
        let (fs, state) = state(site());
        fs.add_file("routes/admin/index.ejs", "secret");
        fs.add_file("routes/admin/middleware.toml", "use = \"redirect\"\nto = \"/login\"");
        fs.add_file(
            "routes/admin/index.middleware.toml",
            "[[handlers]]\nuse = \"set_header\"\nheader = \"x-after\"\nvalue = \"ran\"\n[[handlers]]\nuse = \"respond\"\nbody = \"later\"",
        );

        let req = Request::builder().uri("/admin").body(Full::new(Bytes::new())).unwrap();
        let response = handle_request(req, Arc::new(state), "127.0.0.1:9".parse().unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(response.headers()["location"], "/login");
        assert!(response.headers().get("x-after").is_none());
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(body.as_ref(), b"Redirecting to /login");
    }

    #[tokio::test]
    async fn test_middleware_load_failure_is_request_scoped() {
        let (fs, state) = state(site());
        fs.add_file("routes/[category]/middleware.toml", "use = \"does_not_exist\"");
        let (status, body, _) = get(&state, Method::GET, "/shoes/42").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, "broken");

        let (status, body, _) = get(&state, Method::GET, "/").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "home");
    }

    #[tokio::test]
    async fn test_middleware_edits_apply_without_restart() {
        let (fs, state) = state(site());
        fs.add_file("routes/index.middleware.toml", "use = \"respond\"\nbody = \"v1\"");
        assert_eq!(get(&state, Method::GET, "/").await.1, "v1");
        fs.add_file("routes/index.middleware.toml", "use = \"respond\"\nbody = \"v2\"");
        assert_eq!(get(&state, Method::GET, "/").await.1, "v2");
    }

    #[tokio::test]
    async fn test_static_file_and_head() {
        let (_, state) = state(site());
        let (status, body, _) = get(&state, Method::GET, "/static/app.css").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "body{}");

        let (status, body, _) = get(&state, Method::HEAD, "/static/app.css").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn test_all_methods_route_the_same() {
        let (_, state) = state(site());
        let (status, body, _) = get(&state, Method::DELETE, "/shoes/1").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "shoes/1");
    }

    #[tokio::test]
    async fn test_traversal_stays_in_routes() {
        let (fs, state) = state(site());
        fs.add_file("secret.txt", "top secret");
        let (status, body, _) = get(&state, Method::GET, "/../secret.txt").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(!body.contains("top secret"));
    }

    #[tokio::test]
    async fn test_oversized_body_is_413() {
        let (_, mut state) = state(site());
        state.config.max_body_size = 4;
        let req = Request::builder()
            .method(Method::POST)
            .uri("/")
            .body(Full::new(Bytes::from("too long")))
            .unwrap();
        let response = handle_request(req, Arc::new(state), "127.0.0.1:9".parse().unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }
}
