//! Per-request state shared by middleware and the terminal action

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::{HeaderName, HeaderValue, CONTENT_LENGTH, CONTENT_TYPE, LOCATION};
use hyper::{HeaderMap, Method, Response, StatusCode, Uri};
use serde_json::{Map, Value};
use std::path::PathBuf;
use std::sync::Arc;

use crate::error::{RouterError, RouterResult};
use crate::plugins::PluginRegistry;
use crate::routing::{ResolvedRoute, RouteParams};

/// Everything a handler can read or change while a request moves through
/// its middleware chain.
pub struct RequestContext {
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
    pub body: Bytes,
    /// Resolved target; the not-found route when resolution failed.
    pub file_path: PathBuf,
    pub params: RouteParams,
    /// Values handed to templates as `locals`.
    pub locals: Map<String, Value>,
    pub plugins: Arc<PluginRegistry>,
    pub response: ResponseState,
}

impl RequestContext {
    pub fn new(
        method: Method,
        uri: Uri,
        headers: HeaderMap,
        body: Bytes,
        plugins: Arc<PluginRegistry>,
    ) -> Self {
        Self {
            method,
            uri,
            headers,
            body,
            file_path: PathBuf::new(),
            params: RouteParams::new(),
            locals: Map::new(),
            plugins,
            response: ResponseState::default(),
        }
    }

    pub fn path(&self) -> &str {
        self.uri.path()
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn bind_route(&mut self, route: ResolvedRoute) {
        self.file_path = route.file_path;
        self.params = route.params;
    }
}

/// Response under construction.
///
/// Setting a body marks the response as sent; later writers must check
/// [`ResponseState::is_sent`] and back off.
#[derive(Debug, Default)]
pub struct ResponseState {
    status: StatusCode,
    headers: HeaderMap,
    body: Option<Bytes>,
}

impl ResponseState {
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    pub fn set_status(&mut self, status: StatusCode) {
        self.status = status;
    }

    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn set_header(&mut self, name: &str, value: &str) -> RouterResult<()> {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| RouterError::InvalidHeader(name.to_string()))?;
        let value =
            HeaderValue::from_str(value).map_err(|_| RouterError::InvalidHeader(name.to_string()))?;
        self.insert_header(name, value);
        Ok(())
    }

    /// Set an already validated header.
    pub fn insert_header(&mut self, name: HeaderName, value: HeaderValue) {
        self.headers.insert(name, value);
    }

    pub const fn is_sent(&self) -> bool {
        self.body.is_some()
    }

    pub const fn body(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }

    /// Set the body. `content_type` is only applied when no handler set one.
    ///
    /// Returns `false` without touching anything if a body was already sent.
    pub fn send(&mut self, content_type: &str, body: impl Into<Bytes>) -> bool {
        if self.is_sent() {
            return false;
        }
        if !self.headers.contains_key(CONTENT_TYPE) {
            if let Ok(value) = HeaderValue::from_str(content_type) {
                self.headers.insert(CONTENT_TYPE, value);
            }
        }
        self.body = Some(body.into());
        true
    }

    pub fn send_html(&mut self, html: impl Into<Bytes>) -> bool {
        self.send("text/html; charset=utf-8", html)
    }

    pub fn send_text(&mut self, text: impl Into<Bytes>) -> bool {
        self.send("text/plain; charset=utf-8", text)
    }

    /// End the response with an empty body (304 and friends).
    pub fn send_empty(&mut self) -> bool {
        if self.is_sent() {
            return false;
        }
        self.body = Some(Bytes::new());
        true
    }

    pub fn redirect(&mut self, status: StatusCode, location: &str) -> RouterResult<bool> {
        if self.is_sent() {
            return Ok(false);
        }
        let value = HeaderValue::from_str(location)
            .map_err(|_| RouterError::InvalidHeader(LOCATION.to_string()))?;
        self.status = status;
        self.headers.insert(LOCATION, value);
        Ok(self.send_text(format!("Redirecting to {location}")))
    }

    /// Finish into a hyper response; HEAD keeps headers and drops the body.
    pub fn into_response(self, is_head: bool) -> Response<Full<Bytes>> {
        let body = self.body.unwrap_or_default();
        let mut headers = self.headers;
        let body = if is_head {
            headers.insert(CONTENT_LENGTH, HeaderValue::from(body.len()));
            Bytes::new()
        } else {
            body
        };

        let mut response = Response::new(Full::new(body));
        *response.status_mut() = self.status;
        *response.headers_mut() = headers;
        response
    }
}

#[cfg(test)]
pub(crate) fn test_context(method: Method, path: &str) -> RequestContext {
    RequestContext::new(
        method,
        path.parse().unwrap(),
        HeaderMap::new(),
        Bytes::new(),
        Arc::new(PluginRegistry::empty()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    #[test]
    fn test_first_send_wins() {
        let mut res = ResponseState::default();
        assert!(res.send_html("<p>one</p>"));
        assert!(!res.send_html("<p>two</p>"));
        assert_eq!(res.body().unwrap(), &Bytes::from("<p>one</p>"));
    }

    #[test]
    fn test_handler_content_type_is_kept() {
        let mut res = ResponseState::default();
        res.set_header("content-type", "application/json").unwrap();
        res.send_html("{}");
        assert_eq!(res.header("content-type"), Some("application/json"));
    }

    #[test]
    fn test_invalid_header_rejected() {
        let mut res = ResponseState::default();
        assert!(matches!(
            res.set_header("bad header", "x"),
            Err(RouterError::InvalidHeader(_))
        ));
        assert!(res.set_header("x-ok", "line\nbreak").is_err());
    }

    #[test]
    fn test_redirect_sets_location() {
        let mut res = ResponseState::default();
        assert!(res.redirect(StatusCode::FOUND, "/login").unwrap());
        assert_eq!(res.status(), StatusCode::FOUND);
        assert_eq!(res.header("location"), Some("/login"));
        assert!(res.is_sent());
    }

    #[tokio::test]
    async fn test_head_response_has_no_body() {
        let mut res = ResponseState::default();
        res.send_text("hello");
        let response = res.into_response(true);
        assert_eq!(response.headers()["content-length"], "5");
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert!(body.is_empty());
    }

    #[test]
    fn test_bind_route() {
        let mut ctx = test_context(Method::GET, "/shoes/42");
        ctx.bind_route(ResolvedRoute::new(
            "routes/[category]/[id].ejs",
            [("category", "shoes"), ("id", "42")].into_iter().collect(),
        ));
        assert_eq!(ctx.path(), "/shoes/42");
        assert_eq!(ctx.params.get("id"), Some("42"));
        assert_eq!(ctx.file_path, PathBuf::from("routes/[category]/[id].ejs"));
    }
}
