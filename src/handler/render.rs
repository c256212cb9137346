//! Terminal action
//!
//! Runs once every middleware has called through. `.ejs` targets are
//! rendered; anything else is sent as a static file. Failures fall back to
//! the not-found and error routes, and finally to fixed plain-text bodies.

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use hyper::StatusCode;
use serde_json::{json, Map, Value};
use std::path::Path;

use super::context::RequestContext;
use super::static_files;
use crate::config::AppState;
use crate::error::{RouterError, RouterResult};
use crate::http;
use crate::middleware::Terminal;
use crate::routing::TEMPLATE_EXT;
use crate::template::TemplateError;

pub fn is_template(path: &Path) -> bool {
    path.to_str().is_some_and(|p| p.ends_with(TEMPLATE_EXT))
}

/// Renders pages and error pages for one application.
pub struct PageRenderer<'a> {
    state: &'a AppState,
}

impl<'a> PageRenderer<'a> {
    pub const fn new(state: &'a AppState) -> Self {
        Self { state }
    }

    async fn render(&self, path: &Path, ctx: &RequestContext) -> Result<String, TemplateError> {
        let context = template_context(ctx).await;
        self.state.renderer.render(path, &context).await
    }

    /// Render `ctx.file_path`, falling back to the not-found or error route.
    pub async fn render_page(&self, ctx: &mut RequestContext) {
        let target = ctx.file_path.clone();
        match self.render(&target, ctx).await {
            Ok(html) => {
                ctx.response.send_html(html);
            }
            Err(e) if e.is_not_found() => self.render_not_found(ctx).await,
            Err(e) => self.render_error(ctx, &e.into()).await,
        }
    }

    async fn render_not_found(&self, ctx: &mut RequestContext) {
        if ctx.response.is_sent() {
            return;
        }
        let not_found = self.state.not_found_path();
        ctx.response.set_status(StatusCode::NOT_FOUND);
        if ctx.file_path == not_found {
            ctx.response.send_text(http::NOT_FOUND_BODY);
            return;
        }

        ctx.file_path.clone_from(&not_found);
        match self.render(&not_found, ctx).await {
            Ok(html) => {
                ctx.response.send_html(html);
            }
            Err(e) if e.is_not_found() => {
                ctx.response.send_text(http::NOT_FOUND_BODY);
            }
            Err(e) => self.render_error(ctx, &e.into()).await,
        }
    }

    /// Log `error` and answer 500 through the error route. Never fails.
    pub async fn render_error(&self, ctx: &mut RequestContext, error: &RouterError) {
        tracing::error!(
            path = %ctx.path(),
            file = %ctx.file_path.display(),
            error = %error,
            "request failed"
        );
        if ctx.response.is_sent() {
            return;
        }

        ctx.response.set_status(StatusCode::INTERNAL_SERVER_ERROR);
        let error_page = self.state.error_path();
        match self.render(&error_page, ctx).await {
            Ok(html) => {
                ctx.response.send_html(html);
            }
            Err(e) => {
                if !e.is_not_found() {
                    tracing::error!(error = %e, "error route failed to render");
                }
                ctx.response.send_text(http::INTERNAL_ERROR_BODY);
            }
        }
    }
}

impl Terminal for PageRenderer<'_> {
    fn finish<'a>(&'a self, ctx: &'a mut RequestContext) -> BoxFuture<'a, RouterResult<()>> {
        async move {
            if ctx.response.is_sent() {
                return Ok(());
            }
            if is_template(&ctx.file_path) {
                self.render_page(ctx).await;
                Ok(())
            } else {
                static_files::send_file(self.state.fs.as_ref(), ctx)
            }
        }
        .boxed()
    }
}

/// Values visible to templates: `params`, `plugins`, `locals`, `request`
/// and the current `status`.
pub async fn template_context(ctx: &RequestContext) -> Value {
    let headers: Map<String, Value> = ctx
        .headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_string(), Value::from(v)))
        })
        .collect();

    json!({
        "params": ctx.params,
        "plugins": ctx.plugins.to_value().await,
        "locals": ctx.locals,
        "request": {
            "method": ctx.method.as_str(),
            "path": ctx.path(),
            "query": query_map(ctx.uri.query()),
            "headers": headers,
        },
        "status": ctx.response.status().as_u16(),
    })
}

/// Raw `a=1&b` pairs; values are not percent-decoded.
fn query_map(query: Option<&str>) -> Map<String, Value> {
    query
        .unwrap_or_default()
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((key, value)) => (key.to_string(), Value::from(value)),
            None => (pair.to_string(), Value::from("")),
        })
        .collect()
}
