// Built-in middleware handlers
// Request logging, header rewriting, view counting, redirects, canned responses

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use hyper::header::{HeaderName, HeaderValue};
use hyper::StatusCode;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

use super::chain::{Handler, Next};
use super::registry::{options, HandlerRegistry};
use crate::error::{RouterError, RouterResult};
use crate::handler::RequestContext;

pub(super) fn register_all(registry: &mut HandlerRegistry) {
    registry.register("log_request", |_: &toml::Table| {
        Ok(Arc::new(LogRequest) as Arc<dyn Handler>)
    });
    registry.register("set_header", |opts: &toml::Table| {
        SetHeader::from_options(opts).map(|h| Arc::new(h) as Arc<dyn Handler>)
    });
    registry.register("count_views", |opts: &toml::Table| {
        CountViews::from_options(opts).map(|h| Arc::new(h) as Arc<dyn Handler>)
    });
    registry.register("redirect", |opts: &toml::Table| {
        Redirect::from_options(opts).map(|h| Arc::new(h) as Arc<dyn Handler>)
    });
    registry.register("respond", |opts: &toml::Table| {
        Respond::from_options(opts).map(|h| Arc::new(h) as Arc<dyn Handler>)
    });
}

fn status_code(code: u16) -> Result<StatusCode, String> {
    StatusCode::from_u16(code).map_err(|_| format!("invalid status code {code}"))
}

/// Prints `METHOD path << file` for every request.
pub struct LogRequest;

impl Handler for LogRequest {
    fn name(&self) -> &str {
        "log_request"
    }

    fn handle<'a>(
        &'a self,
        ctx: &'a mut RequestContext,
        next: Next<'a>,
    ) -> BoxFuture<'a, RouterResult<()>> {
        crate::logger::log_route(&ctx.method, ctx.path(), &ctx.file_path);
        next.run(ctx)
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SetHeaderOptions {
    header: String,
    value: String,
}

/// Sets one response header, then continues.
pub struct SetHeader {
    header: HeaderName,
    value: HeaderValue,
}

impl SetHeader {
    /// Bad names and values are rejected when the file loads.
    fn from_options(table: &toml::Table) -> Result<Self, String> {
        let opts: SetHeaderOptions = options(table)?;
        let header = HeaderName::from_bytes(opts.header.as_bytes())
            .map_err(|_| format!("invalid header name `{}`", opts.header))?;
        let value = HeaderValue::from_str(&opts.value)
            .map_err(|_| format!("invalid value for header `{header}`"))?;
        Ok(Self { header, value })
    }
}

impl Handler for SetHeader {
    fn name(&self) -> &str {
        "set_header"
    }

    fn handle<'a>(
        &'a self,
        ctx: &'a mut RequestContext,
        next: Next<'a>,
    ) -> BoxFuture<'a, RouterResult<()>> {
        async move {
            ctx.response
                .insert_header(self.header.clone(), self.value.clone());
            next.run(ctx).await
        }
        .boxed()
    }
}

fn default_views_key() -> String {
    "views".to_string()
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CountViewsOptions {
    #[serde(default = "default_views_key")]
    key: String,
}

/// Increments a counter in the key-value store, then continues.
pub struct CountViews {
    key: String,
}

impl CountViews {
    fn from_options(table: &toml::Table) -> Result<Self, String> {
        let opts: CountViewsOptions = options(table)?;
        Ok(Self { key: opts.key })
    }
}

impl Handler for CountViews {
    fn name(&self) -> &str {
        "count_views"
    }

    fn handle<'a>(
        &'a self,
        ctx: &'a mut RequestContext,
        next: Next<'a>,
    ) -> BoxFuture<'a, RouterResult<()>> {
        async move {
            let store = ctx
                .plugins
                .store()
                .cloned()
                .ok_or_else(|| RouterError::handler(self.name(), "key-value store is not configured"))?;
            let current = store.get(&self.key).await.and_then(|v| v.as_u64()).unwrap_or(0);
            store.set(self.key.clone(), Value::from(current + 1)).await?;
            next.run(ctx).await
        }
        .boxed()
    }
}

const fn default_redirect_status() -> u16 {
    302
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RedirectOptions {
    to: String,
    #[serde(default = "default_redirect_status")]
    status: u16,
}

/// Ends the request with a redirect.
pub struct Redirect {
    to: String,
    status: StatusCode,
}

impl Redirect {
    fn from_options(table: &toml::Table) -> Result<Self, String> {
        let opts: RedirectOptions = options(table)?;
        let status = status_code(opts.status)?;
        if !status.is_redirection() {
            return Err(format!("status {} is not a redirect", opts.status));
        }
        Ok(Self { to: opts.to, status })
    }
}

impl Handler for Redirect {
    fn name(&self) -> &str {
        "redirect"
    }

    fn handle<'a>(
        &'a self,
        ctx: &'a mut RequestContext,
        _next: Next<'a>,
    ) -> BoxFuture<'a, RouterResult<()>> {
        async move { ctx.response.redirect(self.status, &self.to).map(|_| ()) }.boxed()
    }
}

const fn default_respond_status() -> u16 {
    200
}

fn default_content_type() -> String {
    "text/plain; charset=utf-8".to_string()
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RespondOptions {
    #[serde(default = "default_respond_status")]
    status: u16,
    #[serde(default)]
    body: String,
    #[serde(default = "default_content_type")]
    content_type: String,
}

/// Ends the request with a fixed response.
pub struct Respond {
    status: StatusCode,
    body: String,
    content_type: String,
}

impl Respond {
    fn from_options(table: &toml::Table) -> Result<Self, String> {
        let opts: RespondOptions = options(table)?;
        Ok(Self {
            status: status_code(opts.status)?,
            body: opts.body,
            content_type: opts.content_type,
        })
    }
}

impl Handler for Respond {
    fn name(&self) -> &str {
        "respond"
    }

    fn handle<'a>(
        &'a self,
        ctx: &'a mut RequestContext,
        _next: Next<'a>,
    ) -> BoxFuture<'a, RouterResult<()>> {
        async move {
            if !ctx.response.is_sent() {
                ctx.response.set_status(self.status);
                ctx.response.send(&self.content_type, self.body.clone());
            }
            Ok(())
        }
        .boxed()
    }
}
