//! Handler chain
//!
//! A chain is an ordered slice of handlers followed by one terminal action.
//! Each handler decides whether to continue by calling [`Next::run`]; not
//! calling it ends the chain and whatever the handler wrote is the response.

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use std::sync::Arc;

use crate::error::RouterResult;
use crate::handler::RequestContext;

/// One step of a middleware pipeline.
pub trait Handler: Send + Sync {
    /// Name used in logs and errors.
    fn name(&self) -> &str;

    fn handle<'a>(
        &'a self,
        ctx: &'a mut RequestContext,
        next: Next<'a>,
    ) -> BoxFuture<'a, RouterResult<()>>;
}

/// The action run once every handler has passed control along.
pub trait Terminal: Send + Sync {
    fn finish<'a>(&'a self, ctx: &'a mut RequestContext) -> BoxFuture<'a, RouterResult<()>>;
}

/// Remainder of a chain.
#[derive(Clone, Copy)]
pub struct Next<'a> {
    handlers: &'a [Arc<dyn Handler>],
    terminal: &'a dyn Terminal,
}

impl<'a> Next<'a> {
    pub fn new(handlers: &'a [Arc<dyn Handler>], terminal: &'a dyn Terminal) -> Self {
        Self { handlers, terminal }
    }

    pub fn run<'b>(self, ctx: &'b mut RequestContext) -> BoxFuture<'b, RouterResult<()>>
    where
        'a: 'b,
    {
        match self.handlers.split_first() {
            Some((head, rest)) => {
                let next = Next {
                    handlers: rest,
                    terminal: self.terminal,
                };
                head.handle(ctx, next)
            }
            None => self.terminal.finish(ctx),
        }
    }
}

/// Handler built from a closure, for applications and tests.
pub struct FnHandler<F> {
    name: String,
    func: F,
}

impl<F> FnHandler<F>
where
    F: for<'a> Fn(&'a mut RequestContext, Next<'a>) -> BoxFuture<'a, RouterResult<()>>
        + Send
        + Sync,
{
    pub fn new(name: impl Into<String>, func: F) -> Self {
        Self {
            name: name.into(),
            func,
        }
    }
}

impl<F> Handler for FnHandler<F>
where
    F: for<'a> Fn(&'a mut RequestContext, Next<'a>) -> BoxFuture<'a, RouterResult<()>>
        + Send
        + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn handle<'a>(
        &'a self,
        ctx: &'a mut RequestContext,
        next: Next<'a>,
    ) -> BoxFuture<'a, RouterResult<()>> {
        (self.func)(ctx, next)
    }
}

/// Terminal that does nothing; the response stays as the handlers left it.
pub struct NoopTerminal;

impl Terminal for NoopTerminal {
    fn finish<'a>(&'a self, _ctx: &'a mut RequestContext) -> BoxFuture<'a, RouterResult<()>> {
        async { Ok(()) }.boxed()
    }
}
