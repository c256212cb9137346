//! Handler registry
//!
//! Middleware files name their handlers with `use = "<name>"`; the registry
//! maps each name to a factory that builds the handler from the remaining
//! options of that table.

use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::sync::Arc;

use super::builtin;
use super::chain::Handler;

/// Builds a handler from its options table.
pub type HandlerFactory =
    Arc<dyn Fn(&toml::Table) -> Result<Arc<dyn Handler>, String> + Send + Sync>;

/// One `use` entry of a middleware file.
#[derive(Debug, Clone, PartialEq)]
pub struct HandlerSpec {
    pub name: String,
    pub options: toml::Table,
}

#[derive(Default, Clone)]
pub struct HandlerRegistry {
    factories: HashMap<String, HandlerFactory>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with `log_request`, `set_header`, `count_views`,
    /// `redirect` and `respond`.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        builtin::register_all(&mut registry);
        registry
    }

    /// Add or replace the factory for `name`.
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn(&toml::Table) -> Result<Arc<dyn Handler>, String> + Send + Sync + 'static,
    {
        self.factories.insert(name.into(), Arc::new(factory));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    pub fn build(&self, spec: &HandlerSpec) -> Result<Arc<dyn Handler>, String> {
        let factory = self
            .factories
            .get(&spec.name)
            .ok_or_else(|| format!("unknown handler `{}`", spec.name))?;
        factory(&spec.options).map_err(|e| format!("handler `{}`: {e}", spec.name))
    }
}

/// Deserialize a handler's options table.
pub fn options<T: DeserializeOwned>(table: &toml::Table) -> Result<T, String> {
    toml::Value::Table(table.clone())
        .try_into()
        .map_err(|e: toml::de::Error| e.message().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::chain::NoopTerminal;
    use crate::middleware::FnHandler;
    use futures_util::FutureExt;

    fn spec(name: &str, options: &str) -> HandlerSpec {
        HandlerSpec {
            name: name.to_string(),
            options: toml::from_str(options).unwrap(),
        }
    }

    #[test]
    fn test_builtins_registered() {
        let registry = HandlerRegistry::with_builtins();
        for name in ["log_request", "set_header", "count_views", "redirect", "respond"] {
            assert!(registry.contains(name), "{name} missing");
        }
    }

    #[test]
    fn test_unknown_handler() {
        let err = HandlerRegistry::new().build(&spec("nope", "")).err().unwrap();
        assert_eq!(err, "unknown handler `nope`");
    }

    #[test]
    fn test_factory_error_names_handler() {
        let registry = HandlerRegistry::with_builtins();
        let err = registry.build(&spec("set_header", "value = \"x\"")).err().unwrap();
        assert!(err.starts_with("handler `set_header`:"), "{err}");
    }

    #[tokio::test]
    async fn test_custom_factory() {
        let mut registry = HandlerRegistry::new();
        registry.register("tag", |opts: &toml::Table| {
            let label = opts
                .get("label")
                .and_then(toml::Value::as_str)
                .unwrap_or("none")
                .to_string();
            let handler: Arc<dyn Handler> = Arc::new(FnHandler::new("tag", move |ctx, next| {
                let label = label.clone();
                async move {
                    ctx.locals.insert("tag".into(), label.into());
                    next.run(ctx).await
                }
                .boxed()
            }));
            Ok(handler)
        });

        let handler = registry.build(&spec("tag", "label = \"hot\"")).unwrap();
        let mut ctx = crate::handler::context::test_context(hyper::Method::GET, "/");
        let chain = [handler];
        crate::middleware::Next::new(&chain, &NoopTerminal)
            .run(&mut ctx)
            .await
            .unwrap();
        assert_eq!(ctx.locals["tag"], "hot");
    }
}
