// Minimal EJS renderer
// Output tags and includes only; no embedded code is executed.

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use serde_json::Value;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::{TemplateError, TemplateRenderer};
use crate::routing::RouteFs;

const MAX_INCLUDE_DEPTH: usize = 16;

pub struct EjsRenderer {
    fs: Arc<dyn RouteFs>,
}

impl EjsRenderer {
    pub fn new(fs: Arc<dyn RouteFs>) -> Self {
        Self { fs }
    }

    fn load(&self, path: &Path) -> Result<String, TemplateError> {
        if !self.fs.is_file(path) {
            return Err(TemplateError::NotFound(path.to_path_buf()));
        }
        let bytes = self.fs.read(path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => TemplateError::NotFound(path.to_path_buf()),
            _ => TemplateError::render(path, e.to_string()),
        })?;
        String::from_utf8(bytes).map_err(|_| TemplateError::render(path, "template is not UTF-8"))
    }

    fn render_file(&self, path: &Path, context: &Value, depth: usize) -> Result<String, TemplateError> {
        if depth > MAX_INCLUDE_DEPTH {
            return Err(TemplateError::render(path, "include depth exceeded"));
        }
        let source = self.load(path)?;
        let mut out = String::with_capacity(source.len());
        let mut rest = source.as_str();

        while let Some(start) = rest.find("<%") {
            out.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            let end = after
                .find("%>")
                .ok_or_else(|| TemplateError::syntax(path, "unclosed tag"))?;
            let (body, trim_newline) = match after[..end].strip_suffix('-') {
                Some(body) => (body, true),
                None => (&after[..end], false),
            };
            rest = &after[end + 2..];
            if trim_newline {
                rest = rest.strip_prefix("\r\n").or_else(|| rest.strip_prefix('\n')).unwrap_or(rest);
            }

            let tag = Tag::parse(body).ok_or_else(|| {
                TemplateError::syntax(path, format!("unsupported tag `<%{}%>`", body.trim_end()))
            })?;
            match tag {
                Tag::Comment => {}
                Tag::Output { expr, escape } => {
                    let text = self.evaluate(path, expr, context, depth)?;
                    if escape {
                        escape_html_into(&mut out, &text);
                    } else {
                        out.push_str(&text);
                    }
                }
            }
        }
        out.push_str(rest);
        Ok(out)
    }

    fn evaluate(
        &self,
        path: &Path,
        expr: &str,
        context: &Value,
        depth: usize,
    ) -> Result<String, TemplateError> {
        if let Some(target) = parse_include(expr) {
            let target = target.ok_or_else(|| TemplateError::syntax(path, "include expects a quoted path"))?;
            let included = include_path(path, target);
            return self
                .render_file(&included, context, depth + 1)
                .map_err(|e| match e {
                    TemplateError::NotFound(missing) => TemplateError::render(
                        path,
                        format!("included template {} not found", missing.display()),
                    ),
                    other => other,
                });
        }
        lookup(path, expr, context).map(|value| display(&value))
    }
}

impl TemplateRenderer for EjsRenderer {
    fn render<'a>(
        &'a self,
        path: &'a Path,
        context: &'a Value,
    ) -> BoxFuture<'a, Result<String, TemplateError>> {
        async move { self.render_file(path, context, 0) }.boxed()
    }
}

enum Tag<'a> {
    Comment,
    Output { expr: &'a str, escape: bool },
}

impl<'a> Tag<'a> {
    fn parse(body: &'a str) -> Option<Self> {
        if body.starts_with('#') {
            return Some(Self::Comment);
        }
        if let Some(expr) = body.strip_prefix('=') {
            return Some(Self::Output { expr: expr.trim(), escape: true });
        }
        if let Some(expr) = body.strip_prefix('-') {
            return Some(Self::Output { expr: expr.trim(), escape: false });
        }
        None
    }
}

/// `include("x.ejs")` → `Some(Some("x.ejs"))`; malformed arguments → `Some(None)`.
fn parse_include(expr: &str) -> Option<Option<&str>> {
    let args = expr.strip_prefix("include")?.trim_start();
    let args = args.strip_prefix('(')?.strip_suffix(')')?.trim();
    let quoted = ['"', '\'']
        .iter()
        .find_map(|q| args.strip_prefix(*q).and_then(|a| a.strip_suffix(*q)));
    Some(quoted.filter(|p| !p.is_empty()))
}

fn include_path(current: &Path, target: &str) -> PathBuf {
    let base = current.parent().unwrap_or_else(|| Path::new(""));
    let mut path = base.join(target);
    if path.extension().is_none() {
        path.set_extension("ejs");
    }
    path
}

fn lookup(path: &Path, expr: &str, context: &Value) -> Result<Value, TemplateError> {
    let mut parts = expr.split('.');
    let root = parts.next().unwrap_or_default();
    if !is_identifier(root) {
        return Err(TemplateError::syntax(path, format!("unsupported expression `{expr}`")));
    }
    let mut value = context
        .get(root)
        .ok_or_else(|| TemplateError::render(path, format!("{root} is not defined")))?;

    for part in parts {
        if !is_identifier(part) {
            return Err(TemplateError::syntax(path, format!("unsupported expression `{expr}`")));
        }
        let next = match value {
            Value::Object(map) => map.get(part),
            Value::Array(items) => part.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        };
        match next {
            Some(next) => value = next,
            None => return Ok(Value::Null),
        }
    }
    Ok(value.clone())
}

fn is_identifier(part: &str) -> bool {
    !part.is_empty()
        && part
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

fn display(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(_) | Value::Number(_) => value.to_string(),
        Value::Array(_) | Value::Object(_) => serde_json::to_string(value).unwrap_or_default(),
    }
}

fn escape_html_into(out: &mut String, text: &str) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&#34;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::MemoryFs;
    use serde_json::json;

    fn renderer(fs: MemoryFs) -> EjsRenderer {
        EjsRenderer::new(Arc::new(fs))
    }

    async fn render(fs: MemoryFs, path: &str, ctx: Value) -> Result<String, TemplateError> {
        renderer(fs).render(Path::new(path), &ctx).await
    }

    #[tokio::test]
    async fn test_escaped_and_raw_output() {
        let fs = MemoryFs::new().with_file("t.ejs", "<%= params.q %>|<%- params.q %>");
        let out = render(fs, "t.ejs", json!({"params": {"q": "<b>&'\""}})).await.unwrap();
        assert_eq!(out, "&lt;b&gt;&amp;&#39;&#34;|<b>&'\"");
    }

    #[tokio::test]
    async fn test_comment_and_trailing_newline_trim() {
        let fs = MemoryFs::new().with_file("t.ejs", "a<%# note -%>\nb");
        assert_eq!(render(fs, "t.ejs", json!({})).await.unwrap(), "ab");
    }

    #[tokio::test]
    async fn test_missing_nested_property_renders_empty() {
        let fs = MemoryFs::new().with_file("t.ejs", "[<%= locals.user.name %>]");
        assert_eq!(render(fs, "t.ejs", json!({"locals": {}})).await.unwrap(), "[]");
    }

    #[tokio::test]
    async fn test_numbers_arrays_and_objects() {
        let fs = MemoryFs::new().with_file("t.ejs", "<%= a %> <%= b.1 %> <%- c %>");
        let out = render(fs, "t.ejs", json!({"a": 3, "b": ["x", "y"], "c": {"k": true}}))
            .await
            .unwrap();
        assert_eq!(out, "3 y {\"k\":true}");
    }

    #[tokio::test]
    async fn test_unknown_root_is_render_error() {
        let fs = MemoryFs::new().with_file("t.ejs", "<%= nope %>");
        let err = render(fs, "t.ejs", json!({})).await.unwrap_err();
        assert!(matches!(err, TemplateError::Render { .. }));
    }

    #[tokio::test]
    async fn test_scriptlet_is_syntax_error() {
        let fs = MemoryFs::new().with_file("t.ejs", "<% if (x) { %>");
        let err = render(fs, "t.ejs", json!({})).await.unwrap_err();
        assert!(matches!(err, TemplateError::Syntax { .. }));
    }

    #[tokio::test]
    async fn test_unclosed_tag_is_syntax_error() {
        let fs = MemoryFs::new().with_file("t.ejs", "hello <%= name");
        let err = render(fs, "t.ejs", json!({"name": "x"})).await.unwrap_err();
        assert!(matches!(err, TemplateError::Syntax { .. }));
    }

    #[tokio::test]
    async fn test_missing_template_is_not_found() {
        let err = render(MemoryFs::new(), "routes/gone.ejs", json!({})).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_include_relative_to_template() {
        let fs = MemoryFs::new()
            .with_file("routes/blog/[slug].ejs", "<%- include('partials/head') %>body")
            .with_file("routes/blog/partials/head.ejs", "<h1><%= params.slug %></h1>");
        let out = render(fs, "routes/blog/[slug].ejs", json!({"params": {"slug": "hi"}}))
            .await
            .unwrap();
        assert_eq!(out, "<h1>hi</h1>body");
    }

    #[tokio::test]
    async fn test_missing_include_is_render_error() {
        let fs = MemoryFs::new().with_file("t.ejs", "<%- include(\"nope.ejs\") %>");
        let err = render(fs, "t.ejs", json!({})).await.unwrap_err();
        assert!(matches!(err, TemplateError::Render { .. }));
    }

    #[tokio::test]
    async fn test_recursive_include_is_bounded() {
        let fs = MemoryFs::new().with_file("loop.ejs", "<%- include(\"loop.ejs\") %>");
        let err = render(fs, "loop.ejs", json!({})).await.unwrap_err();
        assert!(err.to_string().contains("include depth exceeded"));
    }
}
