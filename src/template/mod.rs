//! Template rendering collaborator
//!
//! The router hands a resolved `.ejs` file and a JSON context to a
//! [`TemplateRenderer`] and sends back whatever HTML it produces.

mod ejs;

pub use ejs::EjsRenderer;

use futures_util::future::BoxFuture;
use serde_json::Value;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TemplateError {
    /// The template file itself does not exist.
    #[error("template not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("syntax error in {}: {message}", path.display())]
    Syntax { path: PathBuf, message: String },

    #[error("failed to render {}: {message}", path.display())]
    Render { path: PathBuf, message: String },
}

impl TemplateError {
    pub fn syntax(path: &Path, message: impl Into<String>) -> Self {
        Self::Syntax {
            path: path.to_path_buf(),
            message: message.into(),
        }
    }

    pub fn render(path: &Path, message: impl Into<String>) -> Self {
        Self::Render {
            path: path.to_path_buf(),
            message: message.into(),
        }
    }

    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

pub trait TemplateRenderer: Send + Sync {
    fn render<'a>(
        &'a self,
        path: &'a Path,
        context: &'a Value,
    ) -> BoxFuture<'a, Result<String, TemplateError>>;
}
