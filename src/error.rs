//! Error types
//!
//! Request-scoped failures raised while composing or running a middleware
//! pipeline. Resolution itself never fails: a missing route is an outcome,
//! not an error (see [`crate::routing::RouteOutcome`]).

use std::path::PathBuf;
use thiserror::Error;

use crate::plugins::StoreError;
use crate::template::TemplateError;

/// Errors surfaced to the error-route collaborator for a single request.
#[derive(Debug, Error)]
pub enum RouterError {
    /// A discovered middleware file could not be turned into handlers.
    #[error("failed to load middleware {}: {reason}", path.display())]
    MiddlewareLoad { path: PathBuf, reason: String },

    /// Template rendering failed.
    #[error(transparent)]
    Template(#[from] TemplateError),

    /// A handler rejected the request with an application error.
    #[error("handler `{handler}` failed: {message}")]
    Handler { handler: String, message: String },

    /// Header name or value was not valid HTTP.
    #[error("invalid header `{0}`")]
    InvalidHeader(String),

    /// Key-value store write failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl RouterError {
    pub fn middleware_load(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::MiddlewareLoad {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn handler(handler: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Handler {
            handler: handler.into(),
            message: message.into(),
        }
    }
}

/// Result type for pipeline operations.
pub type RouterResult<T> = Result<T, RouterError>;
