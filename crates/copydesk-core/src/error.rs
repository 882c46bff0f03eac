use thiserror::Error;

use crate::article::Article;

/// Transport- and serialization-level failures of a document store backend.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Failures of a lifecycle operation, mapped 1:1 onto response statuses by
/// the HTTP layer.
#[derive(Error, Debug)]
pub enum LifecycleError {
    #[error("{0}")]
    NotFound(String),

    /// A create-only draft write lost a race. Carries the identity of the
    /// draft currently occupying the id; when only the guid is set, the
    /// occupying draft vanished mid-reload and the caller should retry.
    #[error("a draft already exists for this article")]
    Conflict { current: Article },

    #[error("{0}")]
    Forbidden(String),

    /// Store unreachable, malformed payload, unexpected store response
    /// shape, or a write that should have succeeded but didn't. The message
    /// is for operators; callers get a censored body.
    #[error("{0}")]
    Internal(String),
}

impl From<StoreError> for LifecycleError {
    fn from(err: StoreError) -> Self {
        LifecycleError::Internal(err.to_string())
    }
}
