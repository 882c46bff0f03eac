//! HTTP mapping for lifecycle errors.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use tracing::error;

use copydesk_core::LifecycleError;

/// Newtype carrying the lifecycle taxonomy into an axum response.
pub struct ApiError(pub LifecycleError);

impl From<LifecycleError> for ApiError {
    fn from(err: LifecycleError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self.0 {
            LifecycleError::NotFound(msg) => (StatusCode::NOT_FOUND, msg).into_response(),
            // the conflicting draft's identity is the body, so the caller
            // can tell who holds the id (or retry on a bare guid)
            LifecycleError::Conflict { current } => {
                (StatusCode::CONFLICT, Json(current)).into_response()
            }
            LifecycleError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg).into_response(),
            LifecycleError::Internal(cause) => {
                // operators get the cause, callers get a generic body
                error!("internal error: {}", cause);
                (StatusCode::INTERNAL_SERVER_ERROR, "internal error").into_response()
            }
        }
    }
}
