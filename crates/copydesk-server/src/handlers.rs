//! HTTP surface for the article lifecycle.
//!
//! Routes and verbs mirror the editorial client's contract:
//! create/edit/discard/publish/unpublish are GETs, save and submit POST the
//! draft payload. Authentication happens in front of this service; the
//! authenticated username arrives in the `x-auth-user` header.

use std::sync::Arc;

use axum::extract::{FromRequestParts, Query, State};
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use copydesk_core::DraftPatch;

use crate::engine::ArticleLifecycle;
use crate::error::ApiError;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub lifecycle: Arc<dyn ArticleLifecycle>,
}

/// Username asserted by the fronting auth layer.
pub struct AuthUser(pub String);

impl<S: Send + Sync> FromRequestParts<S> for AuthUser {
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get("x-auth-user")
            .and_then(|value| value.to_str().ok())
            .filter(|value| !value.is_empty())
            .map(|value| AuthUser(value.to_string()))
            .ok_or((StatusCode::UNAUTHORIZED, "missing x-auth-user header"))
    }
}

#[derive(Deserialize)]
pub struct IdParam {
    id: String,
}

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub healthy: bool,
    pub version: &'static str,
}

/// GET /health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        healthy: true,
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// GET /article/create
pub async fn create_article(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Response, ApiError> {
    let draft = state.lifecycle.create(&user).await?;
    Ok(Json(draft).into_response())
}

/// GET /article/edit?id=
pub async fn edit_article(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Query(params): Query<IdParam>,
) -> Result<Response, ApiError> {
    let draft = state.lifecycle.edit(&user, &params.id).await?;
    Ok(Json(draft).into_response())
}

/// POST /article/save?id=
pub async fn save_article(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Query(params): Query<IdParam>,
    Json(patch): Json<DraftPatch>,
) -> Result<Response, ApiError> {
    state.lifecycle.save(&user, &params.id, &patch).await?;
    Ok(StatusCode::OK.into_response())
}

/// POST /article/submit?id=
pub async fn submit_article(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Query(params): Query<IdParam>,
    Json(patch): Json<DraftPatch>,
) -> Result<Response, ApiError> {
    let version = state.lifecycle.submit(&user, &params.id, &patch).await?;
    Ok(Json(version).into_response())
}

/// GET /article/discard?id=
pub async fn discard_article(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Query(params): Query<IdParam>,
) -> Result<Response, ApiError> {
    state.lifecycle.discard(&user, &params.id).await?;
    Ok(StatusCode::OK.into_response())
}

/// GET /article/publish?id=
pub async fn publish_article(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Query(params): Query<IdParam>,
) -> Result<Response, ApiError> {
    state.lifecycle.publish(&user, &params.id).await?;
    Ok(StatusCode::OK.into_response())
}

/// GET /article/unpublish?id=
pub async fn unpublish_article(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Query(params): Query<IdParam>,
) -> Result<Response, ApiError> {
    state.lifecycle.unpublish(&user, &params.id).await?;
    Ok(StatusCode::OK.into_response())
}
