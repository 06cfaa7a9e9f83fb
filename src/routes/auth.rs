//! Sign-up, sign-in and sign-out

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::Json,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};

use crate::auth::{AuthSession, IdentityContext, User};

use super::error::ApiError;
use super::state::AppState;

#[derive(Debug, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
struct SignOutResponse {
    signed_out: bool,
}

/// Token from an `Authorization: Bearer …` header
pub(super) fn bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Resolve the caller's identity from the request headers
pub(super) async fn identity(
    state: &AppState,
    headers: &HeaderMap,
) -> Result<IdentityContext, ApiError> {
    Ok(state.auth.identity(bearer(headers)).await?)
}

async fn sign_up(
    State(state): State<AppState>,
    Json(body): Json<Credentials>,
) -> Result<(StatusCode, Json<AuthSession>), ApiError> {
    let session = state.auth.sign_up(&body.email, &body.password).await?;
    Ok((StatusCode::CREATED, Json(session)))
}

async fn sign_in(
    State(state): State<AppState>,
    Json(body): Json<Credentials>,
) -> Result<Json<AuthSession>, ApiError> {
    Ok(Json(state.auth.sign_in(&body.email, &body.password).await?))
}

async fn sign_out(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<SignOutResponse>, ApiError> {
    let token = bearer(&headers).ok_or_else(ApiError::unauthorized)?;
    let signed_out = state.auth.sign_out(token).await?;
    Ok(Json(SignOutResponse { signed_out }))
}

async fn me(State(state): State<AppState>, headers: HeaderMap) -> Result<Json<User>, ApiError> {
    let identity = identity(&state, &headers).await?;
    identity
        .user()
        .cloned()
        .map(Json)
        .ok_or_else(ApiError::unauthorized)
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/auth/signup", post(sign_up))
        .route("/v1/auth/signin", post(sign_in))
        .route("/v1/auth/signout", post(sign_out))
        .route("/v1/auth/me", get(me))
}
