//! Mapping domain errors to HTTP responses

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde_json::json;

use crate::auth::AuthError;
use crate::config::prompts_builtin;
use crate::core::{PlanError, StoreError};

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn not_found(what: &str) -> Self {
        Self::new(StatusCode::NOT_FOUND, format!("{} not found", what))
    }

    pub fn unauthorized() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "Not authenticated")
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

impl From<PlanError> for ApiError {
    fn from(err: PlanError) -> Self {
        match err {
            PlanError::Validation(e) => Self::new(StatusCode::BAD_REQUEST, e.to_string()),
            PlanError::Busy | PlanError::NoPlan => Self::new(StatusCode::CONFLICT, err.to_string()),
            PlanError::NotAuthenticated => {
                Self::new(StatusCode::UNAUTHORIZED, prompts_builtin::PLAN_SIGN_IN)
            }
            PlanError::Store(_) => Self::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                prompts_builtin::PLAN_SAVE_FAILED,
            ),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        let status = match err {
            AuthError::InvalidEmail | AuthError::WeakPassword => StatusCode::BAD_REQUEST,
            AuthError::EmailTaken => StatusCode::CONFLICT,
            AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AuthError::Hashing(_) | AuthError::Database(_) => {
                tracing::error!("auth failure: {}", err);
                return Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Authentication unavailable");
            }
        };
        Self::new(status, err.to_string())
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        tracing::error!("store failure: {}", err);
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Failed to load food logs")
    }
}
