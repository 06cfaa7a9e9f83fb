//! Saved food logs of the signed-in user

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::Json,
    routing::{delete, get},
    Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::core::plan::PlanDetails;
use crate::core::FoodLog;

use super::auth::identity;
use super::error::ApiError;
use super::state::AppState;

/// A saved plan plus its display summary
#[derive(Debug, Serialize)]
pub struct FoodLogView {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub headline: String,
    pub summary: Vec<String>,
    pub plan_details: PlanDetails,
}

impl From<FoodLog> for FoodLogView {
    fn from(log: FoodLog) -> Self {
        Self {
            id: log.id,
            created_at: log.created_at,
            headline: log.plan_details.intake.headline(),
            summary: log.summary(),
            plan_details: log.plan_details,
        }
    }
}

async fn list(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<FoodLogView>>, ApiError> {
    let identity = identity(&state, &headers).await?;
    let user = identity.user().ok_or_else(ApiError::unauthorized)?;

    let logs = state.logs.list_for_owner(user.id).await?;
    Ok(Json(logs.into_iter().map(FoodLogView::from).collect()))
}

async fn remove(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<StatusCode, ApiError> {
    let identity = identity(&state, &headers).await?;
    let user = identity.user().ok_or_else(ApiError::unauthorized)?;

    if state.logs.delete(user.id, id).await? {
        tracing::info!(log_id = %id, "food log deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::not_found("food log"))
    }
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/logs", get(list))
        .route("/v1/logs/:id", delete(remove))
}
