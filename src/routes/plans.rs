//! Plan generation endpoints

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::Json,
    routing::{get, post},
    Router,
};
use serde::Serialize;
use uuid::Uuid;

use crate::core::plan::{AgeRange, Allergy, DietaryPreference, Goal, MealsPerDay, PlanIntake, Sex};
use crate::core::PlanSnapshot;

use super::auth::identity;
use super::error::ApiError;
use super::logs::FoodLogView;
use super::state::AppState;

#[derive(Debug, Serialize)]
pub struct PlanView {
    pub id: Uuid,
    #[serde(flatten)]
    pub snapshot: PlanSnapshot,
}

/// Choices offered by the intake form
#[derive(Debug, Serialize)]
struct FormOptions {
    age_ranges: Vec<&'static str>,
    sexes: Vec<&'static str>,
    goals: Vec<&'static str>,
    meals_per_day: Vec<u8>,
    allergies: Vec<&'static str>,
    dietary_preferences: Vec<&'static str>,
}

async fn options() -> Json<FormOptions> {
    Json(FormOptions {
        age_ranges: AgeRange::ALL.iter().map(AgeRange::as_str).collect(),
        sexes: Sex::ALL.iter().map(Sex::as_str).collect(),
        goals: Goal::ALL.iter().map(Goal::as_str).collect(),
        meals_per_day: (MealsPerDay::MIN..=MealsPerDay::MAX).collect(),
        allergies: Allergy::ALL.iter().map(Allergy::as_str).collect(),
        dietary_preferences: DietaryPreference::ALL
            .iter()
            .map(DietaryPreference::as_str)
            .collect(),
    })
}

async fn open(State(state): State<AppState>) -> (StatusCode, Json<PlanView>) {
    let (id, session) = state.plans.insert(state.new_plan()).await;
    tracing::debug!(%id, "plan session opened");
    (
        StatusCode::CREATED,
        Json(PlanView {
            id,
            snapshot: session.snapshot(),
        }),
    )
}

async fn show(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<PlanView>, ApiError> {
    let session = state.plans.get(id).await.ok_or_else(|| ApiError::not_found("plan"))?;
    Ok(Json(PlanView {
        id,
        snapshot: session.snapshot(),
    }))
}

async fn generate(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(intake): Json<PlanIntake>,
) -> Result<Json<PlanView>, ApiError> {
    let session = state.plans.get(id).await.ok_or_else(|| ApiError::not_found("plan"))?;
    let snapshot = session.generate(&intake).await?;
    Ok(Json(PlanView { id, snapshot }))
}

async fn save(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<(StatusCode, Json<FoodLogView>), ApiError> {
    let session = state.plans.get(id).await.ok_or_else(|| ApiError::not_found("plan"))?;
    let identity = identity(&state, &headers).await?;
    let log = session.save(&identity, &state.logs).await?;
    Ok((StatusCode::CREATED, Json(FoodLogView::from(log))))
}

async fn reset(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<PlanView>, ApiError> {
    let session = state.plans.get(id).await.ok_or_else(|| ApiError::not_found("plan"))?;
    session.reset();
    Ok(Json(PlanView {
        id,
        snapshot: session.snapshot(),
    }))
}

async fn close(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    if state.plans.remove(id).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::not_found("plan"))
    }
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/plan-options", get(options))
        .route("/v1/plans", post(open))
        .route("/v1/plans/:id", get(show).delete(close))
        .route("/v1/plans/:id/generate", post(generate))
        .route("/v1/plans/:id/save", post(save))
        .route("/v1/plans/:id/reset", post(reset))
}
