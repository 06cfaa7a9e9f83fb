//! API routes

mod articles;
mod auth;
mod chat;
mod error;
mod logs;
mod plans;
mod state;

use axum::{response::Json, routing::get, Router};
use serde::Serialize;

pub use state::AppState;

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .merge(articles::router())
        .merge(auth::router())
        .merge(chat::router())
        .merge(plans::router())
        .merge(logs::router())
}
