//! Read-only feeding articles

use axum::{extract::Path, response::Json, routing::get, Router};
use serde::Serialize;

use crate::config::articles::{self, Article, ARTICLES};

use super::error::ApiError;
use super::state::AppState;

#[derive(Debug, Serialize)]
pub struct ArticleView {
    #[serde(flatten)]
    pub article: Article,
    pub paragraphs: Vec<&'static str>,
}

async fn list() -> Json<&'static [Article]> {
    Json(ARTICLES)
}

async fn show(Path(slug): Path<String>) -> Result<Json<ArticleView>, ApiError> {
    let article = articles::find(&slug).ok_or_else(|| ApiError::not_found("article"))?;
    Ok(Json(ArticleView {
        article: *article,
        paragraphs: article.paragraphs(),
    }))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/articles", get(list))
        .route("/v1/articles/:slug", get(show))
}
