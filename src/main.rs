//! Little Spoon - baby food meal-plan assistant API
//!
//! Serves a nutrition chat assistant, a three-day meal plan generator and
//! the signed-in user's saved food logs.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tokio::sync::broadcast::error::RecvError;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod auth;
mod config;
mod conversation;
mod core;
mod providers;
mod routes;

use crate::auth::{AuthEvent, AuthService};
use crate::config::Config;
use crate::core::{store, FoodLogStore};
use crate::providers::{OpenAICompatConfig, OpenAICompatProvider};
use crate::routes::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "little_spoon=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;

    // Users, sessions and food logs share one database
    let pool = store::connect(&config.data_dir.join("little-spoon.db")).await?;
    let auth = Arc::new(AuthService::new(pool.clone()).await?);
    let logs = Arc::new(FoodLogStore::new(pool).await?);

    if config.completion.api_key.is_none() {
        tracing::warn!("COMPLETION_API_KEY is not set; completion requests will be rejected");
    }
    let provider = OpenAICompatProvider::new(OpenAICompatConfig::from(&config.completion));
    tracing::info!(
        base_url = %config.completion.base_url,
        model = provider.default_model(),
        "completion service configured"
    );

    let mut events = auth.subscribe();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(AuthEvent::SignedIn(user)) => {
                    tracing::info!(user_id = %user.id, "signed in")
                }
                Ok(AuthEvent::SignedOut { user_id }) => {
                    tracing::info!(%user_id, "signed out")
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "auth event listener lagged")
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    let state = AppState::new(config.profiles, Arc::new(provider), auth, logs);
    state.spawn_session_sweeper(Duration::from_secs(config.session_idle_secs));

    let app = Router::new()
        .merge(routes::router())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    tracing::info!("Little Spoon API running at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
