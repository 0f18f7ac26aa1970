pub mod config;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;

use std::sync::Arc;

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::ServerConfig;
use crate::models::HealthResponse;
use crate::services::players::PlayerStore;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub players: Arc<PlayerStore>,
}

impl AppState {
    pub fn new(config: &ServerConfig) -> Self {
        Self {
            players: Arc::new(PlayerStore::new(config.tick_interval)),
        }
    }
}

/// Build the API router over `state`.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        // Content routes
        .route("/api/content/detect", post(routes::content::detect))
        .route("/api/content/normalize", post(routes::content::normalize))
        .route("/api/evaluate", post(routes::content::evaluate))
        // Player routes
        .route("/api/players", post(routes::players::create))
        .route(
            "/api/players/:id",
            get(routes::players::show).delete(routes::players::remove),
        )
        .route("/api/players/:id/retry", post(routes::players::retry))
        .route("/api/players/:id/actions", post(routes::players::action))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::from_env()?;
    let app = router(AppState::new(&config));

    let addr = config.addr();
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        players: state.players.len().await,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_unknown_route_is_not_found() {
        let app = router(AppState::new(&ServerConfig::default()));

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/players/unknown/missing")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_health_is_ok() {
        let app = router(AppState::new(&ServerConfig::default()));

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }
}
