//! Hosted player endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use exercise_core::Player;
use uuid::Uuid;

use crate::error::{ApiError, Result};
use crate::models::*;
use crate::services::players::SharedPlayer;
use crate::AppState;

async fn find(state: &AppState, id: Uuid) -> Result<(SharedPlayer, DateTime<Utc>)> {
    state
        .players
        .get(id)
        .await
        .ok_or_else(|| ApiError::NotFound(format!("Player {}", id)))
}

/// POST /api/players
///
/// Load failures still create the player; the view carries the error and
/// the client may retry.
pub async fn create(
    State(state): State<AppState>,
    Json(request): Json<CreatePlayerRequest>,
) -> Result<(StatusCode, Json<PlayerResponse>)> {
    let player = Player::load(request.content, request.options);
    let view = player.view();
    let (id, created_at) = state.players.insert(player).await;

    Ok((
        StatusCode::CREATED,
        Json(PlayerResponse {
            id,
            created_at,
            view,
        }),
    ))
}

/// GET /api/players/:id
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<PlayerResponse>> {
    let (player, created_at) = find(&state, id).await?;
    let view = player.lock().await.view();

    Ok(Json(PlayerResponse {
        id,
        created_at,
        view,
    }))
}

/// DELETE /api/players/:id
pub async fn remove(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<StatusCode> {
    if !state.players.remove(id).await {
        return Err(ApiError::NotFound(format!("Player {}", id)));
    }
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/players/:id/retry
pub async fn retry(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    request: Option<Json<RetryRequest>>,
) -> Result<Json<PlayerResponse>> {
    let (player, created_at) = find(&state, id).await?;
    let request = request.map(|Json(request)| request).unwrap_or_default();

    let view = {
        let mut player = player.lock().await;
        player.retry(request.content);
        player.view()
    };
    state.players.ensure_ticker(id).await;
    tracing::info!(%id, "player reloaded");

    Ok(Json(PlayerResponse {
        id,
        created_at,
        view,
    }))
}

/// POST /api/players/:id/actions
pub async fn action(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<ActionRequest>,
) -> Result<Json<ActionResponse>> {
    let (player, _) = find(&state, id).await?;
    let response = {
        let mut player = player.lock().await;
        player.dispatch(request.section, request.action)?;
        ActionResponse {
            view: player.view(),
            events: player.poll_events(),
        }
    };
    // a reset may bring the countdown back
    state.players.ensure_ticker(id).await;

    Ok(Json(response))
}
