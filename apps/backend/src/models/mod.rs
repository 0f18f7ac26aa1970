//! API request and response types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// Re-export shared types from exercise-core
pub use exercise_core::{
    ConfigOverrides, Detection, Evaluation, Exercise, ExerciseContent, ExerciseType,
    PlayerAction, PlayerEvent, PlayerOptions, PlayerView, UserAnswer,
};

// === Content Types ===

/// Request body for POST /api/content/detect
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectRequest {
    pub content: ExerciseContent,
}

/// Request body for POST /api/content/normalize
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizeRequest {
    pub content: ExerciseContent,
    /// Skip detection and normalize as this type.
    pub exercise_type: Option<ExerciseType>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizeResponse {
    pub exercise_type: ExerciseType,
    pub exercise: Exercise,
}

/// Request body for POST /api/evaluate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluateRequest {
    pub exercise: Exercise,
    pub answer: Option<UserAnswer>,
    /// Which question of a multi-question exercise; defaults to the first.
    #[serde(default)]
    pub question: usize,
    pub overrides: Option<ConfigOverrides>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EvaluateResponse {
    #[serde(flatten)]
    pub evaluation: Evaluation,
    pub points: i32,
}

// === Player Types ===

/// Request body for POST /api/players
#[derive(Debug, Clone, Deserialize)]
pub struct CreatePlayerRequest {
    pub content: ExerciseContent,
    #[serde(flatten)]
    pub options: PlayerOptions,
}

/// Request body for POST /api/players/:id/retry
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RetryRequest {
    pub content: Option<ExerciseContent>,
}

/// Request body for POST /api/players/:id/actions
///
/// The action itself sits beside `section`, e.g.
/// `{"section": 1, "action": "check"}` or `{"interaction": "select", "option": 2}`.
#[derive(Debug, Clone, Deserialize)]
pub struct ActionRequest {
    pub section: Option<usize>,
    #[serde(flatten)]
    pub action: PlayerAction,
}

/// Current state of a hosted player
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerResponse {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub view: PlayerView,
}

/// Response to POST /api/players/:id/actions
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionResponse {
    pub view: PlayerView,
    pub events: Vec<PlayerEvent>,
}

/// Response to GET /health
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub players: usize,
}
