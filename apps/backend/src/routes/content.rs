//! Stateless content endpoints

use axum::Json;
use exercise_core::{ExerciseConfig, ExerciseError, PlayerMode, Playable};

use crate::error::Result;
use crate::models::*;

/// POST /api/content/detect
pub async fn detect(Json(request): Json<DetectRequest>) -> Json<Detection> {
    let detection = exercise_core::detect(&request.content);
    tracing::debug!(exercise_type = %detection.exercise_type, "content detected");
    Json(detection)
}

/// POST /api/content/normalize
pub async fn normalize(Json(request): Json<NormalizeRequest>) -> Result<Json<NormalizeResponse>> {
    let exercise = match request.exercise_type {
        Some(kind) => exercise_core::normalize(&request.content, kind)?,
        None => exercise_core::canonicalize(&request.content)?,
    };

    Ok(Json(NormalizeResponse {
        exercise_type: exercise.exercise_type(),
        exercise,
    }))
}

/// POST /api/evaluate
///
/// Scores an answer against canonical content in its authored order.
pub async fn evaluate(Json(request): Json<EvaluateRequest>) -> Result<Json<EvaluateResponse>> {
    let config = ExerciseConfig::resolve(PlayerMode::default(), request.overrides.as_ref());
    let mut playables = Playable::unshuffled(&request.exercise)?;
    if request.question >= playables.len() {
        return Err(ExerciseError::NoSuchSection {
            index: request.question,
        }
        .into());
    }
    let playable = playables.swap_remove(request.question);

    let evaluation = exercise_core::evaluate(&playable, request.answer.as_ref(), &config)?;
    let points = evaluation.status.points(&config);

    tracing::info!(
        exercise_type = %playable.exercise_type(),
        status = ?evaluation.status,
        "answer evaluated"
    );
    Ok(Json(EvaluateResponse { evaluation, points }))
}
