//! Exercise type detection.
//!
//! Precedence, first match wins:
//! 1. explicit `type` / `exerciseType` (unknown names fall back to text)
//! 2. two or more distinct marker types in the text: chained
//! 3. exactly one marker type
//! 4. JSON shape of the body
//! 5. plain text

use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use crate::markers;
use crate::types::{Body, ExerciseContent, ExerciseType};

/// Which rule decided the type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionSource {
    Explicit,
    Markers,
    Shape,
    Fallback,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Detection {
    pub exercise_type: ExerciseType,
    pub source: DetectionSource,
}

impl Detection {
    fn new(exercise_type: ExerciseType, source: DetectionSource) -> Self {
        Self {
            exercise_type,
            source,
        }
    }

    fn fallback() -> Self {
        Self::new(ExerciseType::Text, DetectionSource::Fallback)
    }
}

/// Classify raw content. Never fails: anything unrecognised is text.
pub fn detect(content: &ExerciseContent) -> Detection {
    if let Some(name) = content.explicit_type() {
        return match ExerciseType::from_str(name) {
            Some(kind) => Detection::new(kind, DetectionSource::Explicit),
            None => {
                warn!(exercise_type = name, "unknown exercise type, showing as text");
                Detection::fallback()
            }
        };
    }

    let detection = match content.body() {
        Body::Text(text) => detect_text(text),
        Body::Object(value) => shape_of(value)
            .map(|kind| Detection::new(kind, DetectionSource::Shape))
            .unwrap_or_else(Detection::fallback),
        Body::Empty => Detection::fallback(),
    };

    // A `text` intro next to structured fields must not hide them.
    if detection.source == DetectionSource::Fallback {
        if let Some(kind) = shape_of(content.as_value()) {
            return Detection::new(kind, DetectionSource::Shape);
        }
    }
    detection
}

fn detect_text(text: &str) -> Detection {
    match markers::marker_types(text).as_slice() {
        [] => {}
        [single] => return Detection::new(*single, DetectionSource::Markers),
        _ => return Detection::new(ExerciseType::Chained, DetectionSource::Markers),
    }

    serde_json::from_str::<Value>(text)
        .ok()
        .as_ref()
        .and_then(shape_of)
        .map(|kind| Detection::new(kind, DetectionSource::Shape))
        .unwrap_or_else(Detection::fallback)
}

/// Infer a type from the keys of a JSON object.
pub fn shape_of(value: &Value) -> Option<ExerciseType> {
    if let Some(questions) = value.get("questions").and_then(Value::as_array) {
        let has_options = questions
            .first()
            .and_then(|q| q.get("options"))
            .is_some();
        return Some(if has_options {
            ExerciseType::MultipleChoice
        } else {
            ExerciseType::OpenQuestions
        });
    }
    if value.get("pairs").is_some() {
        return Some(ExerciseType::Matching);
    }
    if value.get("statements").is_some() {
        return Some(ExerciseType::TrueFalse);
    }
    None
}
