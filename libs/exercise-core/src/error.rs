//! Error types for exercise-core.

use thiserror::Error;

use crate::session::SessionStatus;
use crate::types::{AnswerShape, ExerciseType};

/// Result type alias using ExerciseError.
pub type Result<T> = std::result::Result<T, ExerciseError>;

/// Errors raised while loading content or driving a session.
///
/// Detection never fails: unrecognised content degrades to plain text.
#[derive(Debug, Error)]
pub enum ExerciseError {
    #[error("malformed exercise JSON: {0}")]
    MalformedJson(#[from] serde_json::Error),

    #[error("{exercise_type} content is missing `{field}`")]
    MissingField {
        exercise_type: ExerciseType,
        field: &'static str,
    },

    #[error("{exercise_type} content has nothing to play")]
    EmptyExercise { exercise_type: ExerciseType },

    #[error("answer has shape {found}, expected {expected}")]
    InvalidAnswerShape {
        expected: AnswerShape,
        found: AnswerShape,
    },

    #[error("answer index {index} is out of range (len {len})")]
    AnswerOutOfRange { index: usize, len: usize },

    #[error("cannot {action} while {status}")]
    InvalidTransition {
        action: &'static str,
        status: SessionStatus,
    },

    #[error("scoring is disabled for this session")]
    ScoringDisabled,

    #[error("session already completed")]
    AlreadyCompleted,

    #[error("no section at index {index}")]
    NoSuchSection { index: usize },

    #[error("content is not interactive")]
    NotInteractive,
}

impl ExerciseError {
    /// Whether the error comes from loading content (as opposed to playing it).
    pub fn is_content_error(&self) -> bool {
        matches!(
            self,
            Self::MalformedJson(_) | Self::MissingField { .. } | Self::EmptyExercise { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_missing_field() {
        let error = ExerciseError::MissingField {
            exercise_type: ExerciseType::Matching,
            field: "pairs",
        };
        assert_eq!(error.to_string(), "matching content is missing `pairs`");
    }

    #[test]
    fn display_invalid_transition() {
        let error = ExerciseError::InvalidTransition {
            action: "pause",
            status: SessionStatus::Completed,
        };
        assert_eq!(error.to_string(), "cannot pause while completed");
    }

    #[test]
    fn content_errors_are_classified() {
        assert!(ExerciseError::EmptyExercise {
            exercise_type: ExerciseType::TrueFalse
        }
        .is_content_error());
        assert!(!ExerciseError::ScoringDisabled.is_content_error());
    }
}
