//! Core exercise player library shared by the backend and any other host.
//!
//! Provides:
//! - Exercise type detection and normalization of loosely shaped content
//! - Marker-based text parsers (`#completar`, `#opcion_multiple`, ...)
//! - Answer evaluation per exercise type
//! - The exercise session state machine (timer, hints, retries, scoring)
//! - Chained exercise groups and per-type renderers
//! - The player driver tying them together

pub mod chained;
pub mod config;
pub mod detect;
pub mod error;
pub mod evaluate;
pub mod markers;
pub mod normalize;
pub mod parser;
pub mod playable;
pub mod player;
pub mod render;
pub mod session;
pub mod types;

pub use chained::{ChainedGroup, GroupSection, Progress};
pub use config::{ConfigOverrides, ExerciseConfig, FeedbackMode, PlayerMode};
pub use detect::{detect, Detection, DetectionSource};
pub use error::{ExerciseError, Result};
pub use evaluate::{check_blank_answer, evaluate, Evaluation, EvaluationDetail, Verdict};
pub use normalize::{canonicalize, normalize};
pub use playable::Playable;
pub use player::{
    LayoutKind, Player, PlayerAction, PlayerError, PlayerEvent, PlayerOptions, PlayerState,
    PlayerView,
};
pub use render::{Interaction, SessionView};
pub use session::{
    CompletionResult, ExerciseSession, Hint, ResetScope, SessionAction, SessionEvent,
    SessionStatus,
};
pub use types::{Exercise, ExerciseContent, ExerciseType, UserAnswer};
