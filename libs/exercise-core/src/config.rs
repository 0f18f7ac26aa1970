//! Session configuration and player mode presets.

use serde::{Deserialize, Serialize};

/// When correctness is shown to the learner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackMode {
    /// Score as soon as a selection completes the answer.
    Instant,
    /// Score on an explicit check action.
    #[serde(alias = "onSubmit")]
    OnSubmit,
    /// No scoring (preview and read-only players).
    None,
}

impl Default for FeedbackMode {
    fn default() -> Self {
        Self::Instant
    }
}

/// How the player is being used by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerMode {
    Interactive,
    Preview,
    Readonly,
    Game,
}

impl Default for PlayerMode {
    fn default() -> Self {
        Self::Interactive
    }
}

/// Effective configuration of one exercise session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExerciseConfig {
    pub feedback_mode: FeedbackMode,
    pub show_correct_answer: bool,
    pub show_explanation: bool,

    pub timer_enabled: bool,
    pub timer_seconds: u32,

    pub allow_retry: bool,
    pub max_retries: u32,

    pub sound_enabled: bool,

    pub correct_points: i32,
    pub partial_points: i32,
    pub incorrect_points: i32,

    pub max_hints: u32,
    /// Points subtracted per hint when feedback is shown.
    pub hint_penalty: i32,

    pub shuffle_options: bool,

    pub case_sensitive: bool,
    pub trim_whitespace: bool,
    pub ignore_accents: bool,
    pub ignore_punctuation: bool,
    pub accept_partial_match: bool,
    pub partial_match_threshold: f64,
}

impl Default for ExerciseConfig {
    fn default() -> Self {
        Self {
            feedback_mode: FeedbackMode::default(),
            show_correct_answer: true,
            show_explanation: true,
            timer_enabled: false,
            timer_seconds: 30,
            allow_retry: true,
            max_retries: 2,
            sound_enabled: true,
            correct_points: 10,
            partial_points: 5,
            incorrect_points: 0,
            max_hints: 2,
            hint_penalty: 2,
            shuffle_options: false,
            case_sensitive: false,
            trim_whitespace: true,
            ignore_accents: true,
            ignore_punctuation: true,
            accept_partial_match: true,
            partial_match_threshold: 0.7,
        }
    }
}

/// Caller-supplied overrides (all fields optional).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feedback_mode: Option<FeedbackMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub show_correct_answer: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub show_explanation: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timer_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timer_seconds: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_retry: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_retries: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sound_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correct_points: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub partial_points: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub incorrect_points: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_hints: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint_penalty: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shuffle_options: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub case_sensitive: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trim_whitespace: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ignore_accents: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ignore_punctuation: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accept_partial_match: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub partial_match_threshold: Option<f64>,
}

impl ExerciseConfig {
    /// Merge base configuration with optional overrides.
    pub fn merge(base: &ExerciseConfig, overrides: Option<&ConfigOverrides>) -> Self {
        let Some(o) = overrides else {
            return base.clone();
        };

        Self {
            feedback_mode: o.feedback_mode.unwrap_or(base.feedback_mode),
            show_correct_answer: o.show_correct_answer.unwrap_or(base.show_correct_answer),
            show_explanation: o.show_explanation.unwrap_or(base.show_explanation),
            timer_enabled: o.timer_enabled.unwrap_or(base.timer_enabled),
            timer_seconds: o.timer_seconds.unwrap_or(base.timer_seconds),
            allow_retry: o.allow_retry.unwrap_or(base.allow_retry),
            max_retries: o.max_retries.unwrap_or(base.max_retries),
            sound_enabled: o.sound_enabled.unwrap_or(base.sound_enabled),
            correct_points: o.correct_points.unwrap_or(base.correct_points),
            partial_points: o.partial_points.unwrap_or(base.partial_points),
            incorrect_points: o.incorrect_points.unwrap_or(base.incorrect_points),
            max_hints: o.max_hints.unwrap_or(base.max_hints),
            hint_penalty: o.hint_penalty.unwrap_or(base.hint_penalty),
            shuffle_options: o.shuffle_options.unwrap_or(base.shuffle_options),
            case_sensitive: o.case_sensitive.unwrap_or(base.case_sensitive),
            trim_whitespace: o.trim_whitespace.unwrap_or(base.trim_whitespace),
            ignore_accents: o.ignore_accents.unwrap_or(base.ignore_accents),
            ignore_punctuation: o.ignore_punctuation.unwrap_or(base.ignore_punctuation),
            accept_partial_match: o.accept_partial_match.unwrap_or(base.accept_partial_match),
            partial_match_threshold: o
                .partial_match_threshold
                .unwrap_or(base.partial_match_threshold),
        }
    }

    /// Preset for a player mode, before caller overrides.
    ///
    /// Game mode keeps the timer off unless the overrides turn it on.
    pub fn for_mode(mode: PlayerMode) -> Self {
        let defaults = Self::default();
        match mode {
            PlayerMode::Preview | PlayerMode::Readonly => Self {
                feedback_mode: FeedbackMode::None,
                ..defaults
            },
            PlayerMode::Game => Self {
                feedback_mode: FeedbackMode::Instant,
                allow_retry: false,
                ..defaults
            },
            PlayerMode::Interactive => Self {
                feedback_mode: FeedbackMode::OnSubmit,
                ..defaults
            },
        }
    }

    /// Mode preset with caller overrides layered on top.
    pub fn resolve(mode: PlayerMode, overrides: Option<&ConfigOverrides>) -> Self {
        Self::merge(&Self::for_mode(mode), overrides)
    }

    pub fn scoring_enabled(&self) -> bool {
        self.feedback_mode != FeedbackMode::None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn defaults_match_player_defaults() {
        let config = ExerciseConfig::default();
        assert_eq!(config.correct_points, 10);
        assert_eq!(config.partial_points, 5);
        assert_eq!(config.incorrect_points, 0);
        assert_eq!(config.max_hints, 2);
        assert_eq!(config.timer_seconds, 30);
        assert_eq!(config.partial_match_threshold, 0.7);
    }

    #[test]
    fn merge_without_overrides_is_identity() {
        let base = ExerciseConfig::default();
        assert_eq!(ExerciseConfig::merge(&base, None), base);
    }

    #[test]
    fn merge_applies_only_set_fields() {
        let base = ExerciseConfig::default();
        let overrides = ConfigOverrides {
            correct_points: Some(20),
            timer_enabled: Some(true),
            ..Default::default()
        };
        let merged = ExerciseConfig::merge(&base, Some(&overrides));
        assert_eq!(merged.correct_points, 20);
        assert!(merged.timer_enabled);
        assert_eq!(merged.partial_points, base.partial_points);
    }

    #[test]
    fn mode_presets() {
        assert_eq!(
            ExerciseConfig::for_mode(PlayerMode::Preview).feedback_mode,
            FeedbackMode::None
        );
        assert_eq!(
            ExerciseConfig::for_mode(PlayerMode::Readonly).feedback_mode,
            FeedbackMode::None
        );
        let game = ExerciseConfig::for_mode(PlayerMode::Game);
        assert_eq!(game.feedback_mode, FeedbackMode::Instant);
        assert!(!game.allow_retry);
        assert!(!game.timer_enabled);
        assert_eq!(
            ExerciseConfig::for_mode(PlayerMode::Interactive).feedback_mode,
            FeedbackMode::OnSubmit
        );
    }

    #[test]
    fn overrides_win_over_mode_preset() {
        let overrides = ConfigOverrides {
            feedback_mode: Some(FeedbackMode::Instant),
            ..Default::default()
        };
        let config = ExerciseConfig::resolve(PlayerMode::Interactive, Some(&overrides));
        assert_eq!(config.feedback_mode, FeedbackMode::Instant);
    }

    #[test]
    fn deserializes_camel_case_keys() {
        let overrides: ConfigOverrides = serde_json::from_value(json!({
            "feedbackMode": "onSubmit",
            "timerSeconds": 5,
            "correctPoints": 3
        }))
        .unwrap();
        assert_eq!(overrides.feedback_mode, Some(FeedbackMode::OnSubmit));
        assert_eq!(overrides.timer_seconds, Some(5));
        assert_eq!(overrides.correct_points, Some(3));
    }
}
