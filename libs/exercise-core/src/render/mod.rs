//! Renderers: one per exercise type, each a pure function from session
//! state to a serialisable view, plus the interactions that write answers
//! back into the session.

pub mod drag_drop;
pub mod fill_blank;
pub mod matching;
pub mod multiple_choice;
pub mod open_questions;
pub mod true_false;
pub mod word_highlight;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::Result;
use crate::evaluate::{EvaluationDetail, Verdict};
use crate::playable::Playable;
use crate::session::{ExerciseSession, Hint, SessionStatus};
use crate::types::ExerciseType;

/// Everything a host needs to draw one session.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub exercise_type: ExerciseType,
    pub status: SessionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_left: Option<u32>,
    pub attempts: u32,
    pub hints_used: u32,
    pub hints_remaining: u32,
    pub hints: Vec<Hint>,
    pub score: i32,
    pub can_check: bool,
    pub can_retry: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feedback: Option<FeedbackView>,
    pub body: ExerciseView,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ExerciseView {
    MultipleChoice(multiple_choice::ChoiceView),
    FillBlank(fill_blank::FillBlankView),
    DragDrop(drag_drop::DragDropView),
    Matching(matching::MatchingView),
    TrueFalse(true_false::TrueFalseView),
    OpenQuestions(open_questions::OpenQuestionsView),
    WordHighlight(word_highlight::HighlightView),
}

/// Result panel shown after a check.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackView {
    pub status: Verdict,
    pub is_correct: bool,
    pub timed_out: bool,
    pub score: i32,
    pub hint_penalty: i32,
    /// Score after the hint penalty, never below zero.
    pub final_score: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<EvaluationDetail>,
}

/// Learner input routed through a renderer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "interaction", rename_all = "snake_case")]
pub enum Interaction {
    Select { option: usize },
    TypeBlank { blank: usize, text: String },
    Place { blank: usize, word: usize },
    ClearBlank { blank: usize },
    Connect { left: usize, right: usize },
    Disconnect { left: usize },
    Choose { statement: usize, verdict: bool },
    Respond { question: usize, text: String },
    Toggle { token: usize },
}

/// Apply an interaction. An interaction meant for another exercise type
/// fails with an answer-shape error.
pub fn interact(session: &mut ExerciseSession, interaction: Interaction) -> Result<()> {
    match interaction {
        Interaction::Select { option } => multiple_choice::select(session, option),
        Interaction::TypeBlank { blank, text } => fill_blank::type_blank(session, blank, text),
        Interaction::Place { blank, word } => drag_drop::place(session, blank, word),
        Interaction::ClearBlank { blank } => drag_drop::clear(session, blank),
        Interaction::Connect { left, right } => matching::connect(session, left, right),
        Interaction::Disconnect { left } => matching::disconnect(session, left),
        Interaction::Choose { statement, verdict } => {
            true_false::choose(session, statement, verdict)
        }
        Interaction::Respond { question, text } => open_questions::respond(session, question, text),
        Interaction::Toggle { token } => word_highlight::toggle(session, token),
    }
}

pub fn render(session: &ExerciseSession) -> SessionView {
    let body = match session.playable() {
        Playable::MultipleChoice { question, order } => {
            ExerciseView::MultipleChoice(multiple_choice::render(question, order, session))
        }
        Playable::FillBlank(content) => ExerciseView::FillBlank(fill_blank::render(content, session)),
        Playable::DragDrop { content, bank } => {
            ExerciseView::DragDrop(drag_drop::render(content, bank, session))
        }
        Playable::Matching {
            content,
            right_order,
        } => ExerciseView::Matching(matching::render(content, right_order, session)),
        Playable::TrueFalse(content) => ExerciseView::TrueFalse(true_false::render(content, session)),
        Playable::OpenQuestions(content) => {
            ExerciseView::OpenQuestions(open_questions::render(content, session))
        }
        Playable::WordHighlight(content) => {
            ExerciseView::WordHighlight(word_highlight::render(content, session))
        }
    };

    let config = session.config();
    SessionView {
        exercise_type: session.exercise_type(),
        status: session.status(),
        time_left: session.time_left(),
        attempts: session.attempts(),
        hints_used: session.hints_used(),
        hints_remaining: config.max_hints.saturating_sub(session.hints_used()),
        hints: session.hints().to_vec(),
        score: session.score(),
        can_check: session.status() == SessionStatus::Active && config.scoring_enabled(),
        can_retry: session.can_retry(),
        feedback: feedback(session),
        body,
    }
}

fn feedback(session: &ExerciseSession) -> Option<FeedbackView> {
    if !session.shows_feedback() {
        return None;
    }
    let evaluation = session.evaluation()?;
    let config = session.config();

    Some(FeedbackView {
        status: evaluation.status,
        is_correct: evaluation.is_correct(),
        timed_out: session.timed_out(),
        score: session.score(),
        hint_penalty: config.hint_penalty,
        final_score: final_score(session),
        explanation: config
            .show_explanation
            .then(|| session.playable().explanation().map(str::to_string))
            .flatten(),
        detail: config.show_correct_answer.then(|| evaluation.detail.clone()),
    })
}

/// Session score minus the hint penalty. Applied only when displayed; the
/// session score itself is never reduced.
pub fn final_score(session: &ExerciseSession) -> i32 {
    let hints = i32::try_from(session.hints_used()).unwrap_or(i32::MAX);
    let penalty = session.config().hint_penalty.saturating_mul(hints);
    session.score().saturating_sub(penalty).max(0)
}

/// Whether per-item correctness is on display.
fn shows_results(session: &ExerciseSession) -> bool {
    session.shows_feedback()
}

/// Whether the expected answers are on display.
fn reveals_answers(session: &ExerciseSession) -> bool {
    session.shows_feedback() && session.config().show_correct_answer
}

fn shows_explanations(session: &ExerciseSession) -> bool {
    session.shows_feedback() && session.config().show_explanation
}

/// Per-key results of the last evaluation, for map-shaped answers.
fn keyed_results(session: &ExerciseSession) -> Option<&BTreeMap<usize, bool>> {
    if !shows_results(session) {
        return None;
    }
    match &session.evaluation()?.detail {
        EvaluationDetail::Blanks { results, .. }
        | EvaluationDetail::Statements { results, .. }
        | EvaluationDetail::Connections { results, .. } => Some(results),
        _ => None,
    }
}

/// First letters handed out as hints, by blank.
fn hint_letters(session: &ExerciseSession) -> BTreeMap<usize, char> {
    session
        .hints()
        .iter()
        .filter_map(|hint| match hint {
            Hint::FirstLetter { blank, letter } => Some((*blank, *letter)),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ExerciseConfig, FeedbackMode};
    use crate::error::ExerciseError;
    use crate::types::{ChoiceOption, ChoiceQuestion, CorrectAnswer};
    use pretty_assertions::assert_eq;

    fn session(config: ExerciseConfig) -> ExerciseSession {
        let playable = Playable::MultipleChoice {
            question: ChoiceQuestion {
                question: "¿Capital de España?".into(),
                options: ["Barcelona", "Madrid", "Sevilla"]
                    .iter()
                    .map(|t| ChoiceOption {
                        text: t.to_string(),
                        explanation: None,
                    })
                    .collect(),
                correct_answer: CorrectAnswer::Single(1),
                explanation: Some("Madrid es la capital desde 1561.".into()),
            },
            order: vec![0, 1, 2],
        };
        ExerciseSession::new(playable, config)
    }

    #[test]
    fn feedback_applies_hint_penalty_on_display_only() {
        let mut session = session(ExerciseConfig {
            feedback_mode: FeedbackMode::Instant,
            ..Default::default()
        });
        session.use_hint(None);
        interact(&mut session, Interaction::Select { option: 1 }).unwrap();

        let view = render(&session);
        let feedback = view.feedback.unwrap();
        assert_eq!(feedback.score, 10);
        assert_eq!(feedback.final_score, 8);
        assert_eq!(session.score(), 10);
        assert_eq!(
            feedback.explanation.as_deref(),
            Some("Madrid es la capital desde 1561.")
        );
    }

    #[test]
    fn final_score_never_negative() {
        let mut session = session(ExerciseConfig {
            feedback_mode: FeedbackMode::Instant,
            hint_penalty: 20,
            ..Default::default()
        });
        session.use_hint(None);
        interact(&mut session, Interaction::Select { option: 1 }).unwrap();
        assert_eq!(final_score(&session), 0);
    }

    #[test]
    fn final_score_saturates_on_huge_penalty() {
        let mut session = session(ExerciseConfig {
            feedback_mode: FeedbackMode::Instant,
            hint_penalty: i32::MAX,
            ..Default::default()
        });
        session.use_hint(None);
        session.use_hint(None);
        assert_eq!(session.hints_used(), 2);
        interact(&mut session, Interaction::Select { option: 1 }).unwrap();

        assert_eq!(final_score(&session), 0);
        let feedback = render(&session).feedback.unwrap();
        assert_eq!(feedback.final_score, 0);
    }

    #[test]
    fn no_feedback_before_check() {
        let session = session(ExerciseConfig::default());
        let view = render(&session);
        assert_eq!(view.feedback, None);
        assert!(view.can_check);
        assert_eq!(view.hints_remaining, 2);
    }

    #[test]
    fn hidden_answers_omit_detail() {
        let mut session = session(ExerciseConfig {
            feedback_mode: FeedbackMode::Instant,
            show_correct_answer: false,
            show_explanation: false,
            ..Default::default()
        });
        interact(&mut session, Interaction::Select { option: 0 }).unwrap();
        let feedback = render(&session).feedback.unwrap();
        assert_eq!(feedback.status, Verdict::Incorrect);
        assert_eq!(feedback.detail, None);
        assert_eq!(feedback.explanation, None);
    }

    #[test]
    fn interaction_for_another_type_is_rejected() {
        let mut session = session(ExerciseConfig::default());
        let result = interact(&mut session, Interaction::Toggle { token: 0 });
        assert!(matches!(result, Err(ExerciseError::InvalidAnswerShape { .. })));
    }

    #[test]
    fn interaction_deserializes_from_tagged_json() {
        let interaction: Interaction = serde_json::from_value(serde_json::json!({
            "interaction": "connect",
            "left": 0,
            "right": 2
        }))
        .unwrap();
        assert_eq!(interaction, Interaction::Connect { left: 0, right: 2 });
    }
}
