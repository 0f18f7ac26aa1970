use serde::Serialize;
use std::collections::BTreeSet;

use super::{reveals_answers, shows_results};
use crate::error::Result;
use crate::evaluate::EvaluationDetail;
use crate::playable::Playable;
use crate::session::{ExerciseSession, Hint};
use crate::types::{UserAnswer, WordHighlightContent};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HighlightView {
    pub tokens: Vec<TokenView>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenView {
    pub index: usize,
    pub text: String,
    pub is_line_break: bool,
    pub clicked: bool,
    pub hinted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<TokenState>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenState {
    Correct,
    FalsePositive,
    /// A target the learner did not click; shown only when answers are revealed.
    Missed,
}

fn clicks(session: &ExerciseSession) -> BTreeSet<usize> {
    match session.user_answer() {
        Some(UserAnswer::Clicks(clicks)) => clicks.clone(),
        _ => BTreeSet::new(),
    }
}

pub fn render(content: &WordHighlightContent, session: &ExerciseSession) -> HighlightView {
    let clicked = clicks(session);
    let reveal = reveals_answers(session);
    let hinted: BTreeSet<usize> = session
        .hints()
        .iter()
        .filter_map(|hint| match hint {
            Hint::RevealTarget { token } => Some(*token),
            _ => None,
        })
        .collect();

    let detail = match session.evaluation().map(|e| &e.detail) {
        Some(EvaluationDetail::Highlights {
            correct_clicks,
            false_positives,
            missed,
        }) if shows_results(session) => Some((correct_clicks, false_positives, missed)),
        _ => None,
    };

    let tokens = content
        .tokens
        .iter()
        .enumerate()
        .map(|(index, token)| {
            let state = detail.and_then(|(correct, wrong, missed)| {
                if correct.contains(&index) {
                    Some(TokenState::Correct)
                } else if wrong.contains(&index) {
                    Some(TokenState::FalsePositive)
                } else if reveal && missed.contains(&index) {
                    Some(TokenState::Missed)
                } else {
                    None
                }
            });
            TokenView {
                index,
                text: token.text.clone(),
                is_line_break: token.is_line_break,
                clicked: clicked.contains(&index),
                hinted: hinted.contains(&index),
                state,
            }
        })
        .collect();

    HighlightView { tokens }
}

/// Click a token on or off. Line breaks are not clickable.
pub fn toggle(session: &mut ExerciseSession, token: usize) -> Result<()> {
    let mut clicked = clicks(session);
    if let Playable::WordHighlight(content) = session.playable() {
        if content.tokens.get(token).map_or(false, |t| t.is_line_break) {
            return Ok(());
        }
    }
    if !clicked.remove(&token) {
        clicked.insert(token);
    }
    session.set_answer(UserAnswer::Clicks(clicked))
}
