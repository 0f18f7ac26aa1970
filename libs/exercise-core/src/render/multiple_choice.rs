use serde::Serialize;
use std::collections::BTreeSet;

use super::{reveals_answers, shows_explanations, shows_results};
use crate::error::Result;
use crate::playable::Playable;
use crate::session::ExerciseSession;
use crate::types::{ChoiceQuestion, UserAnswer};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChoiceView {
    pub question: String,
    pub multi_select: bool,
    /// Options in display order.
    pub options: Vec<OptionView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionView {
    /// Original option index, used in answers.
    pub index: usize,
    pub letter: char,
    pub text: String,
    pub selected: bool,
    pub eliminated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verdict: Option<OptionVerdict>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OptionVerdict {
    Correct,
    Wrong,
}

fn selected(session: &ExerciseSession) -> BTreeSet<usize> {
    match session.user_answer() {
        Some(UserAnswer::Choice(index)) => BTreeSet::from([*index]),
        Some(UserAnswer::Choices(indices)) => indices.clone(),
        _ => BTreeSet::new(),
    }
}

pub fn render(question: &ChoiceQuestion, order: &[usize], session: &ExerciseSession) -> ChoiceView {
    let selected = selected(session);
    let reveal = reveals_answers(session);
    let judged = shows_results(session);
    let explain = shows_explanations(session);

    let options = order
        .iter()
        .enumerate()
        .filter_map(|(position, &index)| {
            let option = question.options.get(index)?;
            let is_selected = selected.contains(&index);
            let is_correct = question.correct_answer.contains(index);
            let verdict = if is_correct && (reveal || (judged && is_selected)) {
                Some(OptionVerdict::Correct)
            } else if judged && is_selected && !is_correct {
                Some(OptionVerdict::Wrong)
            } else {
                None
            };

            Some(OptionView {
                index,
                letter: char::from_u32('A' as u32 + position as u32).unwrap_or('?'),
                text: option.text.clone(),
                selected: is_selected,
                eliminated: session.eliminated_options().contains(&index),
                verdict,
                explanation: option.explanation.clone().filter(|_| explain),
            })
        })
        .collect();

    ChoiceView {
        question: question.question.clone(),
        multi_select: question.correct_answer.is_multi(),
        options,
        explanation: question.explanation.clone().filter(|_| explain),
    }
}

/// Pick an option. Multi-select questions toggle it in the selection.
pub fn select(session: &mut ExerciseSession, option: usize) -> Result<()> {
    let multi = matches!(
        session.playable(),
        Playable::MultipleChoice { question, .. } if question.correct_answer.is_multi()
    );
    if !multi {
        return session.set_answer(UserAnswer::Choice(option));
    }

    let mut chosen = selected(session);
    if !chosen.remove(&option) {
        chosen.insert(option);
    }
    session.set_answer(UserAnswer::Choices(chosen))
}
