use serde::Serialize;
use std::collections::BTreeMap;

use super::{keyed_results, reveals_answers, shows_explanations};
use crate::error::Result;
use crate::session::ExerciseSession;
use crate::types::{TrueFalseContent, UserAnswer};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrueFalseView {
    pub statements: Vec<StatementView>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatementView {
    pub index: usize,
    pub statement: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chosen: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correct: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

fn verdicts(session: &ExerciseSession) -> BTreeMap<usize, bool> {
    match session.user_answer() {
        Some(UserAnswer::Verdicts(verdicts)) => verdicts.clone(),
        _ => BTreeMap::new(),
    }
}

pub fn render(content: &TrueFalseContent, session: &ExerciseSession) -> TrueFalseView {
    let chosen = verdicts(session);
    let results = keyed_results(session);
    let reveal = reveals_answers(session);
    let explain = shows_explanations(session);

    TrueFalseView {
        statements: content
            .statements
            .iter()
            .enumerate()
            .map(|(index, s)| StatementView {
                index,
                statement: s.statement.clone(),
                chosen: chosen.get(&index).copied(),
                correct: results.and_then(|r| r.get(&index).copied()),
                answer: reveal.then_some(s.correct),
                explanation: s.explanation.clone().filter(|_| explain),
            })
            .collect(),
    }
}

pub fn choose(session: &mut ExerciseSession, statement: usize, verdict: bool) -> Result<()> {
    let mut verdicts = verdicts(session);
    verdicts.insert(statement, verdict);
    session.set_answer(UserAnswer::Verdicts(verdicts))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ExerciseConfig, FeedbackMode};
    use crate::error::ExerciseError;
    use crate::parser;
    use crate::playable::Playable;
    use pretty_assertions::assert_eq;

    fn session(mode: FeedbackMode) -> ExerciseSession {
        let statements = parser::parse_true_false(
            "El sol es una estrella => V\nMadrid está en Francia => F",
        );
        ExerciseSession::new(
            Playable::TrueFalse(TrueFalseContent { statements }),
            ExerciseConfig {
                feedback_mode: mode,
                ..Default::default()
            },
        )
    }

    fn view(session: &ExerciseSession) -> TrueFalseView {
        match session.playable() {
            Playable::TrueFalse(content) => render(content, session),
            other => panic!("unexpected playable {other:?}"),
        }
    }

    #[test]
    fn answers_hidden_until_checked() {
        let mut session = session(FeedbackMode::Instant);
        choose(&mut session, 0, true).unwrap();
        let first = &view(&session).statements[0];
        assert_eq!(first.chosen, Some(true));
        assert_eq!(first.answer, None);
        assert_eq!(first.correct, None);

        choose(&mut session, 1, true).unwrap();
        let marks: Vec<(Option<bool>, Option<bool>)> = view(&session)
            .statements
            .iter()
            .map(|s| (s.correct, s.answer))
            .collect();
        assert_eq!(marks, vec![(Some(true), Some(true)), (Some(false), Some(false))]);
    }

    #[test]
    fn out_of_range_statement_is_rejected() {
        let mut session = session(FeedbackMode::OnSubmit);
        let result = choose(&mut session, 5, false);
        assert!(matches!(
            result,
            Err(ExerciseError::AnswerOutOfRange { index: 5, len: 2 })
        ));
    }
}
