use serde::Serialize;
use std::collections::BTreeMap;

use super::{keyed_results, reveals_answers};
use crate::error::Result;
use crate::session::{ExerciseSession, Hint};
use crate::types::{MatchingContent, UserAnswer};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchingView {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub left: Vec<LeftItemView>,
    /// Right column in shuffled display order.
    pub right: Vec<RightItemView>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeftItemView {
    pub index: usize,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connected_to: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correct: Option<bool>,
    /// Displayed right index of the true match, from a hint or on reveal.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revealed_match: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RightItemView {
    pub index: usize,
    pub text: String,
    pub connected: bool,
}

fn connections(session: &ExerciseSession) -> BTreeMap<usize, usize> {
    match session.user_answer() {
        Some(UserAnswer::Connections(connections)) => connections.clone(),
        _ => BTreeMap::new(),
    }
}

pub fn render(
    content: &MatchingContent,
    right_order: &[usize],
    session: &ExerciseSession,
) -> MatchingView {
    let connections = connections(session);
    let results = keyed_results(session);
    let reveal = reveals_answers(session);
    let hinted: BTreeMap<usize, usize> = session
        .hints()
        .iter()
        .filter_map(|hint| match hint {
            Hint::RevealPair { left, right } => Some((*left, *right)),
            _ => None,
        })
        .collect();

    let left = content
        .pairs
        .iter()
        .enumerate()
        .map(|(index, pair)| {
            let true_match = right_order.iter().position(|&original| original == index);
            LeftItemView {
                index,
                text: pair.left.clone(),
                connected_to: connections.get(&index).copied(),
                correct: results.and_then(|r| r.get(&index).copied()),
                revealed_match: if reveal {
                    true_match
                } else {
                    hinted.get(&index).copied()
                },
            }
        })
        .collect();

    let right = right_order
        .iter()
        .enumerate()
        .filter_map(|(index, &original)| {
            let pair = content.pairs.get(original)?;
            Some(RightItemView {
                index,
                text: pair.right.clone(),
                connected: connections.values().any(|&r| r == index),
            })
        })
        .collect();

    MatchingView {
        title: content.title.clone(),
        left,
        right,
    }
}

/// Connect a left item to a displayed right item. Each side holds at most
/// one connection; an older connection on either item is dropped.
pub fn connect(session: &mut ExerciseSession, left: usize, right: usize) -> Result<()> {
    let mut connections = connections(session);
    connections.retain(|_, r| *r != right);
    connections.insert(left, right);
    session.set_answer(UserAnswer::Connections(connections))
}

pub fn disconnect(session: &mut ExerciseSession, left: usize) -> Result<()> {
    let mut connections = connections(session);
    connections.remove(&left);
    session.set_answer(UserAnswer::Connections(connections))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ExerciseConfig, FeedbackMode};
    use crate::evaluate::Verdict;
    use crate::playable::Playable;
    use crate::types::MatchPair;
    use pretty_assertions::assert_eq;

    fn session(mode: FeedbackMode) -> ExerciseSession {
        let content = MatchingContent {
            pairs: vec![
                MatchPair {
                    left: "perro".into(),
                    right: "dog".into(),
                },
                MatchPair {
                    left: "gato".into(),
                    right: "cat".into(),
                },
                MatchPair {
                    left: "casa".into(),
                    right: "house".into(),
                },
            ],
            title: Some("Animales y cosas".into()),
        };
        ExerciseSession::new(
            Playable::Matching {
                content,
                right_order: vec![2, 0, 1],
            },
            ExerciseConfig {
                feedback_mode: mode,
                ..Default::default()
            },
        )
    }

    fn view(session: &ExerciseSession) -> MatchingView {
        match session.playable() {
            Playable::Matching {
                content,
                right_order,
            } => render(content, right_order, session),
            other => panic!("unexpected playable {other:?}"),
        }
    }

    #[test]
    fn right_column_uses_display_order() {
        let session = session(FeedbackMode::OnSubmit);
        let right: Vec<String> = view(&session).right.into_iter().map(|r| r.text).collect();
        assert_eq!(right, vec!["house", "dog", "cat"]);
    }

    #[test]
    fn connecting_a_taken_right_item_moves_it() {
        let mut session = session(FeedbackMode::OnSubmit);
        connect(&mut session, 0, 1).unwrap();
        connect(&mut session, 1, 1).unwrap();
        assert_eq!(
            session.user_answer(),
            Some(&UserAnswer::Connections(BTreeMap::from([(1, 1)])))
        );
        disconnect(&mut session, 1).unwrap();
        assert!(view(&session).right.iter().all(|r| !r.connected));
    }

    #[test]
    fn full_board_checks_in_instant_mode() {
        let mut session = session(FeedbackMode::Instant);
        connect(&mut session, 0, 1).unwrap();
        connect(&mut session, 1, 0).unwrap();
        connect(&mut session, 2, 2).unwrap();
        assert_eq!(session.evaluation().map(|e| e.status), Some(Verdict::Partial));

        let left = view(&session).left;
        let marks: Vec<(Option<bool>, Option<usize>)> =
            left.iter().map(|l| (l.correct, l.revealed_match)).collect();
        assert_eq!(
            marks,
            vec![(Some(true), Some(1)), (Some(false), Some(2)), (Some(false), Some(0))]
        );
    }

    #[test]
    fn reveal_pair_hint_is_shown_before_check() {
        let mut session = session(FeedbackMode::OnSubmit);
        assert_eq!(
            session.use_hint(None),
            Some(Hint::RevealPair { left: 0, right: 1 })
        );
        assert_eq!(view(&session).left[0].revealed_match, Some(1));
        assert_eq!(view(&session).left[1].revealed_match, None);
    }
}
