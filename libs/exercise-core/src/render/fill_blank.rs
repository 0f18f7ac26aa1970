use serde::Serialize;
use std::collections::BTreeMap;

use super::{hint_letters, keyed_results, reveals_answers};
use crate::error::Result;
use crate::session::ExerciseSession;
use crate::types::{FillBlankContent, Segment, UserAnswer};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FillBlankView {
    pub segments: Vec<SegmentView>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SegmentView {
    Text {
        content: String,
    },
    Blank {
        index: usize,
        value: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        hint: Option<char>,
        #[serde(skip_serializing_if = "Option::is_none")]
        correct: Option<bool>,
        #[serde(skip_serializing_if = "Option::is_none")]
        expected: Option<String>,
    },
}

fn typed(session: &ExerciseSession) -> BTreeMap<usize, String> {
    match session.user_answer() {
        Some(UserAnswer::Blanks(values)) => values.clone(),
        _ => BTreeMap::new(),
    }
}

pub fn render(content: &FillBlankContent, session: &ExerciseSession) -> FillBlankView {
    let values = typed(session);
    let results = keyed_results(session);
    let letters = hint_letters(session);
    let reveal = reveals_answers(session);

    let segments = content
        .segments
        .iter()
        .map(|segment| match segment {
            Segment::Text { content } => SegmentView::Text {
                content: content.clone(),
            },
            Segment::Blank {
                index,
                correct_word,
                ..
            } => SegmentView::Blank {
                index: *index,
                value: values.get(index).cloned().unwrap_or_default(),
                hint: letters.get(index).copied(),
                correct: results.and_then(|r| r.get(index).copied()),
                expected: reveal.then(|| correct_word.clone()),
            },
        })
        .collect();

    FillBlankView { segments }
}

/// Replace the text typed into one blank. Clearing a blank removes it.
pub fn type_blank(session: &mut ExerciseSession, blank: usize, text: String) -> Result<()> {
    let mut values = typed(session);
    if text.is_empty() {
        values.remove(&blank);
    } else {
        values.insert(blank, text);
    }
    session.set_answer(UserAnswer::Blanks(values))
}
