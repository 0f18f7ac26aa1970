use serde::Serialize;
use std::collections::BTreeMap;

use super::{hint_letters, keyed_results, reveals_answers};
use crate::error::Result;
use crate::session::ExerciseSession;
use crate::types::{DragDropContent, Segment, UserAnswer, WordBankEntry};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DragDropView {
    pub segments: Vec<DropSegmentView>,
    pub bank: Vec<BankWordView>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DropSegmentView {
    Text {
        content: String,
    },
    Slot {
        index: usize,
        #[serde(skip_serializing_if = "Option::is_none")]
        placed: Option<PlacedWord>,
        #[serde(skip_serializing_if = "Option::is_none")]
        hint: Option<char>,
        #[serde(skip_serializing_if = "Option::is_none")]
        correct: Option<bool>,
        #[serde(skip_serializing_if = "Option::is_none")]
        expected: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlacedWord {
    pub word: usize,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BankWordView {
    /// Position in the displayed bank, used in answers.
    pub word: usize,
    pub text: String,
    pub used: bool,
}

fn placements(session: &ExerciseSession) -> BTreeMap<usize, usize> {
    match session.user_answer() {
        Some(UserAnswer::Placements(placements)) => placements.clone(),
        _ => BTreeMap::new(),
    }
}

pub fn render(
    content: &DragDropContent,
    bank: &[WordBankEntry],
    session: &ExerciseSession,
) -> DragDropView {
    let placements = placements(session);
    let results = keyed_results(session);
    let letters = hint_letters(session);
    let reveal = reveals_answers(session);

    let segments = content
        .segments
        .iter()
        .map(|segment| match segment {
            Segment::Text { content } => DropSegmentView::Text {
                content: content.clone(),
            },
            Segment::Blank {
                index,
                correct_word,
                ..
            } => DropSegmentView::Slot {
                index: *index,
                placed: placements.get(index).and_then(|&word| {
                    bank.get(word).map(|entry| PlacedWord {
                        word,
                        text: entry.word.clone(),
                    })
                }),
                hint: letters.get(index).copied(),
                correct: results.and_then(|r| r.get(index).copied()),
                expected: reveal.then(|| correct_word.clone()),
            },
        })
        .collect();

    let bank = bank
        .iter()
        .enumerate()
        .map(|(word, entry)| BankWordView {
            word,
            text: entry.word.clone(),
            used: placements.values().any(|&placed| placed == word),
        })
        .collect();

    DragDropView { segments, bank }
}

/// Drop a bank word into a blank. A word sits in one blank at a time.
pub fn place(session: &mut ExerciseSession, blank: usize, word: usize) -> Result<()> {
    let mut placements = placements(session);
    placements.retain(|_, placed| *placed != word);
    placements.insert(blank, word);
    session.set_answer(UserAnswer::Placements(placements))
}

/// Send the word in a blank back to the bank.
pub fn clear(session: &mut ExerciseSession, blank: usize) -> Result<()> {
    let mut placements = placements(session);
    placements.remove(&blank);
    session.set_answer(UserAnswer::Placements(placements))
}
