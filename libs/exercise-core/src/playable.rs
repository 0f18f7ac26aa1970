//! Mounted form of an exercise: canonical content plus the display
//! order fixed when the session starts.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::config::ExerciseConfig;
use crate::error::{ExerciseError, Result};
use crate::types::{
    AnswerShape, ChoiceQuestion, DragDropContent, Exercise, ExerciseType, FillBlankContent,
    MatchingContent, OpenQuestionsContent, TrueFalseContent, UserAnswer, WordBankEntry,
    WordHighlightContent,
};

/// What one session plays. Multiple-choice content is split into one
/// playable per question.
#[derive(Debug, Clone, PartialEq)]
pub enum Playable {
    MultipleChoice {
        question: ChoiceQuestion,
        /// Original option indices in display order.
        order: Vec<usize>,
    },
    FillBlank(FillBlankContent),
    DragDrop {
        content: DragDropContent,
        /// Word bank in display order.
        bank: Vec<WordBankEntry>,
    },
    Matching {
        content: MatchingContent,
        /// `right_order[displayed]` is the original index of that right item.
        right_order: Vec<usize>,
    },
    TrueFalse(TrueFalseContent),
    OpenQuestions(OpenQuestionsContent),
    WordHighlight(WordHighlightContent),
}

impl Playable {
    /// Mount every playable in `exercise`, shuffling display orders with `rng`.
    pub fn mount_all<R: Rng + ?Sized>(
        exercise: &Exercise,
        config: &ExerciseConfig,
        rng: &mut R,
    ) -> Result<Vec<Self>> {
        build(exercise, config.shuffle_options, &mut |order: &mut [usize]| {
            order.shuffle(&mut *rng)
        })
    }

    /// Mount with every display order left as authored.
    pub fn unshuffled(exercise: &Exercise) -> Result<Vec<Self>> {
        build(exercise, false, &mut |_: &mut [usize]| {})
    }

    pub fn exercise_type(&self) -> ExerciseType {
        match self {
            Self::MultipleChoice { .. } => ExerciseType::MultipleChoice,
            Self::FillBlank(_) => ExerciseType::FillBlank,
            Self::DragDrop { .. } => ExerciseType::DragDrop,
            Self::Matching { .. } => ExerciseType::Matching,
            Self::TrueFalse(_) => ExerciseType::TrueFalse,
            Self::OpenQuestions(_) => ExerciseType::OpenQuestions,
            Self::WordHighlight(_) => ExerciseType::WordHighlight,
        }
    }

    /// The answer shape this playable accepts.
    pub fn expected_shape(&self) -> AnswerShape {
        match self {
            Self::MultipleChoice { question, .. } if question.correct_answer.is_multi() => {
                AnswerShape::Choices
            }
            Self::MultipleChoice { .. } => AnswerShape::Choice,
            Self::FillBlank(_) => AnswerShape::Blanks,
            Self::DragDrop { .. } => AnswerShape::Placements,
            Self::Matching { .. } => AnswerShape::Connections,
            Self::TrueFalse(_) => AnswerShape::Verdicts,
            Self::OpenQuestions(_) => AnswerShape::Responses,
            Self::WordHighlight(_) => AnswerShape::Clicks,
        }
    }

    /// Check shape and index ranges of an answer.
    pub fn validate(&self, answer: &UserAnswer) -> Result<()> {
        let expected = self.expected_shape();
        if answer.shape() != expected {
            return Err(ExerciseError::InvalidAnswerShape {
                expected,
                found: answer.shape(),
            });
        }

        match (self, answer) {
            (Self::MultipleChoice { question, .. }, UserAnswer::Choice(index)) => {
                in_range(*index, question.options.len())
            }
            (Self::MultipleChoice { question, .. }, UserAnswer::Choices(indices)) => {
                all_in_range(indices.iter().copied(), question.options.len())
            }
            (Self::FillBlank(content), UserAnswer::Blanks(values)) => {
                all_in_range(values.keys().copied(), content.blank_count())
            }
            (Self::DragDrop { content, bank }, UserAnswer::Placements(placements)) => {
                all_in_range(placements.keys().copied(), content.blank_count())?;
                all_in_range(placements.values().copied(), bank.len())
            }
            (Self::Matching { content, .. }, UserAnswer::Connections(connections)) => {
                all_in_range(connections.keys().copied(), content.pairs.len())?;
                all_in_range(connections.values().copied(), content.pairs.len())
            }
            (Self::TrueFalse(content), UserAnswer::Verdicts(verdicts)) => {
                all_in_range(verdicts.keys().copied(), content.statements.len())
            }
            (Self::OpenQuestions(content), UserAnswer::Responses(responses)) => {
                all_in_range(responses.keys().copied(), content.questions.len())
            }
            (Self::WordHighlight(content), UserAnswer::Clicks(clicks)) => {
                all_in_range(clicks.iter().copied(), content.tokens.len())
            }
            _ => Err(ExerciseError::InvalidAnswerShape {
                expected,
                found: answer.shape(),
            }),
        }
    }

    /// Whether the answer fills every slot, so instant feedback can score it.
    ///
    /// Word highlighting has no natural end and always waits for a check.
    pub fn is_complete(&self, answer: &UserAnswer) -> bool {
        match (self, answer) {
            (Self::MultipleChoice { .. }, UserAnswer::Choice(_)) => true,
            (Self::MultipleChoice { question, .. }, UserAnswer::Choices(selected)) => {
                selected.len() == question.correct_answer.indices().len()
            }
            (Self::FillBlank(content), UserAnswer::Blanks(values)) => (0..content.blank_count())
                .all(|i| values.get(&i).map_or(false, |v| !v.trim().is_empty())),
            (Self::DragDrop { content, .. }, UserAnswer::Placements(placements)) => {
                placements.len() == content.blank_count()
            }
            (Self::Matching { content, .. }, UserAnswer::Connections(connections)) => {
                connections.len() == content.pairs.len()
            }
            (Self::TrueFalse(content), UserAnswer::Verdicts(verdicts)) => {
                verdicts.len() == content.statements.len()
            }
            (Self::OpenQuestions(content), UserAnswer::Responses(responses)) => {
                (0..content.questions.len())
                    .all(|i| responses.get(&i).map_or(false, |r| !r.trim().is_empty()))
            }
            _ => false,
        }
    }

    /// Question-level explanation, when the content has one.
    pub fn explanation(&self) -> Option<&str> {
        match self {
            Self::MultipleChoice { question, .. } => question.explanation.as_deref(),
            _ => None,
        }
    }
}

fn in_range(index: usize, len: usize) -> Result<()> {
    if index < len {
        Ok(())
    } else {
        Err(ExerciseError::AnswerOutOfRange { index, len })
    }
}

fn all_in_range(indices: impl IntoIterator<Item = usize>, len: usize) -> Result<()> {
    indices.into_iter().try_for_each(|index| in_range(index, len))
}

fn build(
    exercise: &Exercise,
    shuffle_options: bool,
    shuffle: &mut dyn FnMut(&mut [usize]),
) -> Result<Vec<Playable>> {
    let playables = match exercise {
        Exercise::MultipleChoice(content) => content
            .questions
            .iter()
            .map(|question| {
                let mut order: Vec<usize> = (0..question.options.len()).collect();
                if shuffle_options {
                    shuffle(order.as_mut_slice());
                }
                Playable::MultipleChoice {
                    question: question.clone(),
                    order,
                }
            })
            .collect(),
        Exercise::FillBlank(content) => vec![Playable::FillBlank(content.clone())],
        Exercise::DragDrop(content) => {
            let words = content.words();
            let mut order: Vec<usize> = (0..words.len()).collect();
            shuffle(order.as_mut_slice());
            let bank = order.iter().map(|&i| words[i].clone()).collect();
            vec![Playable::DragDrop {
                content: content.clone(),
                bank,
            }]
        }
        Exercise::Matching(content) => {
            let mut right_order: Vec<usize> = (0..content.pairs.len()).collect();
            shuffle(right_order.as_mut_slice());
            vec![Playable::Matching {
                content: content.clone(),
                right_order,
            }]
        }
        Exercise::TrueFalse(content) => vec![Playable::TrueFalse(content.clone())],
        Exercise::OpenQuestions(content) => vec![Playable::OpenQuestions(content.clone())],
        Exercise::WordHighlight(content) => vec![Playable::WordHighlight(content.clone())],
        Exercise::Text(_) | Exercise::Chained(_) => return Err(ExerciseError::NotInteractive),
    };

    if playables.is_empty() {
        return Err(ExerciseError::EmptyExercise {
            exercise_type: exercise.exercise_type(),
        });
    }
    Ok(playables)
}
