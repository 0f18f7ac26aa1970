//! Text-format parsers, one per marker section type.
//!
//! # Formats
//! ```text
//! #opcion_multiple
//! ¿Cuál es la capital de España?
//! Barcelona
//! *Madrid
//! Sevilla (correcta)
//!
//! #emparejar
//! perro = dog
//!
//! #verdadero_falso
//! Madrid está en Francia => F
//! El sol es una estrella
//! V
//!
//! #respuesta_libre
//! ¿Cómo te llamas? => Me llamo Ana
//! ```

use tracing::debug;

use crate::error::{ExerciseError, Result};
use crate::markers::{self, ClozeSyntax};
use crate::types::{
    ChoiceOption, ChoiceQuestion, CorrectAnswer, DragDropContent, Exercise, ExerciseType,
    FillBlankContent, MatchPair, MatchingContent, MultipleChoiceContent, OpenQuestion,
    OpenQuestionsContent, TrueFalseContent, TrueFalseStatement, WordHighlightContent,
};

const CORRECT_TAG: &str = "(correcta)";
const ANSWER_SEPARATOR: &str = "=>";

/// Parse one section body as the given exercise type.
pub fn parse_section(kind: ExerciseType, body: &str) -> Result<Exercise> {
    let exercise = match kind {
        ExerciseType::MultipleChoice => Exercise::MultipleChoice(MultipleChoiceContent {
            questions: parse_multiple_choice(body),
        }),
        ExerciseType::FillBlank => Exercise::FillBlank(parse_fill_blank(body, Vec::new())),
        ExerciseType::DragDrop => Exercise::DragDrop(parse_drag_drop(body)),
        ExerciseType::Matching => Exercise::Matching(MatchingContent {
            pairs: parse_matching(body),
            title: None,
        }),
        ExerciseType::TrueFalse => Exercise::TrueFalse(TrueFalseContent {
            statements: parse_true_false(body),
        }),
        ExerciseType::OpenQuestions => Exercise::OpenQuestions(OpenQuestionsContent {
            questions: parse_open_questions(body),
        }),
        ExerciseType::WordHighlight => Exercise::WordHighlight(parse_word_highlight(body)),
        ExerciseType::Text => Exercise::Text(body.to_string()),
        ExerciseType::Chained => Exercise::Chained(crate::chained::parse_chained(body)),
    };

    ensure_playable(&exercise)?;
    Ok(exercise)
}

/// Reject content with nothing for a session to evaluate.
pub fn ensure_playable(exercise: &Exercise) -> Result<()> {
    let empty = match exercise {
        Exercise::MultipleChoice(c) => c.questions.is_empty(),
        Exercise::FillBlank(c) => c.blank_count() == 0,
        Exercise::DragDrop(c) => c.blank_count() == 0,
        Exercise::Matching(c) => c.pairs.is_empty(),
        Exercise::TrueFalse(c) => c.statements.is_empty(),
        Exercise::OpenQuestions(c) => c.questions.is_empty(),
        Exercise::WordHighlight(c) => !c.tokens.iter().any(|t| t.is_target),
        Exercise::Text(_) => false,
        Exercise::Chained(sections) => sections.is_empty(),
    };

    if empty {
        return Err(ExerciseError::EmptyExercise {
            exercise_type: exercise.exercise_type(),
        });
    }
    Ok(())
}

/// Questions separated by blank lines; options marked with `*` or `(correcta)`.
pub fn parse_multiple_choice(body: &str) -> Vec<ChoiceQuestion> {
    blocks(body)
        .into_iter()
        .filter_map(|lines| {
            let question = parse_choice_block(&lines);
            if question.is_none() {
                debug!(block = ?lines.first(), "skipping multiple-choice block without a marked answer");
            }
            question
        })
        .collect()
}

fn parse_choice_block(lines: &[&str]) -> Option<ChoiceQuestion> {
    let (question, option_lines) = lines.split_first()?;
    if option_lines.len() < 2 {
        return None;
    }

    let mut options = Vec::with_capacity(option_lines.len());
    let mut correct = Vec::new();
    for (idx, line) in option_lines.iter().enumerate() {
        let marked = line.starts_with('*') || line.contains(CORRECT_TAG);
        let text = line
            .strip_prefix('*')
            .unwrap_or(line)
            .replace(CORRECT_TAG, "")
            .trim()
            .to_string();
        if marked {
            correct.push(idx);
        }
        options.push(ChoiceOption {
            text,
            explanation: None,
        });
    }

    let correct_answer = match correct.as_slice() {
        [] => return None,
        [single] => CorrectAnswer::Single(*single),
        _ => CorrectAnswer::Multiple(correct),
    };

    Some(ChoiceQuestion {
        question: question.to_string(),
        options,
        correct_answer,
        explanation: None,
    })
}

pub fn parse_fill_blank(text: &str, answers: Vec<String>) -> FillBlankContent {
    let mut segments = markers::parse_cloze(text, ClozeSyntax::Extended);

    // Blanks written without a word take theirs from `answers`, by order.
    let mut supplied = answers.iter();
    for segment in &mut segments {
        if let crate::types::Segment::Blank {
            correct_word,
            alternates,
            ..
        } = segment
        {
            let answer = supplied.next();
            if correct_word.is_empty() {
                if let Some(answer) = answer {
                    let (word, alts) = markers::split_alternates(answer);
                    *correct_word = word;
                    *alternates = alts;
                }
            }
        }
    }

    FillBlankContent {
        text: text.to_string(),
        segments,
        answers,
    }
}

pub fn parse_drag_drop(text: &str) -> DragDropContent {
    DragDropContent {
        text: text.to_string(),
        segments: markers::parse_cloze(text, ClozeSyntax::Stars),
    }
}

pub fn parse_word_highlight(text: &str) -> WordHighlightContent {
    WordHighlightContent {
        text: text.to_string(),
        tokens: markers::parse_highlight_tokens(text),
    }
}

/// `left = right` lines.
pub fn parse_matching(body: &str) -> Vec<MatchPair> {
    non_empty_lines(body)
        .filter_map(|line| parse_pair(line))
        .collect()
}

pub(crate) fn parse_pair(line: &str) -> Option<MatchPair> {
    let mut parts = line.split('=');
    let left = parts.next()?.trim();
    let right = parts.next()?.trim();
    if parts.next().is_some() || left.is_empty() || right.is_empty() {
        return None;
    }
    Some(MatchPair {
        left: left.to_string(),
        right: right.to_string(),
    })
}

/// `statement => V` inline, or a statement followed by a verdict line.
pub fn parse_true_false(body: &str) -> Vec<TrueFalseStatement> {
    let lines: Vec<&str> = non_empty_lines(body).collect();
    let mut statements = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        let line = lines[i];
        if let Some((statement, verdict)) = line.rsplit_once(ANSWER_SEPARATOR) {
            if let Some(correct) = parse_verdict(verdict) {
                statements.push(TrueFalseStatement {
                    statement: statement.trim().to_string(),
                    correct,
                    explanation: None,
                });
                i += 1;
                continue;
            }
        }

        match lines.get(i + 1).and_then(|next| parse_verdict(next)) {
            Some(correct) => {
                statements.push(TrueFalseStatement {
                    statement: line.to_string(),
                    correct,
                    explanation: None,
                });
                i += 2;
            }
            None => {
                debug!(line, "skipping statement without a verdict");
                i += 1;
            }
        }
    }

    statements
}

/// TRUE/FALSE, VERDADERO/FALSO or V/F, any case.
pub fn parse_verdict(token: &str) -> Option<bool> {
    match token.trim().to_uppercase().as_str() {
        "TRUE" | "VERDADERO" | "V" => Some(true),
        "FALSE" | "FALSO" | "F" => Some(false),
        _ => None,
    }
}

/// One question per line, optionally `question => expected answer`.
pub fn parse_open_questions(body: &str) -> Vec<OpenQuestion> {
    non_empty_lines(body)
        .map(|line| match line.split_once(ANSWER_SEPARATOR) {
            Some((question, answer)) => OpenQuestion {
                question: question.trim().to_string(),
                answer: Some(answer.trim().to_string()).filter(|a| !a.is_empty()),
                hint: None,
                points: None,
            },
            None => OpenQuestion {
                question: line.to_string(),
                answer: None,
                hint: None,
                points: None,
            },
        })
        .collect()
}

fn non_empty_lines(body: &str) -> impl Iterator<Item = &str> {
    body.lines().map(str::trim).filter(|l| !l.is_empty())
}

/// Groups of trimmed non-empty lines separated by blank lines.
fn blocks(body: &str) -> Vec<Vec<&str>> {
    let mut blocks = Vec::new();
    let mut current = Vec::new();

    for line in body.lines().map(str::trim) {
        if line.is_empty() {
            if !current.is_empty() {
                blocks.push(std::mem::take(&mut current));
            }
        } else {
            current.push(line);
        }
    }
    if !current.is_empty() {
        blocks.push(current);
    }

    blocks
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parse_single_answer_question() {
        let body = "¿Capital de España?\nBarcelona\n*Madrid\nSevilla";
        let questions = parse_multiple_choice(body);
        assert_eq!(questions.len(), 1);
        assert_eq!(questions[0].question, "¿Capital de España?");
        assert_eq!(questions[0].options[1].text, "Madrid");
        assert_eq!(questions[0].correct_answer, CorrectAnswer::Single(1));
    }

    #[test]
    fn parse_multi_answer_question_with_tag() {
        let body = "¿Verbos?\n*correr\ncasa\nsaltar (correcta)";
        let questions = parse_multiple_choice(body);
        assert_eq!(questions[0].correct_answer, CorrectAnswer::Multiple(vec![0, 2]));
        assert_eq!(questions[0].options[2].text, "saltar");
    }

    #[test]
    fn skip_question_without_marked_option() {
        let body = "¿Uno?\na\nb\n\n¿Dos?\n*a\nb";
        let questions = parse_multiple_choice(body);
        assert_eq!(questions.len(), 1);
        assert_eq!(questions[0].question, "¿Dos?");
    }

    #[test]
    fn parse_matching_lines() {
        let pairs = parse_matching("perro = dog\nsin pareja\ngato=cat\na = b = c");
        assert_eq!(
            pairs,
            vec![
                MatchPair {
                    left: "perro".into(),
                    right: "dog".into()
                },
                MatchPair {
                    left: "gato".into(),
                    right: "cat".into()
                },
            ]
        );
    }

    #[test]
    fn parse_true_false_both_forms() {
        let body = "Madrid está en Francia => F\nEl sol es una estrella\nverdadero\nSin veredicto";
        let statements = parse_true_false(body);
        assert_eq!(statements.len(), 2);
        assert_eq!(statements[0].statement, "Madrid está en Francia");
        assert!(!statements[0].correct);
        assert_eq!(statements[1].statement, "El sol es una estrella");
        assert!(statements[1].correct);
    }

    #[test]
    fn parse_open_questions_with_expected_answer() {
        let questions = parse_open_questions("¿Cómo te llamas? => Me llamo Ana\n¿Y tú?");
        assert_eq!(questions[0].answer.as_deref(), Some("Me llamo Ana"));
        assert_eq!(questions[1].answer, None);
    }

    #[test]
    fn fill_blank_answers_fill_empty_blanks() {
        let content = parse_fill_blank(
            "Vivo en ___ y trabajo en *Sevilla*.",
            vec!["Madrid|madrid".into(), "ignored".into()],
        );
        let blanks: Vec<_> = content.blanks().collect();
        assert_eq!(blanks[0].correct_word, "Madrid");
        assert_eq!(blanks[0].alternates, ["madrid".to_string()]);
        assert_eq!(blanks[1].correct_word, "Sevilla");
    }

    #[test]
    fn empty_section_is_rejected() {
        let result = parse_section(ExerciseType::Matching, "nada que emparejar");
        assert!(matches!(
            result,
            Err(ExerciseError::EmptyExercise {
                exercise_type: ExerciseType::Matching
            })
        ));
    }
}
