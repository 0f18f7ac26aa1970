//! Answer evaluation for every exercise type.
//!
//! All functions are pure: they compare an answer against mounted content
//! and never touch session state.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use unicode_normalization::UnicodeNormalization;

use crate::config::ExerciseConfig;
use crate::error::{ExerciseError, Result};
use crate::playable::Playable;
use crate::types::{
    ChoiceQuestion, DragDropContent, FillBlankContent, OpenQuestionsContent, TrueFalseContent,
    UserAnswer, WordBankEntry, WordHighlightContent,
};

/// Overall outcome of a check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Correct,
    Partial,
    Incorrect,
}

impl Verdict {
    /// Points awarded for this verdict.
    pub fn points(&self, config: &ExerciseConfig) -> i32 {
        match self {
            Self::Correct => config.correct_points,
            Self::Partial => config.partial_points,
            Self::Incorrect => config.incorrect_points,
        }
    }
}

/// Result of comparing one free response to its expected answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseResult {
    pub status: Verdict,
    /// Word-overlap ratio between 0.0 and 1.0.
    pub overlap: f64,
    pub given_normalized: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_normalized: Option<String>,
}

/// Per-type breakdown of an evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EvaluationDetail {
    Unanswered,
    Choice {
        selected: BTreeSet<usize>,
        correct: BTreeSet<usize>,
    },
    Blanks {
        results: BTreeMap<usize, bool>,
        correct_count: usize,
        total: usize,
    },
    Statements {
        results: BTreeMap<usize, bool>,
        correct_count: usize,
        total: usize,
    },
    Connections {
        results: BTreeMap<usize, bool>,
        correct_count: usize,
        total: usize,
    },
    Responses {
        results: BTreeMap<usize, ResponseResult>,
        correct_count: usize,
        total: usize,
    },
    Highlights {
        correct_clicks: BTreeSet<usize>,
        false_positives: BTreeSet<usize>,
        missed: BTreeSet<usize>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub status: Verdict,
    pub detail: EvaluationDetail,
}

impl Evaluation {
    pub fn unanswered() -> Self {
        Self {
            status: Verdict::Incorrect,
            detail: EvaluationDetail::Unanswered,
        }
    }

    pub fn is_correct(&self) -> bool {
        self.status == Verdict::Correct
    }
}

/// Evaluate an answer against mounted content.
///
/// A missing answer is incorrect. An answer of the wrong shape is an error.
pub fn evaluate(
    playable: &Playable,
    answer: Option<&UserAnswer>,
    config: &ExerciseConfig,
) -> Result<Evaluation> {
    let Some(answer) = answer else {
        return Ok(Evaluation::unanswered());
    };
    playable.validate(answer)?;

    let evaluation = match (playable, answer) {
        (Playable::MultipleChoice { question, .. }, UserAnswer::Choice(selected)) => {
            evaluate_choice(question, &BTreeSet::from([*selected]))
        }
        (Playable::MultipleChoice { question, .. }, UserAnswer::Choices(selected)) => {
            evaluate_choice(question, selected)
        }
        (Playable::FillBlank(content), UserAnswer::Blanks(values)) => {
            evaluate_blanks(content, values, config)
        }
        (Playable::DragDrop { content, bank }, UserAnswer::Placements(placements)) => {
            evaluate_placements(content, bank, placements, config)
        }
        (Playable::Matching { right_order, .. }, UserAnswer::Connections(connections)) => {
            evaluate_connections(right_order, connections)
        }
        (Playable::TrueFalse(content), UserAnswer::Verdicts(verdicts)) => {
            evaluate_statements(content, verdicts)
        }
        (Playable::OpenQuestions(content), UserAnswer::Responses(responses)) => {
            evaluate_responses(content, responses, config)
        }
        (Playable::WordHighlight(content), UserAnswer::Clicks(clicks)) => {
            evaluate_highlights(content, clicks)
        }
        _ => {
            return Err(ExerciseError::InvalidAnswerShape {
                expected: playable.expected_shape(),
                found: answer.shape(),
            })
        }
    };

    Ok(evaluation)
}

/// Single select: exact index. Multi select: exact set is correct, a
/// non-empty subset without wrong picks is partial.
fn evaluate_choice(question: &ChoiceQuestion, selected: &BTreeSet<usize>) -> Evaluation {
    let correct = question.correct_answer.indices();
    let status = if *selected == correct {
        Verdict::Correct
    } else if question.correct_answer.is_multi()
        && !selected.is_empty()
        && selected.is_subset(&correct)
    {
        Verdict::Partial
    } else {
        Verdict::Incorrect
    };

    Evaluation {
        status,
        detail: EvaluationDetail::Choice {
            selected: selected.clone(),
            correct,
        },
    }
}

fn evaluate_blanks(
    content: &FillBlankContent,
    values: &BTreeMap<usize, String>,
    config: &ExerciseConfig,
) -> Evaluation {
    let results: BTreeMap<usize, bool> = content
        .blanks()
        .map(|blank| {
            let ok = values.get(&blank.index).map_or(false, |value| {
                check_blank_answer(
                    value,
                    &blank.accepted(),
                    config.case_sensitive,
                    config.trim_whitespace,
                )
            });
            (blank.index, ok)
        })
        .collect();

    let (status, correct_count, total) = tally(&results);
    Evaluation {
        status,
        detail: EvaluationDetail::Blanks {
            results,
            correct_count,
            total,
        },
    }
}

fn evaluate_placements(
    content: &DragDropContent,
    bank: &[WordBankEntry],
    placements: &BTreeMap<usize, usize>,
    config: &ExerciseConfig,
) -> Evaluation {
    let results: BTreeMap<usize, bool> = content
        .blanks()
        .map(|blank| {
            let ok = placements
                .get(&blank.index)
                .and_then(|&slot| bank.get(slot))
                .map_or(false, |entry| {
                    check_blank_answer(
                        &entry.word,
                        &blank.accepted(),
                        config.case_sensitive,
                        config.trim_whitespace,
                    )
                });
            (blank.index, ok)
        })
        .collect();

    let (status, correct_count, total) = tally(&results);
    Evaluation {
        status,
        detail: EvaluationDetail::Blanks {
            results,
            correct_count,
            total,
        },
    }
}

/// A connection is correct when the displayed right item originally
/// belonged to the same pair as the left item.
fn evaluate_connections(
    right_order: &[usize],
    connections: &BTreeMap<usize, usize>,
) -> Evaluation {
    let results: BTreeMap<usize, bool> = (0..right_order.len())
        .map(|left| {
            let ok = connections
                .get(&left)
                .and_then(|&displayed| right_order.get(displayed))
                .map_or(false, |&original| original == left);
            (left, ok)
        })
        .collect();

    let (status, correct_count, total) = tally(&results);
    Evaluation {
        status,
        detail: EvaluationDetail::Connections {
            results,
            correct_count,
            total,
        },
    }
}

fn evaluate_statements(content: &TrueFalseContent, verdicts: &BTreeMap<usize, bool>) -> Evaluation {
    let results: BTreeMap<usize, bool> = content
        .statements
        .iter()
        .enumerate()
        .map(|(i, statement)| (i, verdicts.get(&i) == Some(&statement.correct)))
        .collect();

    let (status, correct_count, total) = tally(&results);
    Evaluation {
        status,
        detail: EvaluationDetail::Statements {
            results,
            correct_count,
            total,
        },
    }
}

fn evaluate_responses(
    content: &OpenQuestionsContent,
    responses: &BTreeMap<usize, String>,
    config: &ExerciseConfig,
) -> Evaluation {
    let results: BTreeMap<usize, ResponseResult> = content
        .questions
        .iter()
        .enumerate()
        .map(|(i, question)| {
            let given = responses.get(&i).map(String::as_str).unwrap_or("");
            (i, evaluate_response(given, question.answer.as_deref(), config))
        })
        .collect();

    let total = results.len();
    let correct_count = results
        .values()
        .filter(|r| r.status == Verdict::Correct)
        .count();
    let status = if total > 0 && correct_count == total {
        Verdict::Correct
    } else if results.values().any(|r| r.status != Verdict::Incorrect) {
        Verdict::Partial
    } else {
        Verdict::Incorrect
    };

    Evaluation {
        status,
        detail: EvaluationDetail::Responses {
            results,
            correct_count,
            total,
        },
    }
}

fn evaluate_highlights(content: &WordHighlightContent, clicks: &BTreeSet<usize>) -> Evaluation {
    let targets = content.target_indices();
    let correct_clicks: BTreeSet<usize> = clicks.intersection(&targets).copied().collect();
    let false_positives: BTreeSet<usize> = clicks.difference(&targets).copied().collect();
    let missed: BTreeSet<usize> = targets.difference(&correct_clicks).copied().collect();

    let status = if false_positives.is_empty() && missed.is_empty() {
        Verdict::Correct
    } else if !correct_clicks.is_empty() {
        Verdict::Partial
    } else {
        Verdict::Incorrect
    };

    Evaluation {
        status,
        detail: EvaluationDetail::Highlights {
            correct_clicks,
            false_positives,
            missed,
        },
    }
}

/// Every key correct is correct, some is partial, none is incorrect.
fn tally(results: &BTreeMap<usize, bool>) -> (Verdict, usize, usize) {
    let total = results.len();
    let correct_count = results.values().filter(|ok| **ok).count();
    let status = if total > 0 && correct_count == total {
        Verdict::Correct
    } else if correct_count > 0 {
        Verdict::Partial
    } else {
        Verdict::Incorrect
    };
    (status, correct_count, total)
}

/// Compare a typed blank against its accepted spellings.
pub fn check_blank_answer<S: AsRef<str>>(
    user: &str,
    accepted: &[S],
    case_sensitive: bool,
    trim_whitespace: bool,
) -> bool {
    let prepare = |s: &str| {
        let s = if trim_whitespace { s.trim() } else { s };
        if case_sensitive {
            s.to_string()
        } else {
            s.to_lowercase()
        }
    };

    let given = prepare(user);
    accepted.iter().any(|a| prepare(a.as_ref()) == given)
}

/// Compare a free response to the expected answer.
///
/// Questions without an expected answer accept any non-empty response.
pub fn evaluate_response(
    given: &str,
    expected: Option<&str>,
    config: &ExerciseConfig,
) -> ResponseResult {
    let given_normalized = normalize_text(given, config);

    let Some(expected) = expected else {
        let status = if given_normalized.is_empty() {
            Verdict::Incorrect
        } else {
            Verdict::Correct
        };
        return ResponseResult {
            status,
            overlap: if given_normalized.is_empty() { 0.0 } else { 1.0 },
            given_normalized,
            expected_normalized: None,
        };
    };

    let expected_normalized = normalize_text(expected, config);
    let (status, overlap) = if given_normalized == expected_normalized {
        (Verdict::Correct, 1.0)
    } else {
        let overlap = word_overlap(&given_normalized, &expected_normalized);
        if config.accept_partial_match && overlap >= config.partial_match_threshold {
            (Verdict::Partial, overlap)
        } else {
            (Verdict::Incorrect, overlap)
        }
    };

    ResponseResult {
        status,
        overlap,
        given_normalized,
        expected_normalized: Some(expected_normalized),
    }
}

/// Case-fold, strip accents and punctuation, and collapse whitespace,
/// each step as enabled in `config`.
pub fn normalize_text(text: &str, config: &ExerciseConfig) -> String {
    let folded = if config.case_sensitive {
        text.to_string()
    } else {
        text.to_lowercase()
    };

    let stripped: String = if config.ignore_accents {
        folded
            .nfd()
            .filter(|c| !unicode_normalization::char::is_combining_mark(*c))
            .collect()
    } else {
        folded
    };

    let cleaned: String = if config.ignore_punctuation {
        stripped
            .chars()
            .map(|c| if c.is_alphanumeric() || c.is_whitespace() { c } else { ' ' })
            .collect()
    } else {
        stripped
    };

    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// `|shared words| / max(word count)` of two normalized strings.
pub fn word_overlap(a: &str, b: &str) -> f64 {
    let a_words: Vec<&str> = a.split_whitespace().collect();
    let b_words: Vec<&str> = b.split_whitespace().collect();
    let max_len = a_words.len().max(b_words.len());
    if max_len == 0 {
        return 0.0;
    }

    let a_set: BTreeSet<&str> = a_words.into_iter().collect();
    let b_set: BTreeSet<&str> = b_words.into_iter().collect();
    a_set.intersection(&b_set).count() as f64 / max_len as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser;
    use crate::types::{
        ChoiceOption, CorrectAnswer, HighlightToken, MatchPair, MatchingContent, OpenQuestion,
        TrueFalseStatement,
    };
    use pretty_assertions::assert_eq;

    fn choice(correct: CorrectAnswer) -> Playable {
        Playable::MultipleChoice {
            question: ChoiceQuestion {
                question: "¿?".into(),
                options: (0..4)
                    .map(|i| ChoiceOption {
                        text: format!("opción {i}"),
                        explanation: None,
                    })
                    .collect(),
                correct_answer: correct,
                explanation: None,
            },
            order: vec![0, 1, 2, 3],
        }
    }

    fn status(playable: &Playable, answer: UserAnswer) -> Verdict {
        evaluate(playable, Some(&answer), &ExerciseConfig::default())
            .unwrap()
            .status
    }

    #[test]
    fn single_choice_is_correct_only_on_the_right_index() {
        let playable = choice(CorrectAnswer::Single(2));
        for i in 0..4 {
            let expected = if i == 2 {
                Verdict::Correct
            } else {
                Verdict::Incorrect
            };
            assert_eq!(status(&playable, UserAnswer::Choice(i)), expected);
        }
    }

    #[test]
    fn multi_choice_exact_subset_and_wrong() {
        let playable = choice(CorrectAnswer::Multiple(vec![0, 2]));
        let pick = |v: &[usize]| UserAnswer::Choices(v.iter().copied().collect());

        assert_eq!(status(&playable, pick(&[0, 2])), Verdict::Correct);
        assert_eq!(status(&playable, pick(&[2])), Verdict::Partial);
        assert_eq!(status(&playable, pick(&[0, 1])), Verdict::Incorrect);
        assert_eq!(status(&playable, pick(&[0, 1, 2])), Verdict::Incorrect);
        assert_eq!(status(&playable, pick(&[])), Verdict::Incorrect);
    }

    #[test]
    fn blank_comparison_respects_case_flag() {
        assert!(check_blank_answer("MADRID", &["madrid"], false, true));
        assert!(!check_blank_answer("MADRID", &["madrid"], true, true));
        assert!(check_blank_answer("  Madrid ", &["Madrid"], true, true));
        assert!(!check_blank_answer("  Madrid ", &["Madrid"], true, false));
    }

    #[test]
    fn blanks_accept_alternates_and_count_correct() {
        let playable =
            Playable::FillBlank(parser::parse_fill_blank("Yo *soy|estoy* en *casa*.", vec![]));
        let answer = UserAnswer::Blanks(BTreeMap::from([
            (0, "Estoy".to_string()),
            (1, "calle".to_string()),
        ]));
        let evaluation = evaluate(&playable, Some(&answer), &ExerciseConfig::default()).unwrap();
        assert_eq!(evaluation.status, Verdict::Partial);
        assert_eq!(
            evaluation.detail,
            EvaluationDetail::Blanks {
                results: BTreeMap::from([(0, true), (1, false)]),
                correct_count: 1,
                total: 2,
            }
        );
    }

    #[test]
    fn open_question_normalization_makes_exact_match() {
        let config = ExerciseConfig {
            ignore_accents: true,
            ignore_punctuation: true,
            case_sensitive: false,
            ..Default::default()
        };
        assert_eq!(
            normalize_text("Hola, cómo estás?", &config),
            normalize_text("hola como estas", &config)
        );
        let result = evaluate_response("Hola, cómo estás?", Some("hola como estas"), &config);
        assert_eq!(result.status, Verdict::Correct);
        assert_eq!(result.overlap, 1.0);
    }

    #[test]
    fn open_question_partial_by_word_overlap() {
        let config = ExerciseConfig::default();
        let result = evaluate_response(
            "me llamo ana garcía lópez",
            Some("me llamo ana garcía"),
            &config,
        );
        assert_eq!(result.status, Verdict::Partial);
        assert!((result.overlap - 0.8).abs() < 1e-9);

        let strict = ExerciseConfig {
            accept_partial_match: false,
            ..Default::default()
        };
        let result = evaluate_response("me llamo ana garcía lópez", Some("me llamo ana garcía"), &strict);
        assert_eq!(result.status, Verdict::Incorrect);
    }

    #[test]
    fn open_question_without_expected_answer_accepts_any_response() {
        let playable = Playable::OpenQuestions(OpenQuestionsContent {
            questions: vec![OpenQuestion {
                question: "Describe tu casa".into(),
                answer: None,
                hint: None,
                points: None,
            }],
        });
        let answer = UserAnswer::Responses(BTreeMap::from([(0, "Es grande".to_string())]));
        assert_eq!(status(&playable, answer), Verdict::Correct);
    }

    #[test]
    fn matching_uses_original_index_of_displayed_right_item() {
        let pairs = ["uno", "dos", "tres"]
            .iter()
            .map(|w| MatchPair {
                left: w.to_string(),
                right: w.to_uppercase(),
            })
            .collect();
        let playable = Playable::Matching {
            content: MatchingContent { pairs, title: None },
            right_order: vec![2, 0, 1],
        };
        let answer = UserAnswer::Connections(BTreeMap::from([(0, 1), (1, 2), (2, 0)]));
        assert_eq!(status(&playable, answer), Verdict::Correct);

        let answer = UserAnswer::Connections(BTreeMap::from([(0, 0), (1, 2)]));
        assert_eq!(status(&playable, answer), Verdict::Partial);
    }

    #[test]
    fn true_false_counts_correct_statements() {
        let statements = [true, false]
            .iter()
            .map(|c| TrueFalseStatement {
                statement: "x".into(),
                correct: *c,
                explanation: None,
            })
            .collect();
        let playable = Playable::TrueFalse(TrueFalseContent { statements });
        let answer = UserAnswer::Verdicts(BTreeMap::from([(0, true), (1, false)]));
        assert_eq!(status(&playable, answer), Verdict::Correct);
        let answer = UserAnswer::Verdicts(BTreeMap::from([(0, false), (1, true)]));
        assert_eq!(status(&playable, answer), Verdict::Incorrect);
    }

    #[test]
    fn highlights_track_false_positives_and_missed() {
        let token = |text: &str, is_target| HighlightToken {
            text: text.into(),
            is_target,
            is_line_break: false,
        };
        let playable = Playable::WordHighlight(WordHighlightContent {
            text: String::new(),
            tokens: vec![token("a", true), token("b", false), token("c", true)],
        });
        let evaluation = evaluate(
            &playable,
            Some(&UserAnswer::Clicks(BTreeSet::from([0, 1]))),
            &ExerciseConfig::default(),
        )
        .unwrap();
        assert_eq!(evaluation.status, Verdict::Partial);
        assert_eq!(
            evaluation.detail,
            EvaluationDetail::Highlights {
                correct_clicks: BTreeSet::from([0]),
                false_positives: BTreeSet::from([1]),
                missed: BTreeSet::from([2]),
            }
        );
    }

    #[test]
    fn missing_answer_is_incorrect() {
        let playable = choice(CorrectAnswer::Single(0));
        let evaluation = evaluate(&playable, None, &ExerciseConfig::default()).unwrap();
        assert_eq!(evaluation, Evaluation::unanswered());
    }

    #[test]
    fn wrong_shape_is_an_error() {
        let playable = choice(CorrectAnswer::Single(0));
        let result = evaluate(
            &playable,
            Some(&UserAnswer::Clicks(BTreeSet::new())),
            &ExerciseConfig::default(),
        );
        assert!(matches!(result, Err(ExerciseError::InvalidAnswerShape { .. })));
    }
}
