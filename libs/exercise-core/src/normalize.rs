//! Reshape author content into canonical exercises.
//!
//! Accepts the field spellings found in authored content (`question` or
//! `text`, `correct` or `correctAnswer`, `statement` or `text`, options as
//! strings or objects, pairs as objects, `a = b` strings or two-element
//! arrays). Canonical content normalizes to itself.

use serde_json::Value;
use std::borrow::Cow;
use tracing::debug;

use crate::detect;
use crate::error::{ExerciseError, Result};
use crate::markers;
use crate::parser;
use crate::types::{
    Body, ChainedSection, ChoiceOption, ChoiceQuestion, CorrectAnswer, Exercise,
    ExerciseContent, ExerciseType, MatchPair, MatchingContent, MultipleChoiceContent,
    OpenQuestion, OpenQuestionsContent, TrueFalseContent, TrueFalseStatement,
};

/// Detect the type of `content` and normalize it.
pub fn canonicalize(content: &ExerciseContent) -> Result<Exercise> {
    normalize(content, detect::detect(content).exercise_type)
}

/// Normalize `content` as the given type.
pub fn normalize(content: &ExerciseContent, kind: ExerciseType) -> Result<Exercise> {
    let exercise = match payload(content, kind)? {
        Payload::Empty if kind == ExerciseType::Text => Exercise::Text(String::new()),
        Payload::Empty => return Err(ExerciseError::EmptyExercise { exercise_type: kind }),
        Payload::Text(text) => from_text(text, kind)?,
        Payload::Json(value) => from_json(&value, content, kind)?,
    };

    parser::ensure_playable(&exercise)?;
    debug!(exercise_type = %kind, "content normalized");
    Ok(exercise)
}

enum Payload<'a> {
    Text(&'a str),
    Json(Cow<'a, Value>),
    Empty,
}

/// Fields that mark the whole content object as the payload, even when a
/// `text` intro sits next to them.
fn structural_keys(kind: ExerciseType) -> &'static [&'static str] {
    match kind {
        ExerciseType::MultipleChoice => &["questions", "options"],
        ExerciseType::OpenQuestions => &["questions"],
        ExerciseType::Matching => &["pairs"],
        ExerciseType::TrueFalse => &["statements"],
        ExerciseType::FillBlank => &["answers", "sentence"],
        _ => &[],
    }
}

fn payload(content: &ExerciseContent, kind: ExerciseType) -> Result<Payload<'_>> {
    let whole = content.as_value();
    if structural_keys(kind)
        .iter()
        .any(|key| whole.get(key).is_some())
    {
        return Ok(Payload::Json(Cow::Borrowed(whole)));
    }

    Ok(match content.body() {
        Body::Text(text) if looks_like_json(text) => {
            Payload::Json(Cow::Owned(serde_json::from_str(text)?))
        }
        Body::Text(text) => Payload::Text(text),
        Body::Object(value) => Payload::Json(Cow::Borrowed(value)),
        Body::Empty => Payload::Empty,
    })
}

fn looks_like_json(text: &str) -> bool {
    let trimmed = text.trim_start();
    trimmed.starts_with('{') || trimmed.starts_with('[')
}

fn from_text(text: &str, kind: ExerciseType) -> Result<Exercise> {
    match kind {
        ExerciseType::Text => Ok(Exercise::Text(text.to_string())),
        ExerciseType::Chained => parser::parse_section(kind, text),
        _ => parser::parse_section(kind, &section_body(text, kind)),
    }
}

/// Bodies of every section of `kind`, or the whole text when it has none.
fn section_body(text: &str, kind: ExerciseType) -> String {
    let bodies: Vec<String> = markers::split_sections(text)
        .into_iter()
        .filter(|section| section.exercise_type == kind)
        .map(|section| section.body)
        .collect();

    if bodies.is_empty() {
        text.to_string()
    } else {
        bodies.join("\n\n")
    }
}

fn from_json(value: &Value, content: &ExerciseContent, kind: ExerciseType) -> Result<Exercise> {
    Ok(match kind {
        ExerciseType::MultipleChoice => Exercise::MultipleChoice(multiple_choice(value)?),
        ExerciseType::FillBlank => {
            let text = text_field(value, kind)?;
            let answers = value
                .get("answers")
                .and_then(Value::as_array)
                .map(|items| items.iter().filter_map(answer_spelling).collect())
                .unwrap_or_default();
            Exercise::FillBlank(parser::parse_fill_blank(&text, answers))
        }
        ExerciseType::DragDrop => Exercise::DragDrop(parser::parse_drag_drop(&text_field(value, kind)?)),
        ExerciseType::WordHighlight => {
            Exercise::WordHighlight(parser::parse_word_highlight(&text_field(value, kind)?))
        }
        ExerciseType::Matching => Exercise::Matching(matching(value, content)?),
        ExerciseType::TrueFalse => Exercise::TrueFalse(true_false(value)?),
        ExerciseType::OpenQuestions => Exercise::OpenQuestions(open_questions(value)?),
        ExerciseType::Text => Exercise::Text(match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }),
        ExerciseType::Chained => {
            let sections: Vec<ChainedSection> = serde_json::from_value(value.clone())?;
            Exercise::Chained(sections)
        }
    })
}

/// First string among `keys`.
fn str_field(value: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| value.get(key))
        .find_map(Value::as_str)
        .map(str::to_string)
}

/// First non-null value among `keys`.
fn first_present<'a>(value: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| value.get(key))
        .find(|v| !v.is_null())
}

fn text_field(value: &Value, kind: ExerciseType) -> Result<String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        _ => str_field(value, &["text", "sentence", "body"]).ok_or(
            ExerciseError::MissingField {
                exercise_type: kind,
                field: "text",
            },
        ),
    }
}

fn array_field<'a>(value: &'a Value, key: &'static str, kind: ExerciseType) -> Result<&'a Vec<Value>> {
    value
        .get(key)
        .and_then(Value::as_array)
        .ok_or(ExerciseError::MissingField {
            exercise_type: kind,
            field: key,
        })
}

/// `"Madrid"` or `["Madrid", "madrid"]` -> `"Madrid|madrid"`.
fn answer_spelling(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Array(items) => {
            let words: Vec<&str> = items.iter().filter_map(Value::as_str).collect();
            (!words.is_empty()).then(|| words.join("|"))
        }
        _ => None,
    }
}

fn multiple_choice(value: &Value) -> Result<MultipleChoiceContent> {
    let questions = match value.get("questions") {
        Some(Value::Array(items)) => items
            .iter()
            .map(choice_question)
            .collect::<Result<Vec<_>>>()?,
        Some(_) => {
            return Err(ExerciseError::MissingField {
                exercise_type: ExerciseType::MultipleChoice,
                field: "questions",
            })
        }
        None => vec![choice_question(value)?],
    };
    Ok(MultipleChoiceContent { questions })
}

fn choice_question(value: &Value) -> Result<ChoiceQuestion> {
    let missing = |field| ExerciseError::MissingField {
        exercise_type: ExerciseType::MultipleChoice,
        field,
    };

    let question = str_field(value, &["question", "text"]).ok_or_else(|| missing("question"))?;
    let raw_options = value
        .get("options")
        .and_then(Value::as_array)
        .ok_or_else(|| missing("options"))?;
    let options: Vec<ChoiceOption> = raw_options.iter().filter_map(choice_option).collect();
    if options.is_empty() {
        return Err(missing("options"));
    }

    let correct_answer = match first_present(value, &["correct", "correctAnswer"]) {
        Some(raw) => correct_answer(raw, &options).ok_or_else(|| missing("correctAnswer"))?,
        None => flagged_options(raw_options).unwrap_or(CorrectAnswer::Single(0)),
    };
    if correct_answer.indices().iter().any(|i| *i >= options.len()) {
        return Err(missing("correctAnswer"));
    }

    Ok(ChoiceQuestion {
        question,
        options,
        correct_answer,
        explanation: str_field(value, &["explanation"]),
    })
}

fn choice_option(value: &Value) -> Option<ChoiceOption> {
    match value {
        Value::String(text) => Some(ChoiceOption {
            text: text.clone(),
            explanation: None,
        }),
        Value::Number(n) => Some(ChoiceOption {
            text: n.to_string(),
            explanation: None,
        }),
        Value::Object(_) => Some(ChoiceOption {
            text: str_field(value, &["text", "label", "option"])?,
            explanation: str_field(value, &["explanation"]),
        }),
        _ => None,
    }
}

/// Index, list of indices, numeric string, or the text of the right option.
fn correct_answer(raw: &Value, options: &[ChoiceOption]) -> Option<CorrectAnswer> {
    match raw {
        Value::Number(n) => n.as_u64().map(|i| CorrectAnswer::Single(i as usize)),
        Value::Array(items) => items
            .iter()
            .map(|v| v.as_u64().map(|i| i as usize))
            .collect::<Option<Vec<_>>>()
            .filter(|indices| !indices.is_empty())
            .map(CorrectAnswer::Multiple),
        Value::String(s) => s
            .trim()
            .parse::<usize>()
            .ok()
            .or_else(|| options.iter().position(|o| o.text == *s))
            .map(CorrectAnswer::Single),
        _ => None,
    }
}

/// Options written as `{ "text": .., "correct": true }`.
fn flagged_options(options: &[Value]) -> Option<CorrectAnswer> {
    let flagged: Vec<usize> = options
        .iter()
        .enumerate()
        .filter(|(_, o)| {
            first_present(o, &["correct", "isCorrect"]).and_then(Value::as_bool) == Some(true)
        })
        .map(|(i, _)| i)
        .collect();

    match flagged.as_slice() {
        [] => None,
        [single] => Some(CorrectAnswer::Single(*single)),
        _ => Some(CorrectAnswer::Multiple(flagged)),
    }
}

fn matching(value: &Value, content: &ExerciseContent) -> Result<MatchingContent> {
    let pairs = array_field(value, "pairs", ExerciseType::Matching)?
        .iter()
        .filter_map(|item| match item {
            Value::String(line) => parser::parse_pair(line),
            Value::Array(parts) => match parts.as_slice() {
                [left, right] => Some(MatchPair {
                    left: left.as_str()?.to_string(),
                    right: right.as_str()?.to_string(),
                }),
                _ => None,
            },
            Value::Object(_) => Some(MatchPair {
                left: str_field(item, &["left", "term"])?,
                right: str_field(item, &["right", "definition"])?,
            }),
            _ => None,
        })
        .collect();

    Ok(MatchingContent {
        pairs,
        title: str_field(value, &["title"]).or_else(|| content.title().map(str::to_string)),
    })
}

fn true_false(value: &Value) -> Result<TrueFalseContent> {
    let statements = array_field(value, "statements", ExerciseType::TrueFalse)?
        .iter()
        .filter_map(|item| match item {
            Value::String(line) => parser::parse_true_false(line)
                .into_iter()
                .next()
                .or_else(|| {
                    Some(TrueFalseStatement {
                        statement: line.trim().to_string(),
                        correct: true,
                        explanation: None,
                    })
                }),
            Value::Object(_) => {
                let correct = match first_present(item, &["correct", "answer"]) {
                    Some(Value::Bool(b)) => *b,
                    Some(Value::String(s)) => parser::parse_verdict(s).unwrap_or(true),
                    _ => true,
                };
                Some(TrueFalseStatement {
                    statement: str_field(item, &["statement", "text"])?,
                    correct,
                    explanation: str_field(item, &["explanation"]),
                })
            }
            _ => None,
        })
        .collect();

    Ok(TrueFalseContent { statements })
}

fn open_questions(value: &Value) -> Result<OpenQuestionsContent> {
    let questions = array_field(value, "questions", ExerciseType::OpenQuestions)?
        .iter()
        .filter_map(|item| match item {
            Value::String(line) => parser::parse_open_questions(line).into_iter().next(),
            Value::Object(_) => Some(OpenQuestion {
                question: str_field(item, &["question", "text"])?,
                answer: str_field(item, &["answer"]),
                hint: str_field(item, &["hint"]),
                points: item
                    .get("points")
                    .and_then(Value::as_u64)
                    .and_then(|p| u32::try_from(p).ok()),
            }),
            _ => None,
        })
        .collect();

    Ok(OpenQuestionsContent { questions })
}
