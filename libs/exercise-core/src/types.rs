//! Core types for the exercise player.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Exercise types the player knows how to present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExerciseType {
    MultipleChoice,
    FillBlank,
    DragDrop,
    Matching,
    TrueFalse,
    OpenQuestions,
    #[serde(alias = "mark_words", alias = "highlight")]
    WordHighlight,
    Text,
    Chained,
}

impl ExerciseType {
    /// Get the type name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MultipleChoice => "multiple_choice",
            Self::FillBlank => "fill_blank",
            Self::DragDrop => "drag_drop",
            Self::Matching => "matching",
            Self::TrueFalse => "true_false",
            Self::OpenQuestions => "open_questions",
            Self::WordHighlight => "word_highlight",
            Self::Text => "text",
            Self::Chained => "chained",
        }
    }

    /// Parse from string. Accepts the legacy names used by older content.
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "multiple_choice" => Some(Self::MultipleChoice),
            "fill_blank" => Some(Self::FillBlank),
            "drag_drop" | "order" => Some(Self::DragDrop),
            "matching" => Some(Self::Matching),
            "true_false" => Some(Self::TrueFalse),
            "open_questions" => Some(Self::OpenQuestions),
            "word_highlight" | "mark_words" | "highlight" => Some(Self::WordHighlight),
            "text" => Some(Self::Text),
            "chained" => Some(Self::Chained),
            _ => None,
        }
    }

    /// Whether a session can be mounted for this type.
    pub fn is_interactive(&self) -> bool {
        !matches!(self, Self::Text | Self::Chained)
    }
}

impl fmt::Display for ExerciseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw exercise content as supplied by the host. Shape varies by author.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExerciseContent(Value);

/// The part of the content that carries the exercise itself.
#[derive(Debug, Clone, Copy)]
pub enum Body<'a> {
    Text(&'a str),
    Object(&'a Value),
    Empty,
}

impl ExerciseContent {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    /// Content that is nothing but marked-up text.
    pub fn from_text(text: impl Into<String>) -> Self {
        Self(Value::String(text.into()))
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    /// `type` or `exerciseType` when the author set one.
    pub fn explicit_type(&self) -> Option<&str> {
        self.0
            .get("type")
            .or_else(|| self.0.get("exerciseType"))
            .and_then(Value::as_str)
    }

    pub fn title(&self) -> Option<&str> {
        self.0.get("title").and_then(Value::as_str)
    }

    /// Resolve the body: `body`, `text`, `content`, then the content itself.
    pub fn body(&self) -> Body<'_> {
        let candidate = match &self.0 {
            Value::Object(map) => map
                .get("body")
                .filter(|v| !is_blank(v))
                .or_else(|| map.get("text").filter(|v| !is_blank(v)))
                .or_else(|| map.get("content").filter(|v| !is_blank(v)))
                .unwrap_or(&self.0),
            other => other,
        };

        match candidate {
            Value::String(s) if s.trim().is_empty() => Body::Empty,
            Value::String(s) => Body::Text(s),
            Value::Null => Body::Empty,
            other => Body::Object(other),
        }
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

impl From<Value> for ExerciseContent {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

/// One option of a multiple-choice question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChoiceOption {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

/// Correct option index, or indices for multi-select questions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CorrectAnswer {
    Single(usize),
    Multiple(Vec<usize>),
}

impl CorrectAnswer {
    pub fn is_multi(&self) -> bool {
        matches!(self, Self::Multiple(_))
    }

    pub fn contains(&self, index: usize) -> bool {
        match self {
            Self::Single(i) => *i == index,
            Self::Multiple(indices) => indices.contains(&index),
        }
    }

    pub fn indices(&self) -> BTreeSet<usize> {
        match self {
            Self::Single(i) => BTreeSet::from([*i]),
            Self::Multiple(indices) => indices.iter().copied().collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChoiceQuestion {
    pub question: String,
    pub options: Vec<ChoiceOption>,
    pub correct_answer: CorrectAnswer,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultipleChoiceContent {
    pub questions: Vec<ChoiceQuestion>,
}

/// A run of cloze text: literal text or a blank to fill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Segment {
    Text {
        content: String,
    },
    Blank {
        index: usize,
        #[serde(rename = "correctWord")]
        correct_word: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        alternates: Vec<String>,
    },
}

/// Borrowed view of a blank segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlankRef<'a> {
    pub index: usize,
    pub correct_word: &'a str,
    pub alternates: &'a [String],
}

impl BlankRef<'_> {
    /// Every spelling accepted for this blank.
    pub fn accepted(&self) -> Vec<&str> {
        std::iter::once(self.correct_word)
            .chain(self.alternates.iter().map(String::as_str))
            .filter(|w| !w.is_empty())
            .collect()
    }
}

fn blanks_of(segments: &[Segment]) -> impl Iterator<Item = BlankRef<'_>> {
    segments.iter().filter_map(|segment| match segment {
        Segment::Blank {
            index,
            correct_word,
            alternates,
        } => Some(BlankRef {
            index: *index,
            correct_word,
            alternates,
        }),
        Segment::Text { .. } => None,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FillBlankContent {
    /// Source text with blank markers.
    pub text: String,
    pub segments: Vec<Segment>,
    /// Answers for blanks written without one, by blank order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub answers: Vec<String>,
}

impl FillBlankContent {
    pub fn blanks(&self) -> impl Iterator<Item = BlankRef<'_>> {
        blanks_of(&self.segments)
    }

    pub fn blank_count(&self) -> usize {
        self.blanks().count()
    }
}

/// A draggable word. `index` is the blank the word was cut from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordBankEntry {
    pub index: usize,
    pub word: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DragDropContent {
    pub text: String,
    pub segments: Vec<Segment>,
}

impl DragDropContent {
    pub fn blanks(&self) -> impl Iterator<Item = BlankRef<'_>> {
        blanks_of(&self.segments)
    }

    pub fn blank_count(&self) -> usize {
        self.blanks().count()
    }

    /// Word bank in blank order (unshuffled).
    pub fn words(&self) -> Vec<WordBankEntry> {
        self.blanks()
            .map(|b| WordBankEntry {
                index: b.index,
                word: b.correct_word.to_string(),
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchPair {
    pub left: String,
    pub right: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchingContent {
    pub pairs: Vec<MatchPair>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrueFalseStatement {
    pub statement: String,
    pub correct: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrueFalseContent {
    pub statements: Vec<TrueFalseStatement>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenQuestion {
    pub question: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub points: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenQuestionsContent {
    pub questions: Vec<OpenQuestion>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HighlightToken {
    pub text: String,
    pub is_target: bool,
    #[serde(default)]
    pub is_line_break: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WordHighlightContent {
    pub text: String,
    pub tokens: Vec<HighlightToken>,
}

impl WordHighlightContent {
    pub fn target_indices(&self) -> BTreeSet<usize> {
        self.tokens
            .iter()
            .enumerate()
            .filter(|(_, t)| t.is_target)
            .map(|(i, _)| i)
            .collect()
    }
}

/// One section of a chained blob, in source order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainedSection {
    pub index: usize,
    pub exercise: Exercise,
}

/// Canonical exercise, one variant per type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "content", rename_all = "snake_case")]
pub enum Exercise {
    MultipleChoice(MultipleChoiceContent),
    FillBlank(FillBlankContent),
    DragDrop(DragDropContent),
    Matching(MatchingContent),
    TrueFalse(TrueFalseContent),
    OpenQuestions(OpenQuestionsContent),
    WordHighlight(WordHighlightContent),
    Text(String),
    Chained(Vec<ChainedSection>),
}

impl Exercise {
    pub fn exercise_type(&self) -> ExerciseType {
        match self {
            Self::MultipleChoice(_) => ExerciseType::MultipleChoice,
            Self::FillBlank(_) => ExerciseType::FillBlank,
            Self::DragDrop(_) => ExerciseType::DragDrop,
            Self::Matching(_) => ExerciseType::Matching,
            Self::TrueFalse(_) => ExerciseType::TrueFalse,
            Self::OpenQuestions(_) => ExerciseType::OpenQuestions,
            Self::WordHighlight(_) => ExerciseType::WordHighlight,
            Self::Text(_) => ExerciseType::Text,
            Self::Chained(_) => ExerciseType::Chained,
        }
    }
}

/// A learner's answer. The variant must match the exercise being played.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum UserAnswer {
    /// Selected option index (single-select).
    Choice(usize),
    /// Selected option indices (multi-select).
    Choices(BTreeSet<usize>),
    /// Blank index -> typed text.
    Blanks(#[serde(deserialize_with = "index_map")] BTreeMap<usize, String>),
    /// Blank index -> word bank entry index.
    Placements(#[serde(deserialize_with = "index_map")] BTreeMap<usize, usize>),
    /// Question index -> free response.
    Responses(#[serde(deserialize_with = "index_map")] BTreeMap<usize, String>),
    /// Statement index -> chosen verdict.
    Verdicts(#[serde(deserialize_with = "index_map")] BTreeMap<usize, bool>),
    /// Left index -> displayed right index.
    Connections(#[serde(deserialize_with = "index_map")] BTreeMap<usize, usize>),
    /// Clicked token indices.
    Clicks(BTreeSet<usize>),
}

impl UserAnswer {
    pub fn shape(&self) -> AnswerShape {
        match self {
            Self::Choice(_) => AnswerShape::Choice,
            Self::Choices(_) => AnswerShape::Choices,
            Self::Blanks(_) => AnswerShape::Blanks,
            Self::Placements(_) => AnswerShape::Placements,
            Self::Responses(_) => AnswerShape::Responses,
            Self::Verdicts(_) => AnswerShape::Verdicts,
            Self::Connections(_) => AnswerShape::Connections,
            Self::Clicks(_) => AnswerShape::Clicks,
        }
    }
}

/// Index-keyed map that accepts keys as numbers or numeric strings.
///
/// JSON object keys are strings, and serde hands them over as plain strings
/// once the surrounding enum has been buffered.
fn index_map<'de, D, V>(deserializer: D) -> Result<BTreeMap<usize, V>, D::Error>
where
    D: Deserializer<'de>,
    V: Deserialize<'de>,
{
    let raw = BTreeMap::<IndexKey, V>::deserialize(deserializer)?;
    Ok(raw.into_iter().map(|(key, value)| (key.0, value)).collect())
}

#[derive(PartialEq, Eq, PartialOrd, Ord)]
struct IndexKey(usize);

impl<'de> Deserialize<'de> for IndexKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct KeyVisitor;

        impl<'de> serde::de::Visitor<'de> for KeyVisitor {
            type Value = IndexKey;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a non-negative index")
            }

            fn visit_u64<E: serde::de::Error>(self, v: u64) -> Result<IndexKey, E> {
                usize::try_from(v)
                    .map(IndexKey)
                    .map_err(|_| E::custom("index out of range"))
            }

            fn visit_str<E: serde::de::Error>(self, v: &str) -> Result<IndexKey, E> {
                v.trim()
                    .parse()
                    .map(IndexKey)
                    .map_err(|_| E::invalid_value(serde::de::Unexpected::Str(v), &self))
            }
        }

        deserializer.deserialize_any(KeyVisitor)
    }
}

/// Shape tag of a [`UserAnswer`], used for validation messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerShape {
    Choice,
    Choices,
    Blanks,
    Placements,
    Responses,
    Verdicts,
    Connections,
    Clicks,
}

impl fmt::Display for AnswerShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Choice => "choice",
            Self::Choices => "choices",
            Self::Blanks => "blanks",
            Self::Placements => "placements",
            Self::Responses => "responses",
            Self::Verdicts => "verdicts",
            Self::Connections => "connections",
            Self::Clicks => "clicks",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn exercise_type_accepts_legacy_names() {
        assert_eq!(ExerciseType::from_str("mark_words"), Some(ExerciseType::WordHighlight));
        assert_eq!(ExerciseType::from_str("order"), Some(ExerciseType::DragDrop));
        assert_eq!(ExerciseType::from_str("essay"), None);
    }

    #[test]
    fn body_prefers_body_then_text() {
        let content = ExerciseContent::new(json!({ "body": "#completar", "text": "ignored" }));
        assert!(matches!(content.body(), Body::Text("#completar")));

        let content = ExerciseContent::new(json!({ "body": "", "text": "fallback" }));
        assert!(matches!(content.body(), Body::Text("fallback")));

        let content = ExerciseContent::new(json!({ "pairs": [] }));
        assert!(matches!(content.body(), Body::Object(_)));

        assert!(matches!(ExerciseContent::from_text("   ").body(), Body::Empty));
    }

    #[test]
    fn explicit_type_reads_either_key() {
        let content = ExerciseContent::new(json!({ "exerciseType": "matching" }));
        assert_eq!(content.explicit_type(), Some("matching"));
    }

    #[test]
    fn correct_answer_deserializes_scalar_or_list() {
        let single: CorrectAnswer = serde_json::from_value(json!(2)).unwrap();
        assert_eq!(single, CorrectAnswer::Single(2));
        let multi: CorrectAnswer = serde_json::from_value(json!([0, 3])).unwrap();
        assert!(multi.is_multi());
        assert!(multi.contains(3));
    }

    #[test]
    fn user_answer_round_trips_with_integer_keys() {
        let answer = UserAnswer::Blanks(BTreeMap::from([(0, "Madrid".to_string())]));
        let value = serde_json::to_value(&answer).unwrap();
        assert_eq!(value, json!({ "kind": "blanks", "value": { "0": "Madrid" } }));
        let back: UserAnswer = serde_json::from_value(value).unwrap();
        assert_eq!(back, answer);
    }
}
