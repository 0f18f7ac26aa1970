//! Marker syntax shared by every text-authored exercise.
//!
//! # Format
//! ```text
//! #completar
//! La *capital* de España es *Madrid|madrid*.
//!
//! #verdadero_falso
//! Madrid está en Francia => F
//! ```
//!
//! - `#marker` at the start of a line opens a section of that type.
//! - `*word*` marks a cloze, drag or highlight target.
//! - `a|b` inside a target lists accepted alternates.

use crate::types::{ExerciseType, HighlightToken, Segment};

/// Section markers and the exercise type each one selects.
pub const SECTION_MARKERS: &[(&str, ExerciseType)] = &[
    ("#marcar", ExerciseType::WordHighlight),
    ("#arrastrar", ExerciseType::DragDrop),
    ("#ordenar", ExerciseType::DragDrop),
    ("#respuesta_libre", ExerciseType::OpenQuestions),
    ("#opcion_multiple", ExerciseType::MultipleChoice),
    ("#completar", ExerciseType::FillBlank),
    ("#emparejar", ExerciseType::Matching),
    ("#verdadero_falso", ExerciseType::TrueFalse),
];

/// Opens an informational section inside a chained blob.
pub const TEXT_MARKER: &str = "#texto";

/// Distinct exercise types whose markers occur anywhere in `text`,
/// in the order of their first appearance.
pub fn marker_types(text: &str) -> Vec<ExerciseType> {
    let mut found: Vec<(usize, ExerciseType)> = Vec::new();

    for (marker, kind) in SECTION_MARKERS {
        let Some(pos) = find_marker(text, marker) else {
            continue;
        };
        match found.iter_mut().find(|(_, k)| k == kind) {
            Some(existing) if pos < existing.0 => existing.0 = pos,
            Some(_) => {}
            None => found.push((pos, *kind)),
        }
    }

    found.sort_by_key(|(pos, _)| *pos);
    found.into_iter().map(|(_, kind)| kind).collect()
}

/// First occurrence of `marker` that is not the prefix of a longer word.
fn find_marker(text: &str, marker: &str) -> Option<usize> {
    let mut offset = 0;
    while let Some(pos) = text[offset..].find(marker) {
        let start = offset + pos;
        let end = start + marker.len();
        if !continues_word(&text[end..]) {
            return Some(start);
        }
        offset = end;
    }
    None
}

fn continues_word(rest: &str) -> bool {
    rest.chars()
        .next()
        .map_or(false, |c| c.is_alphanumeric() || c == '_')
}

/// Raw section cut out of a marked-up blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawSection {
    pub exercise_type: ExerciseType,
    pub body: String,
    /// Line (1-indexed) where the section starts.
    pub line: usize,
}

/// Split a blob into sections at marker lines.
///
/// Text before the first marker becomes a [`ExerciseType::Text`] section
/// when it is not blank.
pub fn split_sections(text: &str) -> Vec<RawSection> {
    let mut splitter = Splitter::new();

    for (idx, line) in text.lines().enumerate() {
        splitter.process_line(line, idx + 1);
    }

    splitter.finish()
}

enum LineType<'a> {
    Marker(ExerciseType, &'a str),
    Text(&'a str),
}

struct Splitter {
    current: Option<(ExerciseType, usize)>,
    buffer: Vec<String>,
    sections: Vec<RawSection>,
}

impl Splitter {
    fn new() -> Self {
        Self {
            current: None,
            buffer: Vec::new(),
            sections: Vec::new(),
        }
    }

    fn parse_line(line: &str) -> LineType<'_> {
        let trimmed = line.trim_start();

        let markers = SECTION_MARKERS
            .iter()
            .copied()
            .chain(std::iter::once((TEXT_MARKER, ExerciseType::Text)));
        for (marker, kind) in markers {
            if let Some(rest) = trimmed.strip_prefix(marker) {
                if !continues_word(rest) {
                    return LineType::Marker(kind, rest.trim());
                }
            }
        }

        LineType::Text(line)
    }

    fn process_line(&mut self, line: &str, line_num: usize) {
        match Self::parse_line(line) {
            LineType::Marker(kind, rest) => {
                self.flush();
                self.current = Some((kind, line_num));
                if !rest.is_empty() {
                    self.buffer.push(rest.to_string());
                }
            }
            LineType::Text(text) => {
                if self.current.is_none() {
                    self.current = Some((ExerciseType::Text, line_num));
                }
                self.buffer.push(text.to_string());
            }
        }
    }

    fn flush(&mut self) {
        let body = self.buffer.join("\n").trim().to_string();
        self.buffer.clear();

        let Some((kind, line)) = self.current.take() else {
            return;
        };
        // A marker with no body still yields a section so the author sees it.
        if kind == ExerciseType::Text && body.is_empty() {
            return;
        }
        self.sections.push(RawSection {
            exercise_type: kind,
            body,
            line,
        });
    }

    fn finish(mut self) -> Vec<RawSection> {
        self.flush();
        self.sections
    }
}

/// Which blank notations a cloze text may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClozeSyntax {
    /// `*word*` only.
    Stars,
    /// `*word*`, `___word___`, bare `___`, `[blank]` and `[blank:word]`.
    Extended,
}

/// Cut a cloze text into literal and blank segments, numbering blanks in order.
pub fn parse_cloze(text: &str, syntax: ClozeSyntax) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut literal = String::new();
    let mut blank_index = 0;
    let mut rest = text;

    while !rest.is_empty() {
        if let Some((inner, consumed)) = match_blank(rest, syntax) {
            if !literal.is_empty() {
                segments.push(Segment::Text {
                    content: std::mem::take(&mut literal),
                });
            }
            let (correct_word, alternates) = split_alternates(inner);
            segments.push(Segment::Blank {
                index: blank_index,
                correct_word,
                alternates,
            });
            blank_index += 1;
            rest = &rest[consumed..];
            continue;
        }

        let mut chars = rest.chars();
        if let Some(ch) = chars.next() {
            literal.push(ch);
        }
        rest = chars.as_str();
    }

    if !literal.is_empty() {
        segments.push(Segment::Text { content: literal });
    }

    segments
}

/// Returns the blank's inner text and how many bytes the blank spans.
fn match_blank(rest: &str, syntax: ClozeSyntax) -> Option<(&str, usize)> {
    if let Some(after) = rest.strip_prefix('*') {
        let end = after.find('*')?;
        let inner = &after[..end];
        if inner.trim().is_empty() || inner.contains('\n') {
            return None;
        }
        return Some((inner, end + 2));
    }

    if syntax == ClozeSyntax::Stars {
        return None;
    }

    if rest.starts_with("___") {
        let open = underscore_run(rest);
        let after = &rest[open..];
        if let Some(end) = after.find('_') {
            let inner = &after[..end];
            let close = underscore_run(&after[end..]);
            let is_word = !inner.is_empty() && inner == inner.trim() && !inner.contains('\n');
            if close >= 3 && is_word {
                return Some((inner, open + end + close));
            }
        }
        return Some(("", open));
    }

    let lower_prefix = rest.get(..6).map(str::to_ascii_lowercase);
    if lower_prefix.as_deref() == Some("[blank") {
        let after = &rest[6..];
        if let Some(tail) = after.strip_prefix(']') {
            return Some(("", rest.len() - tail.len()));
        }
        if let Some(body) = after.strip_prefix(':') {
            let end = body.find(']')?;
            return Some((&body[..end], 6 + 1 + end + 1));
        }
    }

    None
}

fn underscore_run(s: &str) -> usize {
    s.bytes().take_while(|b| *b == b'_').count()
}

/// `"Madrid|madrid"` -> (`"Madrid"`, `["madrid"]`).
pub fn split_alternates(inner: &str) -> (String, Vec<String>) {
    let mut parts = inner
        .split('|')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string);
    let correct = parts.next().unwrap_or_default();
    (correct, parts.collect())
}

/// Tokenize a highlight text: `*word*` targets, whitespace-separated
/// distractors, and explicit line-break tokens.
pub fn parse_highlight_tokens(text: &str) -> Vec<HighlightToken> {
    let mut tokens = Vec::new();
    let mut fragment = String::new();
    let mut rest = text;

    while !rest.is_empty() {
        if let Some((inner, consumed)) = match_blank(rest, ClozeSyntax::Stars) {
            push_fragment(&mut tokens, &std::mem::take(&mut fragment));
            tokens.push(HighlightToken {
                text: inner.trim().to_string(),
                is_target: true,
                is_line_break: false,
            });
            rest = &rest[consumed..];
            continue;
        }

        let mut chars = rest.chars();
        if let Some(ch) = chars.next() {
            fragment.push(ch);
        }
        rest = chars.as_str();
    }
    push_fragment(&mut tokens, &fragment);

    tokens
}

fn push_fragment(tokens: &mut Vec<HighlightToken>, fragment: &str) {
    let mut word = String::new();
    for ch in fragment.chars() {
        if ch.is_whitespace() {
            if !word.is_empty() {
                tokens.push(HighlightToken {
                    text: std::mem::take(&mut word),
                    is_target: false,
                    is_line_break: false,
                });
            }
            if ch == '\n' {
                tokens.push(HighlightToken {
                    text: "\n".to_string(),
                    is_target: false,
                    is_line_break: true,
                });
            }
        } else {
            word.push(ch);
        }
    }
    if !word.is_empty() {
        tokens.push(HighlightToken {
            text: word,
            is_target: false,
            is_line_break: false,
        });
    }
}
