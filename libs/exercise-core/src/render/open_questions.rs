use serde::Serialize;
use std::collections::BTreeMap;

use super::{reveals_answers, shows_results};
use crate::error::Result;
use crate::evaluate::{EvaluationDetail, ResponseResult, Verdict};
use crate::session::{ExerciseSession, Hint};
use crate::types::{OpenQuestionsContent, UserAnswer};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OpenQuestionsView {
    pub questions: Vec<QuestionView>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuestionView {
    pub index: usize,
    pub question: String,
    pub response: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub points: Option<u32>,
    /// Author hint, once handed out.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<Verdict>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<ResponseResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected: Option<String>,
}

fn responses(session: &ExerciseSession) -> BTreeMap<usize, String> {
    match session.user_answer() {
        Some(UserAnswer::Responses(responses)) => responses.clone(),
        _ => BTreeMap::new(),
    }
}

pub fn render(content: &OpenQuestionsContent, session: &ExerciseSession) -> OpenQuestionsView {
    let responses = responses(session);
    let reveal = reveals_answers(session);
    let results = match session.evaluation().map(|e| &e.detail) {
        Some(EvaluationDetail::Responses { results, .. }) if shows_results(session) => {
            Some(results)
        }
        _ => None,
    };
    let hints: BTreeMap<usize, &str> = session
        .hints()
        .iter()
        .filter_map(|hint| match hint {
            Hint::Authored { question, text } => Some((*question, text.as_str())),
            _ => None,
        })
        .collect();

    let questions = content
        .questions
        .iter()
        .enumerate()
        .map(|(index, q)| {
            let result = results.and_then(|r| r.get(&index));
            QuestionView {
                index,
                question: q.question.clone(),
                response: responses.get(&index).cloned().unwrap_or_default(),
                points: q.points,
                hint: hints.get(&index).map(|h| h.to_string()),
                status: result.map(|r| r.status),
                result: result.filter(|_| reveal).cloned(),
                expected: q.answer.clone().filter(|_| reveal),
            }
        })
        .collect();

    OpenQuestionsView { questions }
}

pub fn respond(session: &mut ExerciseSession, question: usize, text: String) -> Result<()> {
    let mut responses = responses(session);
    responses.insert(question, text);
    session.set_answer(UserAnswer::Responses(responses))
}
