//! Chained exercise groups: several independent sections played side by
//! side, complete once every interactive section is.

use rand::Rng;
use serde::Serialize;
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

use crate::config::ExerciseConfig;
use crate::error::{ExerciseError, Result};
use crate::markers;
use crate::parser;
use crate::playable::Playable;
use crate::session::ExerciseSession;
use crate::types::{ChainedSection, Exercise, ExerciseType};

/// Split a marked-up blob into sections in source order.
///
/// A section that fails to parse is kept as text so the learner still sees
/// what the author wrote.
pub fn parse_chained(text: &str) -> Vec<ChainedSection> {
    markers::split_sections(text)
        .into_iter()
        .enumerate()
        .map(|(index, raw)| {
            let exercise = if raw.exercise_type == ExerciseType::Text {
                Exercise::Text(raw.body)
            } else {
                match parser::parse_section(raw.exercise_type, &raw.body) {
                    Ok(exercise) => exercise,
                    Err(err) => {
                        warn!(line = raw.line, error = %err, "section shown as text");
                        Exercise::Text(raw.body)
                    }
                }
            };
            ChainedSection { index, exercise }
        })
        .collect()
}

/// One member of a group.
#[derive(Debug, Clone)]
pub enum GroupSection {
    /// Informational text; never blocks completion.
    Info(String),
    Exercise(Box<ExerciseSession>),
}

impl GroupSection {
    pub fn exercise_type(&self) -> ExerciseType {
        match self {
            Self::Info(_) => ExerciseType::Text,
            Self::Exercise(session) => session.exercise_type(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Progress {
    pub completed: usize,
    pub total: usize,
}

/// Sessions of a chained blob or a multi-question exercise.
///
/// Sections do not share hint or attempt counters. Completion is a set
/// membership check, so the order in which sections finish does not matter.
#[derive(Debug, Clone)]
pub struct ChainedGroup {
    sections: Vec<GroupSection>,
    required: BTreeSet<usize>,
    completed: BTreeSet<usize>,
    all_complete_fired: bool,
}

impl ChainedGroup {
    /// Mount parsed sections. Multi-question multiple choice expands into
    /// one member per question.
    pub fn mount<R: Rng + ?Sized>(
        sections: &[ChainedSection],
        config: &ExerciseConfig,
        rng: &mut R,
    ) -> Result<Self> {
        let mut members = Vec::new();
        for section in sections {
            match &section.exercise {
                Exercise::Text(text) => members.push(GroupSection::Info(text.clone())),
                Exercise::Chained(_) => return Err(ExerciseError::NotInteractive),
                exercise => {
                    for playable in Playable::mount_all(exercise, config, rng)? {
                        members.push(GroupSection::Exercise(Box::new(ExerciseSession::new(
                            playable,
                            config.clone(),
                        ))));
                    }
                }
            }
        }
        Ok(Self::from_sections(members))
    }

    pub fn from_playables(playables: Vec<Playable>, config: &ExerciseConfig) -> Self {
        Self::from_sections(
            playables
                .into_iter()
                .map(|p| GroupSection::Exercise(Box::new(ExerciseSession::new(p, config.clone()))))
                .collect(),
        )
    }

    fn from_sections(sections: Vec<GroupSection>) -> Self {
        let required = sections
            .iter()
            .enumerate()
            .filter(|(_, s)| matches!(s, GroupSection::Exercise(_)))
            .map(|(i, _)| i)
            .collect();
        Self {
            sections,
            required,
            completed: BTreeSet::new(),
            all_complete_fired: false,
        }
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    pub fn sections(&self) -> &[GroupSection] {
        &self.sections
    }

    pub fn section(&self, index: usize) -> Result<&GroupSection> {
        self.sections
            .get(index)
            .ok_or(ExerciseError::NoSuchSection { index })
    }

    pub fn session_mut(&mut self, index: usize) -> Result<&mut ExerciseSession> {
        match self.sections.get_mut(index) {
            Some(GroupSection::Exercise(session)) => Ok(session.as_mut()),
            Some(GroupSection::Info(_)) => Err(ExerciseError::NotInteractive),
            None => Err(ExerciseError::NoSuchSection { index }),
        }
    }

    pub fn sessions_mut(&mut self) -> impl Iterator<Item = (usize, &mut ExerciseSession)> {
        self.sections
            .iter_mut()
            .enumerate()
            .filter_map(|(i, s)| match s {
                GroupSection::Exercise(session) => Some((i, session.as_mut())),
                GroupSection::Info(_) => None,
            })
    }

    pub fn is_section_complete(&self, index: usize) -> bool {
        self.completed.contains(&index)
    }

    /// Record that a section completed. Returns `true` exactly once: when
    /// the last required section completes.
    pub fn mark_complete(&mut self, index: usize) -> bool {
        if !self.required.contains(&index) || !self.completed.insert(index) {
            return false;
        }
        debug!(
            section = index,
            completed = self.completed.len(),
            total = self.required.len(),
            "section completed"
        );

        if self.all_complete_fired || self.completed != self.required {
            return false;
        }
        self.all_complete_fired = true;
        info!(sections = self.required.len(), "all sections completed");
        true
    }

    pub fn is_all_complete(&self) -> bool {
        self.all_complete_fired
    }

    pub fn progress(&self) -> Progress {
        Progress {
            completed: self.completed.len(),
            total: self.required.len(),
        }
    }

    /// Combined score of every section.
    pub fn score(&self) -> i32 {
        self.sections
            .iter()
            .filter_map(|s| match s {
                GroupSection::Exercise(session) => Some(session.score()),
                GroupSection::Info(_) => None,
            })
            .fold(0, i32::saturating_add)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FeedbackMode;
    use crate::types::UserAnswer;
    use pretty_assertions::assert_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const BLOB: &str = "Repasa el vocabulario.\n\
        #verdadero_falso\nEl sol es una estrella => V\n\
        #opcion_multiple\n¿Capital de España?\nBarcelona\n*Madrid\n\
        #marcar\nEl *perro* corre.";

    fn group() -> ChainedGroup {
        let sections = parse_chained(BLOB);
        let config = ExerciseConfig {
            feedback_mode: FeedbackMode::OnSubmit,
            ..Default::default()
        };
        ChainedGroup::mount(&sections, &config, &mut StdRng::seed_from_u64(1)).unwrap()
    }

    #[test]
    fn parses_sections_in_order() {
        let types: Vec<ExerciseType> = parse_chained(BLOB)
            .iter()
            .map(|s| s.exercise.exercise_type())
            .collect();
        assert_eq!(
            types,
            vec![
                ExerciseType::Text,
                ExerciseType::TrueFalse,
                ExerciseType::MultipleChoice,
                ExerciseType::WordHighlight,
            ]
        );
    }

    #[test]
    fn broken_section_degrades_to_text() {
        let sections = parse_chained("#emparejar\nsin pareja\n#completar\nLa *casa*.");
        assert_eq!(sections[0].exercise, Exercise::Text("sin pareja".into()));
        assert_eq!(sections[1].exercise.exercise_type(), ExerciseType::FillBlank);
    }

    #[test]
    fn all_complete_fires_once_after_last_section() {
        let mut group = group();
        assert_eq!(group.progress(), Progress { completed: 0, total: 3 });

        // finish out of order: 3, 1, then 2
        for index in [3, 1] {
            group.session_mut(index).unwrap().complete().unwrap();
            assert!(!group.mark_complete(index));
        }
        assert!(!group.is_all_complete());

        group.session_mut(2).unwrap().complete().unwrap();
        assert!(group.mark_complete(2));
        assert!(group.is_all_complete());

        assert!(!group.mark_complete(2));
        assert!(!group.mark_complete(1));
    }

    #[test]
    fn group_score_saturates() {
        let config = ExerciseConfig {
            feedback_mode: FeedbackMode::OnSubmit,
            correct_points: i32::MAX,
            ..Default::default()
        };
        let mut group =
            ChainedGroup::mount(&parse_chained(BLOB), &config, &mut StdRng::seed_from_u64(1))
                .unwrap();
        group
            .session_mut(1)
            .unwrap()
            .check_answer_with(Some(UserAnswer::Verdicts([(0, true)].into())))
            .unwrap();
        group
            .session_mut(2)
            .unwrap()
            .check_answer_with(Some(UserAnswer::Choice(1)))
            .unwrap();

        assert_eq!(group.score(), i32::MAX);
    }

    #[test]
    fn info_sections_are_not_interactive() {
        let mut group = group();
        assert!(matches!(group.section(0), Ok(GroupSection::Info(_))));
        assert!(matches!(group.session_mut(0), Err(ExerciseError::NotInteractive)));
        assert!(!group.mark_complete(0));
        assert!(matches!(
            group.session_mut(9),
            Err(ExerciseError::NoSuchSection { index: 9 })
        ));
    }

    #[test]
    fn sections_keep_their_own_counters() {
        let mut group = group();
        group.session_mut(2).unwrap().use_hint(None);
        group
            .session_mut(1)
            .unwrap()
            .set_answer(UserAnswer::Verdicts([(0, true)].into()))
            .unwrap();
        group.session_mut(1).unwrap().check_answer().unwrap();

        assert_eq!(group.session_mut(1).unwrap().hints_used(), 0);
        assert_eq!(group.session_mut(2).unwrap().attempts(), 0);
        assert_eq!(group.score(), 10);
    }
}
