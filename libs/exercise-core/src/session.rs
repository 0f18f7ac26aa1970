//! Exercise session state machine.
//!
//! ```text
//! idle -> active <-> paused
//!           |
//!           v
//!        feedback -> completed
//! ```
//!
//! A session starts `idle` when a timer gates it and `active` otherwise.
//! Every operation is synchronous; the host drives the countdown by calling
//! [`ExerciseSession::tick`] once per elapsed second.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use tracing::{debug, info, warn};

use crate::config::{ExerciseConfig, FeedbackMode};
use crate::error::{ExerciseError, Result};
use crate::evaluate::{self, Evaluation, Verdict};
use crate::playable::Playable;
use crate::types::{ExerciseType, UserAnswer};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Idle,
    Active,
    Paused,
    Feedback,
    Completed,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Active => "active",
            Self::Paused => "paused",
            Self::Feedback => "feedback",
            Self::Completed => "completed",
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How much state a reset clears.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResetScope {
    /// Clear the answer but keep attempts and hints (retry flow).
    KeepAttempts,
    /// Back to the freshly mounted state.
    #[default]
    Full,
}

/// A hint handed out by [`ExerciseSession::use_hint`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Hint {
    /// Multiple choice: a distractor removed from the options.
    EliminateOption { index: usize },
    /// Fill-blank and drag-drop: first letter of a blank's word.
    FirstLetter { blank: usize, letter: char },
    /// Matching: a left item and the displayed right item it pairs with.
    RevealPair { left: usize, right: usize },
    /// Word highlight: a target token.
    RevealTarget { token: usize },
    /// Open questions: the hint written by the author.
    Authored { question: usize, text: String },
    /// Counted against the score without revealing anything.
    Counted,
}

/// Payload of the completion notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionResult {
    /// `None` when the session was never checked.
    pub is_correct: Option<bool>,
    pub user_answer: Option<UserAnswer>,
    pub score: i32,
    pub attempts: u32,
    pub hints_used: u32,
    pub timed_out: bool,
}

/// Notifications queued for the host, drained with [`ExerciseSession::take_events`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SessionEvent {
    Answered { answer: UserAnswer },
    Checked { status: Verdict, points: i32 },
    TimedOut,
    Completed { result: CompletionResult },
}

/// Operations a host can send to a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum SessionAction {
    Start,
    Pause,
    Resume,
    Answer {
        answer: UserAnswer,
    },
    Check {
        #[serde(default)]
        answer: Option<UserAnswer>,
    },
    Hint {
        #[serde(default)]
        target: Option<usize>,
    },
    Retry,
    Reset {
        #[serde(default)]
        scope: ResetScope,
    },
    Complete,
}

/// Mutable runtime state of one mounted exercise.
#[derive(Debug, Clone)]
pub struct ExerciseSession {
    playable: Playable,
    config: ExerciseConfig,
    status: SessionStatus,
    time_left: u32,
    attempts: u32,
    hints_used: u32,
    hints: Vec<Hint>,
    eliminated_options: BTreeSet<usize>,
    user_answer: Option<UserAnswer>,
    evaluation: Option<Evaluation>,
    score: i32,
    timed_out: bool,
    events: Vec<SessionEvent>,
}

impl ExerciseSession {
    pub fn new(playable: Playable, config: ExerciseConfig) -> Self {
        let mut session = Self {
            playable,
            status: SessionStatus::Idle,
            time_left: config.timer_seconds,
            config,
            attempts: 0,
            hints_used: 0,
            hints: Vec::new(),
            eliminated_options: BTreeSet::new(),
            user_answer: None,
            evaluation: None,
            score: 0,
            timed_out: false,
            events: Vec::new(),
        };
        session.status = session.initial_status();
        session
    }

    fn initial_status(&self) -> SessionStatus {
        if self.config.timer_enabled {
            SessionStatus::Idle
        } else {
            SessionStatus::Active
        }
    }

    fn require(&self, expected: SessionStatus, action: &'static str) -> Result<()> {
        if self.status == expected {
            Ok(())
        } else {
            Err(ExerciseError::InvalidTransition {
                action,
                status: self.status,
            })
        }
    }

    pub fn start(&mut self) -> Result<()> {
        match self.status {
            SessionStatus::Idle => {
                self.status = SessionStatus::Active;
                self.time_left = self.config.timer_seconds;
                debug!(exercise_type = %self.exercise_type(), "session started");
                if self.config.timer_enabled && self.time_left == 0 {
                    self.expire();
                }
                Ok(())
            }
            SessionStatus::Active => Ok(()),
            status => Err(ExerciseError::InvalidTransition {
                action: "start",
                status,
            }),
        }
    }

    pub fn pause(&mut self) -> Result<()> {
        match self.status {
            SessionStatus::Active => {
                self.status = SessionStatus::Paused;
                debug!(time_left = self.time_left, "session paused");
                Ok(())
            }
            SessionStatus::Paused => Ok(()),
            status => Err(ExerciseError::InvalidTransition {
                action: "pause",
                status,
            }),
        }
    }

    pub fn resume(&mut self) -> Result<()> {
        match self.status {
            SessionStatus::Paused => {
                self.status = SessionStatus::Active;
                debug!(time_left = self.time_left, "session resumed");
                Ok(())
            }
            SessionStatus::Active => Ok(()),
            status => Err(ExerciseError::InvalidTransition {
                action: "resume",
                status,
            }),
        }
    }

    /// Store an answer. In instant feedback mode a complete answer is
    /// scored immediately.
    pub fn set_answer(&mut self, answer: UserAnswer) -> Result<()> {
        self.require(SessionStatus::Active, "answer")?;
        self.playable.validate(&answer)?;

        let complete = self.playable.is_complete(&answer);
        self.events.push(SessionEvent::Answered {
            answer: answer.clone(),
        });
        self.user_answer = Some(answer);

        if complete && self.config.feedback_mode == FeedbackMode::Instant {
            self.score_current()?;
        }
        Ok(())
    }

    pub fn check_answer(&mut self) -> Result<Verdict> {
        self.check_answer_with(None)
    }

    /// Check the stored answer, or `answer` when the caller computed the
    /// value to compare separately. The override replaces the stored answer.
    pub fn check_answer_with(&mut self, answer: Option<UserAnswer>) -> Result<Verdict> {
        if !self.config.scoring_enabled() {
            return Err(ExerciseError::ScoringDisabled);
        }
        self.require(SessionStatus::Active, "check")?;

        if let Some(answer) = answer {
            self.playable.validate(&answer)?;
            self.user_answer = Some(answer);
        }
        self.score_current()
    }

    fn score_current(&mut self) -> Result<Verdict> {
        let evaluation = evaluate::evaluate(&self.playable, self.user_answer.as_ref(), &self.config)?;
        let status = evaluation.status;
        let points = status.points(&self.config);

        self.attempts += 1;
        // the latest check decides the score
        self.score = points;
        self.status = SessionStatus::Feedback;
        self.evaluation = Some(evaluation);

        debug!(?status, points, attempts = self.attempts, "answer checked");
        self.events.push(SessionEvent::Checked { status, points });
        Ok(status)
    }

    /// Hand out a hint, or `None` once the hint budget is spent, after the
    /// answer was checked, or when nothing is left to reveal.
    pub fn use_hint(&mut self, target: Option<usize>) -> Option<Hint> {
        if matches!(
            self.status,
            SessionStatus::Feedback | SessionStatus::Completed
        ) || self.hints_used >= self.config.max_hints
        {
            debug!(hints_used = self.hints_used, "hint refused");
            return None;
        }

        let hint = self.next_hint(target)?;
        self.hints_used += 1;
        if let Hint::EliminateOption { index } = hint {
            self.eliminated_options.insert(index);
        }
        debug!(?hint, hints_used = self.hints_used, "hint used");
        self.hints.push(hint.clone());
        Some(hint)
    }

    fn next_hint(&self, target: Option<usize>) -> Option<Hint> {
        let pick = |candidates: Vec<usize>| -> Option<usize> {
            match target {
                Some(t) if candidates.contains(&t) => Some(t),
                _ => candidates.first().copied(),
            }
        };

        match &self.playable {
            Playable::MultipleChoice { question, .. } => {
                let candidates = (0..question.options.len())
                    .filter(|i| {
                        !question.correct_answer.contains(*i)
                            && !self.eliminated_options.contains(i)
                    })
                    .collect();
                pick(candidates).map(|index| Hint::EliminateOption { index })
            }
            Playable::FillBlank(content) => {
                let blanks: Vec<(usize, &str)> = content
                    .blanks()
                    .map(|b| (b.index, b.correct_word))
                    .collect();
                self.first_letter_hint(&blanks, pick)
            }
            Playable::DragDrop { content, .. } => {
                let blanks: Vec<(usize, &str)> = content
                    .blanks()
                    .map(|b| (b.index, b.correct_word))
                    .collect();
                self.first_letter_hint(&blanks, pick)
            }
            Playable::Matching { right_order, .. } => {
                let revealed: BTreeSet<usize> = self
                    .hints
                    .iter()
                    .filter_map(|h| match h {
                        Hint::RevealPair { left, .. } => Some(*left),
                        _ => None,
                    })
                    .collect();
                let candidates = (0..right_order.len())
                    .filter(|left| !revealed.contains(left))
                    .collect();
                let left = pick(candidates)?;
                let right = right_order.iter().position(|&original| original == left)?;
                Some(Hint::RevealPair { left, right })
            }
            Playable::WordHighlight(content) => {
                let clicked = match &self.user_answer {
                    Some(UserAnswer::Clicks(clicks)) => clicks.clone(),
                    _ => BTreeSet::new(),
                };
                let revealed: BTreeSet<usize> = self
                    .hints
                    .iter()
                    .filter_map(|h| match h {
                        Hint::RevealTarget { token } => Some(*token),
                        _ => None,
                    })
                    .collect();
                let candidates = content
                    .target_indices()
                    .into_iter()
                    .filter(|t| !clicked.contains(t) && !revealed.contains(t))
                    .collect();
                pick(candidates).map(|token| Hint::RevealTarget { token })
            }
            Playable::OpenQuestions(content) => {
                let revealed: BTreeSet<usize> = self
                    .hints
                    .iter()
                    .filter_map(|h| match h {
                        Hint::Authored { question, .. } => Some(*question),
                        _ => None,
                    })
                    .collect();
                let candidates = content
                    .questions
                    .iter()
                    .enumerate()
                    .filter(|(i, q)| q.hint.is_some() && !revealed.contains(i))
                    .map(|(i, _)| i)
                    .collect();
                let question = pick(candidates)?;
                let text = content.questions[question].hint.clone()?;
                Some(Hint::Authored { question, text })
            }
            Playable::TrueFalse(_) => Some(Hint::Counted),
        }
    }

    fn first_letter_hint(
        &self,
        blanks: &[(usize, &str)],
        pick: impl Fn(Vec<usize>) -> Option<usize>,
    ) -> Option<Hint> {
        let revealed: BTreeSet<usize> = self
            .hints
            .iter()
            .filter_map(|h| match h {
                Hint::FirstLetter { blank, .. } => Some(*blank),
                _ => None,
            })
            .collect();
        let candidates = blanks
            .iter()
            .filter(|(index, word)| !word.is_empty() && !revealed.contains(index))
            .map(|(index, _)| *index)
            .collect();

        let blank = pick(candidates)?;
        let letter = blanks
            .iter()
            .find(|(index, _)| *index == blank)
            .and_then(|(_, word)| word.chars().next())?;
        Some(Hint::FirstLetter { blank, letter })
    }

    /// Clear the answer and return to the initial status.
    pub fn reset(&mut self, scope: ResetScope) -> Result<()> {
        if self.status == SessionStatus::Completed {
            return Err(ExerciseError::InvalidTransition {
                action: "reset",
                status: self.status,
            });
        }

        self.user_answer = None;
        self.evaluation = None;
        self.timed_out = false;
        self.time_left = self.config.timer_seconds;
        self.status = self.initial_status();

        if scope == ResetScope::Full {
            self.attempts = 0;
            self.score = 0;
            self.hints_used = 0;
            self.hints.clear();
            self.eliminated_options.clear();
        }

        debug!(?scope, status = %self.status, "session reset");
        Ok(())
    }

    /// A retry is offered after a wrong or partial answer while the retry
    /// budget lasts.
    pub fn can_retry(&self) -> bool {
        self.status == SessionStatus::Feedback
            && self.config.allow_retry
            && self.attempts < self.config.max_retries
            && !self.is_correct().unwrap_or(false)
    }

    /// Try again after feedback. Attempts and hints carry over; the score is
    /// cleared until the next check.
    pub fn retry(&mut self) -> Result<()> {
        if !self.can_retry() {
            return Err(ExerciseError::InvalidTransition {
                action: "retry",
                status: self.status,
            });
        }
        self.reset(ResetScope::KeepAttempts)?;
        self.score = 0;
        Ok(())
    }

    /// Finish the session. Emits the completion notification exactly once.
    pub fn complete(&mut self) -> Result<CompletionResult> {
        if self.status == SessionStatus::Completed {
            return Err(ExerciseError::AlreadyCompleted);
        }

        self.status = SessionStatus::Completed;
        let result = CompletionResult {
            is_correct: self.is_correct(),
            user_answer: self.user_answer.clone(),
            score: self.score,
            attempts: self.attempts,
            hints_used: self.hints_used,
            timed_out: self.timed_out,
        };

        info!(
            exercise_type = %self.exercise_type(),
            score = result.score,
            attempts = result.attempts,
            is_correct = ?result.is_correct,
            "exercise completed"
        );
        self.events.push(SessionEvent::Completed {
            result: result.clone(),
        });
        Ok(result)
    }

    /// Advance the countdown by one second. Returns `true` when this tick
    /// ran the clock out and submitted the answer as it stood.
    pub fn tick(&mut self) -> bool {
        if self.status != SessionStatus::Active || !self.config.timer_enabled {
            return false;
        }

        self.time_left = self.time_left.saturating_sub(1);
        if self.time_left > 0 {
            return false;
        }
        self.expire();
        true
    }

    /// Run the clock out: flag the timeout and submit the answer as it stood.
    fn expire(&mut self) {
        self.timed_out = true;
        debug!(exercise_type = %self.exercise_type(), "timer expired");
        self.events.push(SessionEvent::TimedOut);

        if self.config.scoring_enabled() {
            if let Err(err) = self.score_current() {
                warn!(error = %err, "auto-submit failed");
                self.status = SessionStatus::Feedback;
            }
        } else {
            self.status = SessionStatus::Feedback;
        }
    }

    pub fn apply(&mut self, action: SessionAction) -> Result<()> {
        match action {
            SessionAction::Start => self.start(),
            SessionAction::Pause => self.pause(),
            SessionAction::Resume => self.resume(),
            SessionAction::Answer { answer } => self.set_answer(answer),
            SessionAction::Check { answer } => self.check_answer_with(answer).map(|_| ()),
            SessionAction::Hint { target } => {
                self.use_hint(target);
                Ok(())
            }
            SessionAction::Retry => self.retry(),
            SessionAction::Reset { scope } => self.reset(scope),
            SessionAction::Complete => self.complete().map(|_| ()),
        }
    }

    pub fn take_events(&mut self) -> Vec<SessionEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn exercise_type(&self) -> ExerciseType {
        self.playable.exercise_type()
    }

    pub fn playable(&self) -> &Playable {
        &self.playable
    }

    pub fn config(&self) -> &ExerciseConfig {
        &self.config
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    /// Seconds left, when a timer is configured.
    pub fn time_left(&self) -> Option<u32> {
        self.config.timer_enabled.then_some(self.time_left)
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn hints_used(&self) -> u32 {
        self.hints_used
    }

    pub fn hints(&self) -> &[Hint] {
        &self.hints
    }

    pub fn eliminated_options(&self) -> &BTreeSet<usize> {
        &self.eliminated_options
    }

    pub fn user_answer(&self) -> Option<&UserAnswer> {
        self.user_answer.as_ref()
    }

    pub fn evaluation(&self) -> Option<&Evaluation> {
        self.evaluation.as_ref()
    }

    pub fn is_correct(&self) -> Option<bool> {
        self.evaluation.as_ref().map(Evaluation::is_correct)
    }

    pub fn score(&self) -> i32 {
        self.score
    }

    pub fn timed_out(&self) -> bool {
        self.timed_out
    }

    /// Whether the checked answer is on display.
    pub fn shows_feedback(&self) -> bool {
        self.evaluation.is_some()
            && matches!(
                self.status,
                SessionStatus::Feedback | SessionStatus::Completed
            )
    }
}
