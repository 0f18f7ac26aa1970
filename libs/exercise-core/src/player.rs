//! Player driver: detect, normalize, mount and relay.
//!
//! A [`Player`] owns everything mounted for one piece of content: a static
//! text block, a single session, or a group of sessions. Content that fails
//! to load leaves the player in a retryable error state instead of failing
//! the caller.

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::chained::{ChainedGroup, GroupSection, Progress};
use crate::config::{ConfigOverrides, ExerciseConfig, PlayerMode};
use crate::detect;
use crate::error::{ExerciseError, Result};
use crate::evaluate::Verdict;
use crate::normalize;
use crate::playable::Playable;
use crate::render::{self, Interaction, SessionView};
use crate::session::{
    CompletionResult, ExerciseSession, SessionAction, SessionEvent, SessionStatus,
};
use crate::types::{Exercise, ExerciseContent, ExerciseType, UserAnswer};

/// Wrapper the host draws around the exercise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayoutKind {
    #[default]
    Inline,
    Modal,
    Chained,
    Game,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlayerOptions {
    pub mode: PlayerMode,
    pub layout: LayoutKind,
    pub overrides: Option<ConfigOverrides>,
    /// Fixes the shuffles, for reproducible sessions.
    pub seed: Option<u64>,
}

/// Load failure shown in place of the exercise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerError {
    pub message: String,
    pub retryable: bool,
}

#[derive(Debug, Clone)]
pub enum Mounted {
    Static(String),
    Single(Box<ExerciseSession>),
    Group(ChainedGroup),
}

#[derive(Debug, Clone)]
pub enum PlayerState {
    Ready {
        exercise_type: ExerciseType,
        mounted: Mounted,
    },
    Failed(PlayerError),
}

/// Input routed to one mounted session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PlayerAction {
    Session(SessionAction),
    Interact(Interaction),
}

/// Notifications relayed to the host. `section` is `None` for a single
/// mounted session.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PlayerEvent {
    Answered {
        section: Option<usize>,
        answer: UserAnswer,
    },
    Checked {
        section: Option<usize>,
        status: Verdict,
        points: i32,
    },
    TimedOut {
        section: Option<usize>,
    },
    #[serde(rename_all = "camelCase")]
    Completed {
        section: Option<usize>,
        exercise_type: ExerciseType,
        content: ExerciseContent,
        result: CompletionResult,
    },
    AllComplete {
        score: i32,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerView {
    pub mode: PlayerMode,
    pub layout: LayoutKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<Progress>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hud: Option<GameHud>,
    pub body: PlayerBody,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameHud {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_left: Option<u32>,
    pub score: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PlayerBody {
    Error(PlayerError),
    Text {
        text: String,
    },
    #[serde(rename_all = "camelCase")]
    Single {
        exercise_type: ExerciseType,
        session: Box<SessionView>,
    },
    #[serde(rename_all = "camelCase")]
    Group {
        exercise_type: ExerciseType,
        all_complete: bool,
        sections: Vec<SectionView>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SectionView {
    Info {
        index: usize,
        text: String,
    },
    Exercise {
        index: usize,
        complete: bool,
        session: Box<SessionView>,
    },
}

#[derive(Debug)]
pub struct Player {
    content: ExerciseContent,
    options: PlayerOptions,
    config: ExerciseConfig,
    rng: StdRng,
    state: PlayerState,
    events: Vec<PlayerEvent>,
}

impl Player {
    /// Detect, normalize and mount `content`. Never fails; a load error is
    /// kept as [`PlayerState::Failed`].
    pub fn load(content: ExerciseContent, options: PlayerOptions) -> Self {
        let config = ExerciseConfig::resolve(options.mode, options.overrides.as_ref());
        let rng = match options.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let mut player = Self {
            content,
            options,
            config,
            rng,
            state: PlayerState::Failed(PlayerError {
                message: "not loaded".to_string(),
                retryable: true,
            }),
            events: Vec::new(),
        };
        player.state = player.mount();
        player
    }

    /// Clear the mounted state and run detection again, optionally on new
    /// content.
    pub fn retry(&mut self, content: Option<ExerciseContent>) {
        if let Some(content) = content {
            self.content = content;
        }
        self.events.clear();
        self.state = self.mount();
    }

    fn mount(&mut self) -> PlayerState {
        match self.try_mount() {
            Ok(state) => state,
            Err(err) => {
                warn!(error = %err, "exercise failed to load");
                PlayerState::Failed(PlayerError {
                    message: err.to_string(),
                    retryable: err.is_content_error(),
                })
            }
        }
    }

    fn try_mount(&mut self) -> Result<PlayerState> {
        let detection = detect::detect(&self.content);
        let exercise = normalize::normalize(&self.content, detection.exercise_type)?;
        let exercise_type = exercise.exercise_type();

        let mounted = match &exercise {
            Exercise::Text(text) => Mounted::Static(text.clone()),
            Exercise::Chained(sections) => {
                Mounted::Group(ChainedGroup::mount(sections, &self.config, &mut self.rng)?)
            }
            other => {
                let mut playables = Playable::mount_all(other, &self.config, &mut self.rng)?;
                if playables.len() == 1 {
                    Mounted::Single(Box::new(ExerciseSession::new(
                        playables.remove(0),
                        self.config.clone(),
                    )))
                } else {
                    Mounted::Group(ChainedGroup::from_playables(playables, &self.config))
                }
            }
        };

        info!(
            %exercise_type,
            source = ?detection.source,
            mode = ?self.options.mode,
            layout = ?self.options.layout,
            "exercise mounted"
        );
        Ok(PlayerState::Ready {
            exercise_type,
            mounted,
        })
    }

    pub fn state(&self) -> &PlayerState {
        &self.state
    }

    pub fn content(&self) -> &ExerciseContent {
        &self.content
    }

    pub fn config(&self) -> &ExerciseConfig {
        &self.config
    }

    pub fn options(&self) -> &PlayerOptions {
        &self.options
    }

    pub fn exercise_type(&self) -> Option<ExerciseType> {
        match &self.state {
            PlayerState::Ready { exercise_type, .. } => Some(*exercise_type),
            PlayerState::Failed(_) => None,
        }
    }

    /// Whether any mounted session runs a countdown.
    pub fn has_timer(&self) -> bool {
        self.config.timer_enabled && matches!(self.state, PlayerState::Ready { .. })
    }

    /// Whether a countdown may still run: some timed session has not been
    /// answered or completed yet.
    pub fn timer_pending(&self) -> bool {
        if !self.has_timer() {
            return false;
        }
        match &self.state {
            PlayerState::Ready {
                mounted: Mounted::Single(session),
                ..
            } => counting_down(session),
            PlayerState::Ready {
                mounted: Mounted::Group(group),
                ..
            } => group.sections().iter().any(|section| match section {
                GroupSection::Exercise(session) => counting_down(session),
                GroupSection::Info(_) => false,
            }),
            _ => false,
        }
    }

    /// Route an action to a session. A group needs `section`; without one
    /// the first unfinished exercise section is used.
    pub fn dispatch(&mut self, section: Option<usize>, action: PlayerAction) -> Result<()> {
        let session = self.target(section)?;
        let result = match action {
            PlayerAction::Session(action) => session.apply(action),
            PlayerAction::Interact(interaction) => render::interact(session, interaction),
        };
        self.relay();
        result
    }

    fn target(&mut self, section: Option<usize>) -> Result<&mut ExerciseSession> {
        match &mut self.state {
            PlayerState::Ready {
                mounted: Mounted::Single(session),
                ..
            } => match section {
                None | Some(0) => Ok(session.as_mut()),
                Some(index) => Err(ExerciseError::NoSuchSection { index }),
            },
            PlayerState::Ready {
                mounted: Mounted::Group(group),
                ..
            } => {
                let index = match section {
                    Some(index) => index,
                    None => (0..group.len())
                        .find(|&i| {
                            matches!(group.section(i), Ok(GroupSection::Exercise(_)))
                                && !group.is_section_complete(i)
                        })
                        .ok_or(ExerciseError::NoSuchSection { index: 0 })?,
                };
                group.session_mut(index)
            }
            PlayerState::Ready {
                mounted: Mounted::Static(_),
                ..
            }
            | PlayerState::Failed(_) => Err(ExerciseError::NotInteractive),
        }
    }

    /// Advance every running countdown by one second. Returns `true` when a
    /// session timed out on this tick.
    pub fn tick(&mut self) -> bool {
        let expired = match &mut self.state {
            PlayerState::Ready {
                mounted: Mounted::Single(session),
                ..
            } => session.tick(),
            PlayerState::Ready {
                mounted: Mounted::Group(group),
                ..
            } => group
                .sessions_mut()
                .fold(false, |expired, (_, session)| session.tick() || expired),
            _ => false,
        };
        if expired {
            self.relay();
        }
        expired
    }

    /// Drain notifications gathered since the last poll.
    pub fn poll_events(&mut self) -> Vec<PlayerEvent> {
        std::mem::take(&mut self.events)
    }

    /// Move session events into the player queue and record completions.
    fn relay(&mut self) {
        let PlayerState::Ready { mounted, .. } = &mut self.state else {
            return;
        };

        match mounted {
            Mounted::Static(_) => {}
            Mounted::Single(session) => {
                relay_session(None, session, &self.content, &mut self.events);
            }
            Mounted::Group(group) => {
                let mut finished = Vec::new();
                for (index, session) in group.sessions_mut() {
                    if relay_session(Some(index), session, &self.content, &mut self.events) {
                        finished.push(index);
                    }
                }
                for index in finished {
                    if group.mark_complete(index) {
                        self.events.push(PlayerEvent::AllComplete {
                            score: group.score(),
                        });
                    }
                }
            }
        }
    }

    pub fn view(&self) -> PlayerView {
        let layout = self.options.layout;
        let mut view = PlayerView {
            mode: self.options.mode,
            layout,
            title: None,
            progress: None,
            hud: None,
            body: PlayerBody::Error(PlayerError {
                message: String::new(),
                retryable: false,
            }),
        };

        match &self.state {
            PlayerState::Failed(error) => view.body = PlayerBody::Error(error.clone()),
            PlayerState::Ready {
                exercise_type,
                mounted,
            } => {
                if layout == LayoutKind::Modal {
                    view.title = Some(
                        self.content
                            .title()
                            .map(str::to_string)
                            .unwrap_or_else(|| exercise_type.to_string()),
                    );
                }

                match mounted {
                    Mounted::Static(text) => {
                        view.body = PlayerBody::Text { text: text.clone() };
                    }
                    Mounted::Single(session) => {
                        if layout == LayoutKind::Game {
                            view.hud = Some(GameHud {
                                time_left: session.time_left(),
                                score: session.score(),
                            });
                        }
                        view.body = PlayerBody::Single {
                            exercise_type: *exercise_type,
                            session: Box::new(render::render(session)),
                        };
                    }
                    Mounted::Group(group) => {
                        view.progress = Some(group.progress());
                        if layout == LayoutKind::Game {
                            view.hud = Some(GameHud {
                                time_left: group_time_left(group),
                                score: group.score(),
                            });
                        }
                        view.body = PlayerBody::Group {
                            exercise_type: *exercise_type,
                            all_complete: group.is_all_complete(),
                            sections: section_views(group),
                        };
                    }
                }
            }
        }
        view
    }
}

/// Returns whether the session completed.
fn relay_session(
    section: Option<usize>,
    session: &mut ExerciseSession,
    content: &ExerciseContent,
    out: &mut Vec<PlayerEvent>,
) -> bool {
    let mut completed = false;
    for event in session.take_events() {
        out.push(match event {
            SessionEvent::Answered { answer } => PlayerEvent::Answered { section, answer },
            SessionEvent::Checked { status, points } => PlayerEvent::Checked {
                section,
                status,
                points,
            },
            SessionEvent::TimedOut => PlayerEvent::TimedOut { section },
            SessionEvent::Completed { result } => {
                completed = true;
                debug!(?section, "relaying completion");
                PlayerEvent::Completed {
                    section,
                    exercise_type: session.exercise_type(),
                    content: content.clone(),
                    result,
                }
            }
        });
    }
    completed
}

/// Lowest countdown among running sections.
fn group_time_left(group: &ChainedGroup) -> Option<u32> {
    group
        .sections()
        .iter()
        .filter_map(|section| match section {
            GroupSection::Exercise(session) => session.time_left(),
            GroupSection::Info(_) => None,
        })
        .min()
}

fn section_views(group: &ChainedGroup) -> Vec<SectionView> {
    group
        .sections()
        .iter()
        .enumerate()
        .map(|(index, section)| match section {
            GroupSection::Info(text) => SectionView::Info {
                index,
                text: text.clone(),
            },
            GroupSection::Exercise(session) => SectionView::Exercise {
                index,
                complete: group.is_section_complete(index),
                session: Box::new(render::render(session)),
            },
        })
        .collect()
}

fn counting_down(session: &ExerciseSession) -> bool {
    matches!(
        session.status(),
        SessionStatus::Idle | SessionStatus::Active | SessionStatus::Paused
    )
}
