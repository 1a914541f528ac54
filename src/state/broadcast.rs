//! Audience routing for outbound events.
//!
//! The engine never talks to sockets. Each action fills an [`Outbox`] with
//! events addressed to audience classes; the application state then resolves
//! each audience against the registry and pushes the events, still under the
//! engine lock, so every client observes actions in the order they were applied.

use serde::Serialize;
use tracing::warn;

use crate::{
    dto::events::{
        BuzzerArmedEvent, BuzzerQueueEvent, ModeEvent, ModeView, ModeratorQuestionEvent,
        QuestionEvent, QuestionPayload, RevealEvent, RoundAnswerSummary, RoundAnswersEvent,
        ServerEvent, TeamSummary, TeamsEvent, ViewEvent,
    },
    state::{
        game::GameState,
        registry::{ClientHandle, ConnectionId},
    },
};

/// Registration acknowledgement, sent to the new connection.
pub const EVENT_REGISTERED: &str = "registered";
/// Role-appropriate picture of the whole show.
pub const EVENT_SNAPSHOT: &str = "state.snapshot";
/// Roster with scores.
pub const EVENT_TEAMS: &str = "teams.updated";
/// The buzzer window accepts buzzes.
pub const EVENT_BUZZER_ARMED: &str = "buzzer.armed";
/// The buzzer window is closed.
pub const EVENT_BUZZER_LOCKED: &str = "buzzer.locked";
/// Ordered queue of accepted buzzes.
pub const EVENT_BUZZER_QUEUE: &str = "buzzer.queue";
/// A team's place in the queue, sent to that team.
pub const EVENT_BUZZER_POSITION: &str = "buzzer.position";
/// The queue advanced to the next team.
pub const EVENT_BUZZER_NEXT: &str = "buzzer.next";
/// Question in play, without its solution.
pub const EVENT_QUESTION_DISPATCHED: &str = "question.dispatched";
/// Question in play, solution included.
pub const EVENT_QUESTION_CURRENT: &str = "question.current";
/// No question in play.
pub const EVENT_QUESTION_CLEARED: &str = "question.cleared";
/// One section of the question bank.
pub const EVENT_QUESTION_LIST: &str = "question.list";
/// A submitted answer was stored, sent to its author.
pub const EVENT_ANSWER_RECEIVED: &str = "answer.received";
/// Solution and winners of the round.
pub const EVENT_ANSWER_REVEAL: &str = "answer.reveal";
/// Judged answers of the current round.
pub const EVENT_ROUND_ANSWERS: &str = "round.answers";
/// Screen the display must show.
pub const EVENT_VIEW: &str = "view.changed";
/// Public progress of the special round.
pub const EVENT_MODE: &str = "mode.changed";
/// Full state of the special round.
pub const EVENT_MODE_DETAILS: &str = "mode.details";

/// Who receives an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Audience {
    /// Every registered connection.
    All,
    /// Moderator consoles.
    Moderators,
    /// Public displays.
    Displays,
    /// Team devices, previews included.
    Teams,
    /// Moderators and displays.
    Screens,
    /// A single connection.
    Connection(ConnectionId),
}

impl Audience {
    /// Whether the registered connection `id` with `handle` belongs to this audience.
    pub fn includes(&self, id: &ConnectionId, handle: &ClientHandle) -> bool {
        match self {
            Audience::All => true,
            Audience::Moderators => matches!(handle, ClientHandle::Moderator),
            Audience::Displays => matches!(handle, ClientHandle::Display),
            Audience::Teams => matches!(handle, ClientHandle::Team { .. }),
            Audience::Screens => {
                matches!(handle, ClientHandle::Moderator | ClientHandle::Display)
            }
            Audience::Connection(target) => target == id,
        }
    }

    /// Whether the display-class SSE stream mirrors this audience.
    pub fn reaches_public_stream(&self) -> bool {
        matches!(self, Audience::All | Audience::Displays | Audience::Screens)
    }

    /// Whether the moderator-class SSE stream mirrors this audience.
    pub fn reaches_admin_stream(&self) -> bool {
        matches!(
            self,
            Audience::All | Audience::Moderators | Audience::Screens
        )
    }
}

/// One event and its recipients.
#[derive(Debug, Clone, PartialEq)]
pub struct Dispatch {
    /// Recipients.
    pub audience: Audience,
    /// Named payload.
    pub event: ServerEvent,
}

/// Ordered list of events produced by one action.
#[derive(Debug, Default)]
pub struct Outbox {
    dispatches: Vec<Dispatch>,
}

impl Outbox {
    /// Queue `payload` under `event` for `audience`.
    pub fn push<T>(&mut self, audience: Audience, event: &str, payload: &T)
    where
        T: Serialize,
    {
        match ServerEvent::json(event, payload) {
            Ok(event) => self.dispatches.push(Dispatch { audience, event }),
            Err(err) => warn!(event, error = %err, "failed to serialise event payload"),
        }
    }

    /// Events in emission order.
    pub fn dispatches(&self) -> &[Dispatch] {
        &self.dispatches
    }

    /// Whether no event was produced.
    pub fn is_empty(&self) -> bool {
        self.dispatches.is_empty()
    }

    /// Roster with scores. Only moderators see it while the finale hides the leaderboard.
    pub fn teams(&mut self, state: &GameState) {
        let audience = if state.modes.leaderboard_hidden() {
            Audience::Moderators
        } else {
            Audience::All
        };
        self.push(audience, EVENT_TEAMS, &teams_event(state));
    }

    /// Current buzzer queue for moderators and displays.
    pub fn queue(&mut self, state: &GameState) {
        self.push(Audience::Screens, EVENT_BUZZER_QUEUE, &queue_event(state));
    }

    /// Lock state of the buzzer for everyone.
    pub fn buzzer_status(&mut self, state: &GameState) {
        if state.buzzer.is_locked() {
            self.push(Audience::All, EVENT_BUZZER_LOCKED, &serde_json::json!({}));
        } else {
            self.push(
                Audience::All,
                EVENT_BUZZER_ARMED,
                &BuzzerArmedEvent {
                    standalone: state.buzzer.is_standalone(),
                },
            );
        }
    }

    /// Current question: filtered for everyone, complete for moderators.
    pub fn question(&mut self, state: &GameState) {
        match &state.current_question {
            Some(question) => {
                self.push(
                    Audience::All,
                    EVENT_QUESTION_DISPATCHED,
                    &QuestionEvent {
                        question: QuestionPayload::from(question),
                    },
                );
                self.push(
                    Audience::Moderators,
                    EVENT_QUESTION_CURRENT,
                    &ModeratorQuestionEvent {
                        question: question.clone(),
                    },
                );
            }
            None => self.push(
                Audience::All,
                EVENT_QUESTION_CLEARED,
                &serde_json::json!({}),
            ),
        }
    }

    /// Answer log of the round to `audience`.
    pub fn round_answers(&mut self, state: &GameState, audience: Audience) {
        self.push(audience, EVENT_ROUND_ANSWERS, &round_answers_event(state));
    }

    /// Screen the display must show. The winner standings stay with the
    /// moderators while the finale hides the leaderboard.
    pub fn view(&mut self, state: &GameState) {
        if state.modes.leaderboard_hidden() {
            self.split(EVENT_VIEW, &view_event(state, false), &view_event(state, true));
        } else {
            self.push(Audience::All, EVENT_VIEW, &view_event(state, true));
        }
    }

    /// Solution and winners of the round. Scores stay with the moderators
    /// while the finale hides the leaderboard.
    pub fn reveal(&mut self, state: &GameState, reveal: RevealEvent) {
        if state.modes.leaderboard_hidden() {
            self.split(EVENT_ANSWER_REVEAL, &reveal.clone().without_scores(), &reveal);
        } else {
            self.push(Audience::All, EVENT_ANSWER_REVEAL, &reveal);
        }
    }

    fn split<T>(&mut self, event: &str, public: &T, moderator: &T)
    where
        T: Serialize,
    {
        self.push(Audience::Displays, event, public);
        self.push(Audience::Teams, event, public);
        self.push(Audience::Moderators, event, moderator);
    }

    /// Special round: public progress for everyone, full details for moderators.
    pub fn mode(&mut self, state: &GameState) {
        self.push(Audience::All, EVENT_MODE, &mode_event(state, false));
        self.push(
            Audience::Moderators,
            EVENT_MODE_DETAILS,
            &mode_event(state, true),
        );
    }
}

pub(crate) fn team_summaries(state: &GameState) -> Vec<TeamSummary> {
    state.ranked_teams().map(TeamSummary::from).collect()
}

pub(crate) fn teams_event(state: &GameState) -> TeamsEvent {
    TeamsEvent {
        teams: team_summaries(state),
    }
}

pub(crate) fn queue_event(state: &GameState) -> BuzzerQueueEvent {
    BuzzerQueueEvent {
        entries: state.buzzer.queue().iter().map(Into::into).collect(),
        locked: state.buzzer.is_locked(),
        standalone: state.buzzer.is_standalone(),
    }
}

pub(crate) fn round_answers_event(state: &GameState) -> RoundAnswersEvent {
    RoundAnswersEvent {
        answers: state
            .round_answers
            .iter()
            .map(RoundAnswerSummary::from)
            .collect(),
    }
}

pub(crate) fn view_event(state: &GameState, moderator: bool) -> ViewEvent {
    let leaderboard = if moderator || !state.modes.leaderboard_hidden() {
        state
            .leaderboard()
            .into_iter()
            .map(TeamSummary::from)
            .collect()
    } else {
        Vec::new()
    };
    ViewEvent::new(&state.view, leaderboard)
}

pub(crate) fn mode_event(state: &GameState, moderator: bool) -> ModeEvent {
    let active = state.modes.active();
    ModeEvent {
        active: active.map(|mode| mode.kind()),
        mode: active.map(|mode| {
            if moderator {
                ModeView::moderator(mode)
            } else {
                ModeView::public(mode)
            }
        }),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use uuid::Uuid;

    use super::*;
    use crate::state::{
        game::{Question, QuestionMode, Team},
        modes::{ActiveMode, FinaleState},
    };

    fn state_with_question(mode: QuestionMode) -> GameState {
        let mut state = GameState::new(String::new());
        state.current_question = Some(Question {
            id: "q1".into(),
            prompt: "Pick one".into(),
            mode,
            correct_answer: "B".into(),
            choices: Some(vec!["A".into(), "B".into()]),
            ..Question::default()
        });
        state
    }

    #[test]
    fn audience_membership() {
        let id = Uuid::new_v4();
        let other = Uuid::new_v4();
        let preview = ClientHandle::Team {
            team_id: "p".into(),
            preview: true,
        };

        assert!(Audience::Teams.includes(&id, &preview));
        assert!(!Audience::Screens.includes(&id, &preview));
        assert!(Audience::Screens.includes(&id, &ClientHandle::Display));
        assert!(!Audience::Moderators.includes(&id, &ClientHandle::Display));
        assert!(Audience::Connection(id).includes(&id, &ClientHandle::Display));
        assert!(!Audience::Connection(other).includes(&id, &ClientHandle::Display));
    }

    #[test]
    fn dispatched_question_never_carries_the_solution() {
        let mut outbox = Outbox::default();
        outbox.question(&state_with_question(QuestionMode::Buzzer));

        let public = &outbox.dispatches()[0];
        assert_eq!(public.audience, Audience::All);
        assert_eq!(public.event.event, EVENT_QUESTION_DISPATCHED);
        let question = &public.event.data["question"];
        assert!(question.get("correct_answer").is_none());
        assert!(question.get("choices").is_none());

        let moderator = &outbox.dispatches()[1];
        assert_eq!(moderator.audience, Audience::Moderators);
        assert_eq!(moderator.event.data["question"]["correct_answer"], "B");
    }

    #[test]
    fn multiple_choice_keeps_its_choices() {
        let mut outbox = Outbox::default();
        outbox.question(&state_with_question(QuestionMode::MultipleChoice));

        let question = &outbox.dispatches()[0].event.data["question"];
        assert_eq!(question["choices"], serde_json::json!(["A", "B"]));
        assert!(question.get("correct_answer").is_none());
    }

    #[test]
    fn hidden_leaderboard_keeps_scores_with_moderators() {
        let mut state = GameState::new(String::new());
        state
            .teams
            .insert("a".into(), Team::new("a".into(), "A".into(), false));
        state.modes.activate(ActiveMode::Finale(FinaleState {
            hide_leaderboard: true,
            ..FinaleState::default()
        }));

        let mut outbox = Outbox::default();
        outbox.teams(&state);
        assert_eq!(outbox.dispatches()[0].audience, Audience::Moderators);
    }

    #[test]
    fn queue_reports_lock_state() {
        let mut state = GameState::new(String::new());
        state.buzzer.open_window(true, Instant::now());

        let event = queue_event(&state);
        assert!(!event.locked);
        assert!(event.standalone);
        assert!(event.entries.is_empty());
    }

    #[test]
    fn stream_mirroring() {
        assert!(Audience::Screens.reaches_public_stream());
        assert!(!Audience::Moderators.reaches_public_stream());
        assert!(Audience::Moderators.reaches_admin_stream());
        assert!(!Audience::Teams.reaches_admin_stream());
        assert!(!Audience::Connection(Uuid::new_v4()).reaches_admin_stream());
    }
}
