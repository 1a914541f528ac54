//! The single writer of the game state.
//!
//! Every client action goes through [`GameEngine::handle`], which validates the
//! caller's role, applies the action to [`GameState`] and returns the events to
//! deliver. A rejected action leaves the state untouched and produces nothing.

use std::{
    sync::Arc,
    time::{Instant, SystemTime},
};

use tracing::{debug, info, warn};

use crate::{
    config::GameRules,
    dao::question_bank::{QuestionBank, QuestionKind},
    dto::{
        events::{
            AnswerReceivedEvent, BuzzerEntrySummary, BuzzerPositionEvent, ModeratorExtras,
            QuestionListEvent, QuestionPayload, RegisteredEvent, RevealEvent, StateSnapshot,
            TeamSummary, seconds,
        },
        format_system_time,
        ws::{ClientMessage, Permission},
    },
    error::Rejection,
    state::{
        broadcast::{
            Audience, EVENT_ANSWER_RECEIVED, EVENT_BUZZER_NEXT, EVENT_BUZZER_POSITION,
            EVENT_QUESTION_LIST, EVENT_REGISTERED, EVENT_SNAPSHOT, Outbox,
            mode_event, queue_event, round_answers_event, team_summaries, view_event,
        },
        buzzer::AdvanceOutcome,
        game::{DisplayView, GameState, Question, QuestionMode, RoundAnswer, TeamId},
        modes::{
            ActiveMode, DuelState, FinaleState, MemoryPhase, MemoryState, ModeKind, ZoomState,
        },
        registry::{ClientHandle, ConnectionId, ConnectionRegistry, Role},
    },
};

/// Longest free-text answer or custom screen text accepted.
pub const MAX_TEXT_CHARS: usize = 500;

/// Origin of an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Caller {
    /// A WebSocket connection, checked against the registry.
    Connection(ConnectionId),
    /// The moderator REST surface, trusted as a moderator.
    Console,
}

/// Caller resolved against the registry.
#[derive(Debug, Clone)]
enum Actor {
    Team {
        team_id: TeamId,
        connection: ConnectionId,
    },
    Preview {
        connection: ConnectionId,
    },
    Moderator {
        connection: Option<ConnectionId>,
    },
    Display {
        connection: ConnectionId,
    },
}

/// Owns the game state, the connection registry and the question bank.
pub struct GameEngine {
    state: GameState,
    registry: ConnectionRegistry,
    bank: Arc<QuestionBank>,
    rules: GameRules,
}

impl GameEngine {
    /// Fresh show: no team, logo on the display, buzzer locked.
    pub fn new(bank: Arc<QuestionBank>, rules: GameRules) -> Self {
        Self {
            state: GameState::new(rules.default_custom_text.clone()),
            registry: ConnectionRegistry::default(),
            bank,
            rules,
        }
    }

    /// Read-only view of the game state.
    pub fn state(&self) -> &GameState {
        &self.state
    }

    /// Read-only view of the registry.
    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    /// Shared question bank.
    pub fn bank(&self) -> &QuestionBank {
        &self.bank
    }

    /// Apply `message` on behalf of `caller`, with `now` read when the action
    /// was dequeued.
    pub fn handle(
        &mut self,
        caller: Caller,
        message: ClientMessage,
        now: Instant,
    ) -> Result<Outbox, Rejection> {
        let action = message.name();
        let result = self.apply(caller, message, now);
        match &result {
            Ok(outbox) => debug!(action, events = outbox.dispatches().len(), "action applied"),
            Err(reason) => debug!(action, caller = ?caller, %reason, "action rejected"),
        }
        result
    }

    /// Forget a closed connection, keeping its team's score.
    pub fn disconnect(&mut self, connection_id: &ConnectionId) -> Outbox {
        let mut out = Outbox::default();
        if let Some(handle) = self
            .registry
            .unregister(connection_id, &mut self.state.teams)
        {
            info!(connection = %connection_id, role = ?handle.role(), "client disconnected");
            if matches!(handle, ClientHandle::Team { preview: false, .. }) {
                out.teams(&self.state);
            }
        }
        out
    }

    /// Role-appropriate picture of the whole show.
    pub fn snapshot(&self, moderator: bool) -> StateSnapshot {
        let teams = (moderator || !self.state.modes.leaderboard_hidden())
            .then(|| team_summaries(&self.state));

        StateSnapshot {
            server_time: format_system_time(SystemTime::now()),
            teams,
            question: self
                .state
                .current_question
                .as_ref()
                .map(QuestionPayload::from),
            buzzer: queue_event(&self.state),
            view: view_event(&self.state, moderator),
            paused: self.state.paused,
            mode: mode_event(&self.state, moderator),
            moderator: moderator.then(|| ModeratorExtras {
                question: self.state.current_question.clone(),
                round_answers: round_answers_event(&self.state).answers,
                custom_text: self.state.custom_text.clone(),
                connections: self.registry.len(),
            }),
        }
    }

    fn apply(
        &mut self,
        caller: Caller,
        message: ClientMessage,
        now: Instant,
    ) -> Result<Outbox, Rejection> {
        let mut out = Outbox::default();

        if let ClientMessage::Register {
            role,
            name,
            team_id,
        } = &message
        {
            let Caller::Connection(connection) = caller else {
                return Err(Rejection::invalid("the console cannot register"));
            };
            self.register(connection, *role, name.as_deref(), team_id.as_deref(), &mut out)?;
            return Ok(out);
        }

        let actor = self.actor(caller)?;
        match (message.permission(), &actor) {
            (Permission::Anyone, _) => {}
            (_, Actor::Preview { .. }) => return Err(Rejection::ReadOnly),
            (Permission::Team, Actor::Team { .. }) => {}
            (Permission::Moderator, Actor::Moderator { .. }) => {}
            _ => {
                return Err(Rejection::invalid(format!(
                    "`{}` is not allowed for this role",
                    message.name()
                )));
            }
        }

        use ClientMessage as M;
        match message {
            M::Register { .. } | M::Unknown => {
                return Err(Rejection::invalid("unknown message type"));
            }
            M::RequestSnapshot => self.send_snapshot(&actor, &mut out)?,

            M::Buzz => {
                let (team_id, connection) = team_of(&actor)?;
                self.buzz(team_id, connection, now, &mut out)?;
            }
            M::SubmitAnswer { answer } => {
                let (team_id, connection) = team_of(&actor)?;
                self.submit_answer(team_id, connection, &answer, now, &mut out)?;
            }
            M::MemoryAnswer { position } => {
                let (team_id, connection) = team_of(&actor)?;
                self.memory_answer(team_id, connection, position, &mut out)?;
            }
            M::FinaleBet { amount } => {
                let (team_id, connection) = team_of(&actor)?;
                self.finale_bet(team_id, connection, amount, &mut out)?;
            }

            M::RequestQuestions { kind, key } => {
                let reply = match &actor {
                    Actor::Moderator {
                        connection: Some(connection),
                    } => *connection,
                    _ => return Err(Rejection::invalid("question listing needs a connection")),
                };
                self.request_questions(reply, kind, key, &mut out);
            }
            M::DispatchQuestion { question } => self.dispatch_question(question, now, &mut out),
            M::OpenBuzzer { standalone } => self.open_buzzer(standalone, now, &mut out),
            M::AwardPoints { team_id, points } => {
                self.award_points(&team_id, points, now, &mut out)?
            }
            M::JudgeWrong => self.judge_wrong(&mut out)?,
            M::JudgeCorrect { points } => self.judge_correct(points, &mut out)?,
            M::CloseBuzzer => {
                self.state.buzzer.close();
                out.queue(&self.state);
                out.buzzer_status(&self.state);
            }
            M::ResetBuzzer => {
                self.state.buzzer.reset_for_new_round(now);
                out.queue(&self.state);
                out.buzzer_status(&self.state);
            }
            M::ResetDisplays => self.reset_displays(&mut out),
            M::Pause => self.pause(&mut out)?,
            M::Resume => self.resume(&mut out)?,
            M::SaveCustomText { text } => self.save_custom_text(text, &mut out)?,
            M::ShowCustomScreen => {
                let text = self.state.custom_text.clone();
                self.show(DisplayView::Custom(text), &mut out);
            }
            M::ShowWinner => self.show(DisplayView::Winner, &mut out),
            M::ShowLogo => self.show(DisplayView::Logo, &mut out),
            M::ShowGame => {
                if self.state.paused {
                    return Err(Rejection::invalid("resume the show to go back to the game"));
                }
                self.show(DisplayView::Game, &mut out);
            }
            M::AssignPoints { team_id, delta } => {
                self.state
                    .credit(&team_id, delta)
                    .ok_or_else(|| Rejection::missing(format!("team `{team_id}`")))?;
                info!(team_id = %team_id, delta, "manual score correction");
                out.teams(&self.state);
            }
            M::RevealAnswers { points } => self.reveal_answers(points, &mut out)?,

            M::DuelStart {
                challenger,
                defender,
            } => self.duel_start(challenger, defender, &mut out)?,
            M::DuelJudge { correct } => {
                self.duel()?.judge(correct)?;
                out.mode(&self.state);
            }
            M::DuelNext => {
                self.duel()?.next_question()?;
                out.mode(&self.state);
            }
            M::DuelReconcile { points } => self.duel_reconcile(points, &mut out)?,
            M::DuelReset => self.end_mode(ModeKind::Duel, &mut out)?,

            M::ZoomStart { question } => self.zoom_start(question, now, &mut out),
            M::ZoomReveal => {
                self.zoom()?.reveal_next_level()?;
                out.mode(&self.state);
            }
            M::ZoomJudge { correct } => self.zoom_judge(correct, &mut out)?,
            M::ZoomReset => {
                self.end_mode(ModeKind::Zoom, &mut out)?;
                self.state.buzzer.settle();
                out.queue(&self.state);
                out.buzzer_status(&self.state);
            }

            M::MemoryStart { question } => {
                self.start_mode(ActiveMode::Memory(MemoryState::new(question)), &mut out)
            }
            M::MemoryAdvance => self.memory_advance(&mut out)?,
            M::MemoryReset => self.end_mode(ModeKind::Memory, &mut out)?,

            M::FinaleStart => {
                self.start_mode(ActiveMode::Finale(FinaleState::default()), &mut out);
                out.teams(&self.state);
            }
            M::FinaleQuestion { question } => {
                self.finale()?.set_question(question)?;
                out.mode(&self.state);
            }
            M::FinaleJudge { team_id, correct } => {
                self.finale_judge(&team_id, correct, &mut out)?
            }
            M::FinaleNext => {
                self.finale()?.next_question()?;
                out.mode(&self.state);
            }
            M::FinaleLeaderboard { hidden } => {
                self.finale()?.hide_leaderboard = hidden;
                out.mode(&self.state);
                out.teams(&self.state);
                if self.state.view == DisplayView::Winner {
                    out.view(&self.state);
                }
            }
            M::FinaleReset => {
                self.end_mode(ModeKind::Finale, &mut out)?;
                out.teams(&self.state);
                if self.state.view == DisplayView::Winner {
                    out.view(&self.state);
                }
            }
        }

        Ok(out)
    }

    fn actor(&self, caller: Caller) -> Result<Actor, Rejection> {
        let connection = match caller {
            Caller::Console => return Ok(Actor::Moderator { connection: None }),
            Caller::Connection(connection) => connection,
        };
        let handle = self
            .registry
            .handle(&connection)
            .ok_or(Rejection::NotRegistered)?;

        Ok(match handle {
            ClientHandle::Team { preview: true, .. } => Actor::Preview { connection },
            ClientHandle::Team { team_id, .. } => Actor::Team {
                team_id: team_id.clone(),
                connection,
            },
            ClientHandle::Moderator => Actor::Moderator {
                connection: Some(connection),
            },
            ClientHandle::Display => Actor::Display { connection },
        })
    }

    fn register(
        &mut self,
        connection: ConnectionId,
        role: Role,
        name: Option<&str>,
        team_key: Option<&str>,
        out: &mut Outbox,
    ) -> Result<(), Rejection> {
        let handle =
            self.registry
                .register(connection, role, name, team_key, &mut self.state.teams)?;
        info!(
            connection = %connection,
            role = ?handle.role(),
            team_id = ?handle.team_id(),
            "client registered"
        );

        out.push(
            Audience::Connection(connection),
            EVENT_REGISTERED,
            &RegisteredEvent {
                connection_id: connection,
                role: handle.role(),
                team_id: handle.team_id().cloned(),
            },
        );
        let moderator = matches!(handle, ClientHandle::Moderator);
        out.push(
            Audience::Connection(connection),
            EVENT_SNAPSHOT,
            &self.snapshot(moderator),
        );
        if matches!(handle, ClientHandle::Team { preview: false, .. }) {
            out.teams(&self.state);
        }
        Ok(())
    }

    fn send_snapshot(&self, actor: &Actor, out: &mut Outbox) -> Result<(), Rejection> {
        let (connection, moderator) = match actor {
            Actor::Moderator {
                connection: Some(connection),
            } => (*connection, true),
            Actor::Team { connection, .. }
            | Actor::Preview { connection }
            | Actor::Display { connection } => (*connection, false),
            Actor::Moderator { connection: None } => {
                return Err(Rejection::invalid("snapshot needs a connection"));
            }
        };
        out.push(
            Audience::Connection(connection),
            EVENT_SNAPSHOT,
            &self.snapshot(moderator),
        );
        Ok(())
    }

    fn buzz(
        &mut self,
        team_id: TeamId,
        connection: ConnectionId,
        now: Instant,
        out: &mut Outbox,
    ) -> Result<(), Rejection> {
        if self.state.paused {
            return Err(Rejection::invalid("show is paused"));
        }
        let name = self
            .state
            .playing_team(&team_id)
            .map(|team| team.name.clone())
            .ok_or_else(|| Rejection::missing(format!("team `{team_id}`")))?;

        let elapsed = self.state.elapsed(now);
        if let Some(duel) = self.state.modes.duel_mut() {
            duel.buzz(&team_id)?;
            out.push(
                Audience::Connection(connection),
                EVENT_BUZZER_POSITION,
                &BuzzerPositionEvent {
                    queue_position: 1,
                    reaction_time_seconds: seconds(elapsed),
                },
            );
            out.mode(&self.state);
            return Ok(());
        }

        if let Some(zoom) = self.state.modes.zoom() {
            if !zoom.can_attempt(&team_id) {
                return Err(Rejection::invalid(format!(
                    "team `{team_id}` cannot try this image again"
                )));
            }
        }

        let entry = self.state.buzzer.attempt_buzz(&team_id, &name, now)?;
        out.push(
            Audience::Connection(connection),
            EVENT_BUZZER_POSITION,
            &BuzzerPositionEvent {
                queue_position: entry.queue_position,
                reaction_time_seconds: seconds(entry.reaction_time),
            },
        );
        out.queue(&self.state);
        if self.state.buzzer.queue().len() == 1 {
            out.push(
                Audience::Moderators,
                EVENT_BUZZER_NEXT,
                &BuzzerEntrySummary::from(&entry),
            );
        }
        Ok(())
    }

    fn submit_answer(
        &mut self,
        team_id: TeamId,
        connection: ConnectionId,
        answer: &str,
        now: Instant,
        out: &mut Outbox,
    ) -> Result<(), Rejection> {
        if self.state.paused {
            return Err(Rejection::invalid("show is paused"));
        }
        let question = self
            .state
            .current_question
            .as_ref()
            .ok_or_else(|| Rejection::invalid("no question in play"))?;
        if question.mode == QuestionMode::Buzzer {
            return Err(Rejection::invalid("buzzer questions are answered out loud"));
        }
        if self.state.answers_revealed {
            return Err(Rejection::invalid("answers already revealed"));
        }
        if self
            .state
            .round_answers
            .iter()
            .any(|entry| entry.team_id == team_id)
        {
            return Err(Rejection::invalid(format!(
                "team `{team_id}` already answered"
            )));
        }
        let answer = answer.trim();
        if answer.is_empty() || answer.chars().count() > MAX_TEXT_CHARS {
            return Err(Rejection::invalid("answer must hold 1 to 500 characters"));
        }
        let is_correct = question.mode != QuestionMode::Estimate && answer_matches(question, answer);
        let team_name = self
            .state
            .playing_team(&team_id)
            .map(|team| team.name.clone())
            .ok_or_else(|| Rejection::missing(format!("team `{team_id}`")))?;

        self.state.round_answers.push(RoundAnswer {
            team_id,
            team_name,
            answer_text: answer.to_string(),
            is_correct,
            reaction_time: self.state.elapsed(now),
            points_awarded: 0,
        });

        out.push(
            Audience::Connection(connection),
            EVENT_ANSWER_RECEIVED,
            &AnswerReceivedEvent {
                kind: "answer".into(),
            },
        );
        out.round_answers(&self.state, Audience::Moderators);
        Ok(())
    }

    fn request_questions(
        &self,
        reply: ConnectionId,
        kind: QuestionKind,
        key: Option<String>,
        out: &mut Outbox,
    ) {
        let questions = self.bank.list(kind, key.as_deref());
        debug!(%kind, key = ?key, count = questions.len(), "listing questions");
        out.push(
            Audience::Connection(reply),
            EVENT_QUESTION_LIST,
            &QuestionListEvent {
                kind,
                key,
                questions,
            },
        );
    }

    fn dispatch_question(&mut self, question: Question, now: Instant, out: &mut Outbox) {
        info!(question_id = %question.id, mode = ?question.mode, "dispatching question");

        let buzzer_race = question.mode == QuestionMode::Buzzer;
        self.state.current_question = Some(question);
        self.state.question_started_at = Some(now);
        self.state.round_answers.clear();
        self.state.answers_revealed = false;
        self.state.buzzer.open_window(false, now);
        if !buzzer_race {
            self.state.buzzer.close();
        }
        if !self.state.paused {
            self.state.view = DisplayView::Game;
        }

        out.question(&self.state);
        out.round_answers(&self.state, Audience::Screens);
        out.queue(&self.state);
        out.buzzer_status(&self.state);
        out.view(&self.state);
    }

    fn open_buzzer(&mut self, standalone: bool, now: Instant, out: &mut Outbox) {
        self.state.buzzer.open_window(standalone, now);
        out.queue(&self.state);
        out.buzzer_status(&self.state);
    }

    fn award_points(
        &mut self,
        team_id: &str,
        points: i32,
        now: Instant,
        out: &mut Outbox,
    ) -> Result<(), Rejection> {
        let team_name = self
            .state
            .playing_team(team_id)
            .map(|team| team.name.clone())
            .ok_or_else(|| Rejection::missing(format!("team `{team_id}`")))?;
        let reaction_time = self
            .state
            .buzzer
            .queue()
            .iter()
            .find(|entry| entry.team_id == team_id)
            .map(|entry| entry.reaction_time)
            .unwrap_or_else(|| self.state.elapsed(now));

        self.state.buzzer.settle();
        self.settle_correct(
            RoundAnswer {
                team_id: team_id.to_string(),
                team_name,
                answer_text: String::new(),
                is_correct: true,
                reaction_time,
                points_awarded: points,
            },
            out,
        );
        Ok(())
    }

    fn judge_correct(&mut self, points: i32, out: &mut Outbox) -> Result<(), Rejection> {
        let head = self.state.buzzer.award_head()?;
        if let Some(zoom) = self.state.modes.zoom_mut() {
            zoom.record_solved(&head.team_id);
        }
        self.settle_correct(
            RoundAnswer {
                team_id: head.team_id,
                team_name: head.name,
                answer_text: String::new(),
                is_correct: true,
                reaction_time: head.reaction_time,
                points_awarded: points,
            },
            out,
        );
        Ok(())
    }

    /// Credit a correct answer and close the round for everyone.
    fn settle_correct(&mut self, answer: RoundAnswer, out: &mut Outbox) {
        if self
            .state
            .credit(&answer.team_id, answer.points_awarded)
            .is_none()
        {
            warn!(team_id = %answer.team_id, "awarded team is no longer on the roster");
        }
        info!(
            team_id = %answer.team_id,
            points = answer.points_awarded,
            "correct answer awarded"
        );
        let winner = self.state.playing_team(&answer.team_id).map(TeamSummary::from);
        self.state.round_answers.push(answer);
        self.state.answers_revealed = true;

        out.teams(&self.state);
        out.reveal(
            &self.state,
            RevealEvent {
                correct_answer: self.correct_answer(),
                winners: winner.into_iter().collect(),
            },
        );
        out.round_answers(&self.state, Audience::Screens);
        out.queue(&self.state);
        out.buzzer_status(&self.state);
        if self.state.modes.zoom().is_some() {
            out.mode(&self.state);
        }
    }

    fn judge_wrong(&mut self, out: &mut Outbox) -> Result<(), Rejection> {
        let (judged, outcome) = self.state.buzzer.advance_past_wrong()?;
        let in_zoom = match self.state.modes.zoom_mut() {
            Some(zoom) => {
                zoom.record_wrong(&judged.team_id);
                true
            }
            None => false,
        };

        self.state.round_answers.push(RoundAnswer {
            team_id: judged.team_id,
            team_name: judged.name,
            answer_text: String::new(),
            is_correct: false,
            reaction_time: judged.reaction_time,
            points_awarded: 0,
        });

        out.queue(&self.state);
        match outcome {
            AdvanceOutcome::NextUp(next) => out.push(
                Audience::Moderators,
                EVENT_BUZZER_NEXT,
                &BuzzerEntrySummary::from(&next),
            ),
            AdvanceOutcome::Reopened => out.buzzer_status(&self.state),
        }
        out.round_answers(&self.state, Audience::Moderators);
        if in_zoom {
            out.mode(&self.state);
        }
        Ok(())
    }

    fn reveal_answers(&mut self, points: Option<i32>, out: &mut Outbox) -> Result<(), Rejection> {
        let question = self
            .state
            .current_question
            .as_ref()
            .ok_or_else(|| Rejection::invalid("no question in play"))?;
        if self.state.answers_revealed {
            return Err(Rejection::invalid("answers already revealed"));
        }
        let mode = question.mode;
        let correct_answer = question.correct_answer.clone();
        let points = points.unwrap_or(self.rules.reveal_points);

        if mode == QuestionMode::Estimate {
            mark_closest_estimates(&correct_answer, &mut self.state.round_answers);
        }

        let mut winners = Vec::new();
        for answer in self
            .state
            .round_answers
            .iter_mut()
            .filter(|answer| answer.is_correct)
        {
            if mode != QuestionMode::Buzzer {
                answer.points_awarded = points;
            }
            winners.push(answer.team_id.clone());
        }
        if mode != QuestionMode::Buzzer {
            for team_id in &winners {
                self.state.credit(team_id, points);
            }
        }
        self.state.answers_revealed = true;
        self.state.buzzer.settle();
        info!(winners = winners.len(), points, "answers revealed");

        let winners = winners
            .iter()
            .filter_map(|team_id| self.state.playing_team(team_id))
            .map(TeamSummary::from)
            .collect();
        out.teams(&self.state);
        out.reveal(
            &self.state,
            RevealEvent {
                correct_answer: Some(correct_answer),
                winners,
            },
        );
        out.round_answers(&self.state, Audience::Screens);
        out.queue(&self.state);
        out.buzzer_status(&self.state);
        Ok(())
    }

    fn reset_displays(&mut self, out: &mut Outbox) {
        info!("resetting displays");
        self.state.current_question = None;
        self.state.question_started_at = None;
        self.state.round_answers.clear();
        self.state.answers_revealed = false;
        self.state.buzzer.clear();
        self.state.modes.reset();
        self.state.paused = false;
        self.state.view = DisplayView::Logo;

        out.question(&self.state);
        out.round_answers(&self.state, Audience::Screens);
        out.queue(&self.state);
        out.buzzer_status(&self.state);
        out.mode(&self.state);
        out.teams(&self.state);
        out.view(&self.state);
    }

    fn pause(&mut self, out: &mut Outbox) -> Result<(), Rejection> {
        if self.state.paused {
            return Err(Rejection::invalid("show already paused"));
        }
        info!("show paused");
        self.state.paused = true;
        self.show(DisplayView::Pause, out);
        Ok(())
    }

    fn resume(&mut self, out: &mut Outbox) -> Result<(), Rejection> {
        if !self.state.paused {
            return Err(Rejection::invalid("show is not paused"));
        }
        info!("show resumed");
        self.state.paused = false;
        self.show(DisplayView::Game, out);
        Ok(())
    }

    fn save_custom_text(&mut self, text: Option<String>, out: &mut Outbox) -> Result<(), Rejection> {
        let text = text
            .as_deref()
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| self.rules.default_custom_text.clone());
        if text.chars().count() > MAX_TEXT_CHARS {
            return Err(Rejection::invalid("custom text is too long"));
        }
        self.state.custom_text = text.clone();
        if matches!(self.state.view, DisplayView::Custom(_)) {
            self.show(DisplayView::Custom(text), out);
        }
        Ok(())
    }

    fn show(&mut self, view: DisplayView, out: &mut Outbox) {
        self.state.view = view;
        out.view(&self.state);
    }

    fn start_mode(&mut self, mode: ActiveMode, out: &mut Outbox) {
        let kind = mode.kind();
        if let Some(previous) = self.state.modes.activate(mode) {
            info!(%previous, %kind, "special round replaced");
            if previous == ModeKind::Zoom {
                // the zoom's buzzer window must not outlive it
                self.state.buzzer.settle();
                out.queue(&self.state);
                out.buzzer_status(&self.state);
            }
        } else {
            info!(%kind, "special round started");
        }
        out.mode(&self.state);
    }

    fn end_mode(&mut self, kind: ModeKind, out: &mut Outbox) -> Result<(), Rejection> {
        if !self.state.modes.deactivate(kind) {
            return Err(Rejection::invalid(format!("no {kind} in progress")));
        }
        info!(%kind, "special round ended");
        out.mode(&self.state);
        Ok(())
    }

    fn duel(&mut self) -> Result<&mut DuelState, Rejection> {
        self.state
            .modes
            .duel_mut()
            .ok_or_else(|| Rejection::invalid("no duel in progress"))
    }

    fn zoom(&mut self) -> Result<&mut ZoomState, Rejection> {
        self.state
            .modes
            .zoom_mut()
            .ok_or_else(|| Rejection::invalid("no zoom in progress"))
    }

    fn memory(&mut self) -> Result<&mut MemoryState, Rejection> {
        self.state
            .modes
            .memory_mut()
            .ok_or_else(|| Rejection::invalid("no memory round in progress"))
    }

    fn finale(&mut self) -> Result<&mut FinaleState, Rejection> {
        self.state
            .modes
            .finale_mut()
            .ok_or_else(|| Rejection::invalid("no finale in progress"))
    }

    fn duel_start(
        &mut self,
        challenger: TeamId,
        defender: TeamId,
        out: &mut Outbox,
    ) -> Result<(), Rejection> {
        if challenger == defender {
            return Err(Rejection::invalid("a team cannot duel itself"));
        }
        for team_id in [&challenger, &defender] {
            if self.state.playing_team(team_id).is_none() {
                return Err(Rejection::missing(format!("team `{team_id}`")));
            }
        }
        self.state.buzzer.close();
        self.start_mode(
            ActiveMode::Duel(DuelState::new(challenger, defender)),
            out,
        );
        out.buzzer_status(&self.state);
        Ok(())
    }

    fn duel_reconcile(&mut self, points: i32, out: &mut Outbox) -> Result<(), Rejection> {
        let winner = self.duel()?.reconcile()?;
        if self.state.credit(&winner, points).is_none() {
            warn!(team_id = %winner, "duel winner is no longer on the roster");
        }
        info!(team_id = %winner, points, "duel reconciled");
        out.teams(&self.state);
        out.mode(&self.state);
        Ok(())
    }

    fn zoom_start(&mut self, question: Option<Question>, now: Instant, out: &mut Outbox) {
        self.start_mode(ActiveMode::Zoom(ZoomState::new(question)), out);
        self.state.buzzer.open_window(true, now);
        out.queue(&self.state);
        out.buzzer_status(&self.state);
    }

    fn zoom_judge(&mut self, correct: bool, out: &mut Outbox) -> Result<(), Rejection> {
        let zoom = self.zoom()?;
        if !zoom.is_open() {
            return Err(Rejection::invalid("zoom image already solved"));
        }
        let points = zoom.points_available;
        if correct {
            self.judge_correct(points, out)
        } else {
            self.judge_wrong(out)
        }
    }

    fn memory_answer(
        &mut self,
        team_id: TeamId,
        connection: ConnectionId,
        position: u32,
        out: &mut Outbox,
    ) -> Result<(), Rejection> {
        if self.state.paused {
            return Err(Rejection::invalid("show is paused"));
        }
        self.memory()?.submit(&team_id, position)?;
        out.push(
            Audience::Connection(connection),
            EVENT_ANSWER_RECEIVED,
            &AnswerReceivedEvent {
                kind: "memory".into(),
            },
        );
        out.mode(&self.state);
        Ok(())
    }

    fn memory_advance(&mut self, out: &mut Outbox) -> Result<(), Rejection> {
        let memory = self.memory()?;
        let phase = memory.advance()?;
        let target = memory.target_position();
        let winners = memory.winners.clone();

        if phase == MemoryPhase::Result {
            let points = self.rules.memory_points;
            for team_id in &winners {
                self.state.credit(team_id, points);
            }
            info!(winners = winners.len(), points, "memory round evaluated");

            out.teams(&self.state);
            out.reveal(
                &self.state,
                RevealEvent {
                    correct_answer: target.map(|position| position.to_string()),
                    winners: winners
                        .iter()
                        .filter_map(|team_id| self.state.playing_team(team_id))
                        .map(TeamSummary::from)
                        .collect(),
                },
            );
        }
        out.mode(&self.state);
        Ok(())
    }

    fn finale_bet(
        &mut self,
        team_id: TeamId,
        connection: ConnectionId,
        amount: i32,
        out: &mut Outbox,
    ) -> Result<(), Rejection> {
        if self.state.paused {
            return Err(Rejection::invalid("show is paused"));
        }
        let score = self
            .state
            .playing_team(&team_id)
            .map(|team| team.score)
            .ok_or_else(|| Rejection::missing(format!("team `{team_id}`")))?;
        self.finale()?.place_bet(&team_id, amount, score)?;

        out.push(
            Audience::Connection(connection),
            EVENT_ANSWER_RECEIVED,
            &AnswerReceivedEvent { kind: "bet".into() },
        );
        out.mode(&self.state);
        Ok(())
    }

    fn finale_judge(
        &mut self,
        team_id: &str,
        correct: bool,
        out: &mut Outbox,
    ) -> Result<(), Rejection> {
        if self.state.playing_team(team_id).is_none() {
            return Err(Rejection::missing(format!("team `{team_id}`")));
        }
        let team_id = team_id.to_string();
        let delta = self.finale()?.judge(&team_id, correct)?;
        self.state.credit(&team_id, delta);
        info!(team_id = %team_id, delta, "finale stake settled");

        out.teams(&self.state);
        out.mode(&self.state);
        Ok(())
    }

    fn correct_answer(&self) -> Option<String> {
        let question = match self.state.modes.active() {
            Some(ActiveMode::Zoom(zoom)) => zoom.question.as_ref(),
            _ => self.state.current_question.as_ref(),
        };
        question.map(|question| question.correct_answer.clone())
    }
}

fn team_of(actor: &Actor) -> Result<(TeamId, ConnectionId), Rejection> {
    match actor {
        Actor::Team {
            team_id,
            connection,
        } => Ok((team_id.clone(), *connection)),
        _ => Err(Rejection::invalid("only teams can do this")),
    }
}

fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}

/// Trimmed, case-insensitive comparison. For questions with choices the team
/// may also answer with the 1-based number or the letter of the choice.
fn answer_matches(question: &Question, answer: &str) -> bool {
    let expected = normalize(&question.correct_answer);
    if expected.is_empty() {
        return false;
    }
    if normalize(answer) == expected {
        return true;
    }

    let Some(choices) = &question.choices else {
        return false;
    };
    choice_index(answer)
        .and_then(|index| choices.get(index))
        .is_some_and(|choice| normalize(choice) == expected)
}

fn choice_index(answer: &str) -> Option<usize> {
    let answer = answer.trim();
    if let Ok(number) = answer.parse::<usize>() {
        return number.checked_sub(1);
    }
    let mut chars = answer.chars();
    match (chars.next(), chars.next()) {
        (Some(letter), None) if letter.is_ascii_alphabetic() => {
            Some(usize::from(letter.to_ascii_lowercase() as u8 - b'a'))
        }
        _ => None,
    }
}

fn parse_number(text: &str) -> Option<f64> {
    text.trim()
        .replace(',', ".")
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
}

/// Flag the answers numerically closest to `target`; ties all win.
fn mark_closest_estimates(target: &str, answers: &mut [RoundAnswer]) {
    let Some(target) = parse_number(target) else {
        return;
    };
    let distance = |answer: &RoundAnswer| {
        parse_number(&answer.answer_text).map(|value| (value - target).abs())
    };
    let Some(best) = answers
        .iter()
        .filter_map(distance)
        .min_by(|a, b| a.total_cmp(b))
    else {
        return;
    };
    for answer in answers.iter_mut() {
        answer.is_correct = distance(answer) == Some(best);
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use uuid::Uuid;

    use super::*;
    use crate::state::{
        broadcast::{
            Dispatch, EVENT_ANSWER_REVEAL, EVENT_BUZZER_ARMED, EVENT_BUZZER_LOCKED, EVENT_MODE,
            EVENT_MODE_DETAILS, EVENT_QUESTION_DISPATCHED, EVENT_TEAMS, EVENT_VIEW,
        },
        modes::{zoom::ZOOM_START_POINTS, MemoryPhase},
    };

    struct Show {
        engine: GameEngine,
        start: Instant,
        moderator: ConnectionId,
    }

    impl Show {
        fn new() -> Self {
            let mut engine = GameEngine::new(Arc::new(QuestionBank::default()), GameRules::default());
            let moderator = Uuid::new_v4();
            let start = Instant::now();
            engine
                .handle(
                    Caller::Connection(moderator),
                    ClientMessage::Register {
                        role: Role::Moderator,
                        name: None,
                        team_id: None,
                    },
                    start,
                )
                .unwrap();
            Self {
                engine,
                start,
                moderator,
            }
        }

        fn at(&self, millis: u64) -> Instant {
            self.start + Duration::from_millis(millis)
        }

        fn join(&mut self, key: &str) -> ConnectionId {
            let connection = Uuid::new_v4();
            self.engine
                .handle(
                    Caller::Connection(connection),
                    ClientMessage::Register {
                        role: Role::Team,
                        name: Some(key.to_uppercase()),
                        team_id: Some(key.into()),
                    },
                    self.start,
                )
                .unwrap();
            connection
        }

        fn moderate(&mut self, message: ClientMessage, millis: u64) -> Result<Outbox, Rejection> {
            let now = self.at(millis);
            self.engine
                .handle(Caller::Connection(self.moderator), message, now)
        }

        fn send(
            &mut self,
            connection: ConnectionId,
            message: ClientMessage,
            millis: u64,
        ) -> Result<Outbox, Rejection> {
            let now = self.at(millis);
            self.engine.handle(Caller::Connection(connection), message, now)
        }

        fn score(&self, key: &str) -> i32 {
            self.engine.state().teams[key].score
        }

        fn dispatch(&mut self, mode: QuestionMode, answer: &str) -> Outbox {
            self.moderate(
                ClientMessage::DispatchQuestion {
                    question: Question {
                        id: "q".into(),
                        prompt: "Question?".into(),
                        mode,
                        correct_answer: answer.into(),
                        choices: Some(vec!["Paris".into(), "Rome".into()]),
                        ..Question::default()
                    },
                },
                0,
            )
            .unwrap()
        }
    }

    fn names(outbox: &Outbox) -> Vec<&str> {
        outbox
            .dispatches()
            .iter()
            .map(|dispatch| dispatch.event.event.as_str())
            .collect()
    }

    #[test]
    fn buzz_positions_follow_arrival_and_notify_privately() {
        let mut show = Show::new();
        let a = show.join("a");
        let b = show.join("b");
        show.dispatch(QuestionMode::Buzzer, "Rome");

        // B pressed earlier on its device but its message arrives second.
        let out = show.send(a, ClientMessage::Buzz, 500).unwrap();
        let private = &out.dispatches()[0];
        assert_eq!(private.audience, Audience::Connection(a));
        assert_eq!(private.event.data["queue_position"], 1);
        show.send(b, ClientMessage::Buzz, 510).unwrap();

        let queue = show.engine.state().buzzer.queue();
        assert_eq!(queue[0].team_id, "a");
        assert_eq!(queue[1].team_id, "b");
        assert_eq!(queue[1].queue_position, 2);
    }

    #[test]
    fn repeated_buzz_is_silently_ignored() {
        let mut show = Show::new();
        let a = show.join("a");
        show.dispatch(QuestionMode::Buzzer, "Rome");

        show.send(a, ClientMessage::Buzz, 100).unwrap();
        assert!(show.send(a, ClientMessage::Buzz, 200).is_err());
        assert_eq!(show.engine.state().buzzer.queue().len(), 1);
    }

    #[test]
    fn unregistered_and_preview_connections_cannot_act() {
        let mut show = Show::new();
        show.dispatch(QuestionMode::Buzzer, "Rome");

        let stranger = Uuid::new_v4();
        assert_eq!(
            show.send(stranger, ClientMessage::Buzz, 10).unwrap_err(),
            Rejection::NotRegistered
        );

        let preview = Uuid::new_v4();
        show.send(
            preview,
            ClientMessage::Register {
                role: Role::Preview,
                name: None,
                team_id: None,
            },
            0,
        )
        .unwrap();
        assert_eq!(
            show.send(preview, ClientMessage::Buzz, 10).unwrap_err(),
            Rejection::ReadOnly
        );
        assert_eq!(
            show.send(preview, ClientMessage::ResetDisplays, 10)
                .unwrap_err(),
            Rejection::ReadOnly
        );
        assert!(show.engine.state().buzzer.queue().is_empty());

        let out = show
            .send(preview, ClientMessage::RequestSnapshot, 20)
            .unwrap();
        assert_eq!(out.dispatches()[0].audience, Audience::Connection(preview));
    }

    #[test]
    fn teams_cannot_moderate() {
        let mut show = Show::new();
        let a = show.join("a");
        let err = show
            .send(
                a,
                ClientMessage::AssignPoints {
                    team_id: "a".into(),
                    delta: 1000,
                },
                0,
            )
            .unwrap_err();
        assert!(matches!(err, Rejection::InvalidAction(_)));
        assert_eq!(show.score("a"), 0);
    }

    #[test]
    fn judge_correct_on_empty_queue_changes_nothing() {
        let mut show = Show::new();
        show.join("a");
        show.dispatch(QuestionMode::Buzzer, "Rome");

        assert!(show
            .moderate(ClientMessage::JudgeCorrect { points: 100 }, 10)
            .is_err());
        assert_eq!(show.score("a"), 0);
        assert!(show.engine.state().round_answers.is_empty());
    }

    #[test]
    fn judge_correct_credits_head_and_reveals() {
        let mut show = Show::new();
        let a = show.join("a");
        let b = show.join("b");
        show.dispatch(QuestionMode::Buzzer, "Rome");
        show.send(a, ClientMessage::Buzz, 300).unwrap();
        show.send(b, ClientMessage::Buzz, 400).unwrap();

        let out = show
            .moderate(ClientMessage::JudgeCorrect { points: 100 }, 1000)
            .unwrap();
        assert_eq!(show.score("a"), 100);
        assert_eq!(show.score("b"), 0);
        assert!(show.engine.state().buzzer.queue().is_empty());
        assert!(show.engine.state().buzzer.is_locked());

        let answers = &show.engine.state().round_answers;
        assert_eq!(answers.len(), 1);
        assert_eq!(answers[0].reaction_time, Duration::from_millis(300));

        let reveal = out
            .dispatches()
            .iter()
            .find(|d| d.event.event == EVENT_ANSWER_REVEAL)
            .unwrap();
        assert_eq!(reveal.audience, Audience::All);
        assert_eq!(reveal.event.data["correct_answer"], "Rome");
    }

    #[test]
    fn wrong_answers_advance_then_reopen() {
        let mut show = Show::new();
        let a = show.join("a");
        let b = show.join("b");
        show.dispatch(QuestionMode::Buzzer, "Rome");
        show.send(a, ClientMessage::Buzz, 100).unwrap();
        show.send(b, ClientMessage::Buzz, 200).unwrap();

        let out = show.moderate(ClientMessage::JudgeWrong, 300).unwrap();
        assert!(names(&out).contains(&EVENT_BUZZER_NEXT));
        assert_eq!(show.engine.state().buzzer.head().unwrap().team_id, "b");

        let out = show.moderate(ClientMessage::JudgeWrong, 400).unwrap();
        assert!(names(&out).contains(&EVENT_BUZZER_ARMED));
        assert!(!show.engine.state().buzzer.is_locked());
        assert_eq!(show.engine.state().round_answers.len(), 2);
    }

    #[test]
    fn dispatch_filters_the_solution_and_switches_the_view() {
        let mut show = Show::new();
        let out = show.dispatch(QuestionMode::Buzzer, "Rome");

        let public = out
            .dispatches()
            .iter()
            .find(|d| d.event.event == EVENT_QUESTION_DISPATCHED)
            .unwrap();
        assert!(public.event.data["question"].get("correct_answer").is_none());
        assert!(public.event.data["question"].get("choices").is_none());
        assert!(!show.engine.state().buzzer.is_locked());
        assert_eq!(show.engine.state().view, DisplayView::Game);

        let out = show.dispatch(QuestionMode::MultipleChoice, "Rome");
        let public = out
            .dispatches()
            .iter()
            .find(|d| d.event.event == EVENT_QUESTION_DISPATCHED)
            .unwrap();
        assert!(public.event.data["question"].get("choices").is_some());
        assert!(public.event.data["question"].get("correct_answer").is_none());
        assert!(show.engine.state().buzzer.is_locked());
    }

    #[test]
    fn pause_gates_buzzes_and_keeps_the_pause_view() {
        let mut show = Show::new();
        let a = show.join("a");
        show.moderate(ClientMessage::Pause, 0).unwrap();
        show.dispatch(QuestionMode::Buzzer, "Rome");
        assert_eq!(show.engine.state().view, DisplayView::Pause);

        assert!(show.send(a, ClientMessage::Buzz, 100).is_err());
        assert!(show.moderate(ClientMessage::Pause, 150).is_err());

        let out = show.moderate(ClientMessage::Resume, 200).unwrap();
        assert_eq!(names(&out), vec![EVENT_VIEW]);
        show.send(a, ClientMessage::Buzz, 300).unwrap();
    }

    #[test]
    fn submitted_answers_are_paid_on_reveal() {
        let mut show = Show::new();
        let a = show.join("a");
        let b = show.join("b");
        show.dispatch(QuestionMode::MultipleChoice, "Rome");

        show.send(
            a,
            ClientMessage::SubmitAnswer {
                answer: " rome ".into(),
            },
            100,
        )
        .unwrap();
        show.send(b, ClientMessage::SubmitAnswer { answer: "1".into() }, 200)
            .unwrap();
        assert!(show
            .send(a, ClientMessage::SubmitAnswer { answer: "2".into() }, 300)
            .is_err());
        assert_eq!(show.score("a"), 0);

        show.moderate(ClientMessage::RevealAnswers { points: None }, 400)
            .unwrap();
        assert_eq!(show.score("a"), 100);
        assert_eq!(show.score("b"), 0);
        assert!(show
            .moderate(ClientMessage::RevealAnswers { points: None }, 500)
            .is_err());
        assert_eq!(show.score("a"), 100);
    }

    #[test]
    fn closest_estimates_win() {
        let mut show = Show::new();
        let a = show.join("a");
        let b = show.join("b");
        let c = show.join("c");
        show.dispatch(QuestionMode::Estimate, "330");

        for (team, guess) in [(a, "300"), (b, "360"), (c, "500")] {
            show.send(
                team,
                ClientMessage::SubmitAnswer {
                    answer: guess.into(),
                },
                100,
            )
            .unwrap();
        }
        show.moderate(ClientMessage::RevealAnswers { points: Some(50) }, 200)
            .unwrap();
        assert_eq!(show.score("a"), 50);
        assert_eq!(show.score("b"), 50);
        assert_eq!(show.score("c"), 0);
    }

    #[test]
    fn activating_a_mode_replaces_the_previous_one() {
        let mut show = Show::new();
        show.join("a");
        show.join("b");
        show.moderate(
            ClientMessage::DuelStart {
                challenger: "a".into(),
                defender: "b".into(),
            },
            0,
        )
        .unwrap();
        show.moderate(ClientMessage::ZoomStart { question: None }, 10)
            .unwrap();

        assert_eq!(show.engine.state().modes.kind(), Some(ModeKind::Zoom));
        assert!(show.moderate(ClientMessage::DuelNext, 20).is_err());
    }

    #[test]
    fn reset_displays_restores_every_initial_value() {
        let mut show = Show::new();
        let a = show.join("a");
        show.moderate(ClientMessage::ZoomStart { question: None }, 0)
            .unwrap();
        show.moderate(ClientMessage::ZoomReveal, 10).unwrap();
        show.send(a, ClientMessage::Buzz, 20).unwrap();
        show.moderate(ClientMessage::ZoomJudge { correct: false }, 30)
            .unwrap();

        let out = show.moderate(ClientMessage::ResetDisplays, 40).unwrap();
        let state = show.engine.state();
        assert!(state.modes.active().is_none());
        assert!(state.current_question.is_none());
        assert!(state.round_answers.is_empty());
        assert!(state.buzzer.is_locked());
        assert_eq!(state.view, DisplayView::Logo);
        assert!(names(&out).contains(&EVENT_MODE));

        show.moderate(ClientMessage::ZoomStart { question: None }, 50)
            .unwrap();
        let zoom = show.engine.state().modes.zoom().unwrap();
        assert_eq!(zoom.current_level, 1);
        assert_eq!(zoom.points_available, ZOOM_START_POINTS);
        assert!(zoom.already_answered.is_empty());
    }

    #[test]
    fn zoom_pays_the_current_level_and_blocks_wrong_teams() {
        let mut show = Show::new();
        let a = show.join("a");
        let b = show.join("b");
        show.moderate(ClientMessage::ZoomStart { question: None }, 0)
            .unwrap();
        show.moderate(ClientMessage::ZoomReveal, 10).unwrap();

        show.send(a, ClientMessage::Buzz, 20).unwrap();
        show.moderate(ClientMessage::ZoomJudge { correct: false }, 30)
            .unwrap();
        assert!(show.send(a, ClientMessage::Buzz, 40).is_err());

        show.send(b, ClientMessage::Buzz, 50).unwrap();
        show.moderate(ClientMessage::ZoomJudge { correct: true }, 60)
            .unwrap();
        assert_eq!(show.score("b"), 200);
        assert_eq!(
            show.engine.state().modes.zoom().unwrap().solved_by.as_deref(),
            Some("b")
        );
    }

    #[test]
    fn duel_is_reconciled_once() {
        let mut show = Show::new();
        let a = show.join("a");
        let b = show.join("b");
        let c = show.join("c");
        show.moderate(
            ClientMessage::DuelStart {
                challenger: "a".into(),
                defender: "b".into(),
            },
            0,
        )
        .unwrap();

        assert!(show.send(c, ClientMessage::Buzz, 5).is_err());
        show.send(b, ClientMessage::Buzz, 10).unwrap();
        assert!(show.send(a, ClientMessage::Buzz, 11).is_err());
        show.moderate(ClientMessage::DuelJudge { correct: true }, 20)
            .unwrap();

        show.moderate(ClientMessage::DuelReconcile { points: 300 }, 30)
            .unwrap();
        assert_eq!(show.score("b"), 300);
        assert!(show
            .moderate(ClientMessage::DuelReconcile { points: 300 }, 40)
            .is_err());
        assert_eq!(show.score("b"), 300);
        assert_eq!(show.score("a"), 0);
    }

    #[test]
    fn memory_winners_are_paid_on_result() {
        let mut show = Show::new();
        let a = show.join("a");
        let b = show.join("b");
        show.moderate(
            ClientMessage::MemoryStart {
                question: Some(Question {
                    prompt: "Where was the cat?".into(),
                    correct_answer: "7".into(),
                    mode: QuestionMode::Memory,
                    ..Question::default()
                }),
            },
            0,
        )
        .unwrap();

        // Guesses only count in the answer phase.
        assert!(show
            .send(a, ClientMessage::MemoryAnswer { position: 7 }, 5)
            .is_err());
        show.moderate(ClientMessage::MemoryAdvance, 10).unwrap();
        show.moderate(ClientMessage::MemoryAdvance, 20).unwrap();

        let out = show
            .send(a, ClientMessage::MemoryAnswer { position: 7 }, 30)
            .unwrap();
        let public = out
            .dispatches()
            .iter()
            .find(|d| d.event.event == EVENT_MODE)
            .unwrap();
        assert!(public.event.data["mode"].get("target_position").is_none());
        assert!(public.event.data["mode"].get("guesses").is_none());
        let details = out
            .dispatches()
            .iter()
            .find(|d| d.event.event == EVENT_MODE_DETAILS)
            .unwrap();
        assert_eq!(details.audience, Audience::Moderators);
        assert_eq!(details.event.data["mode"]["target_position"], 7);

        show.send(b, ClientMessage::MemoryAnswer { position: 3 }, 40)
            .unwrap();
        show.moderate(ClientMessage::MemoryAdvance, 50).unwrap();

        assert_eq!(show.score("a"), 100);
        assert_eq!(show.score("b"), 0);
        let memory = match show.engine.state().modes.active() {
            Some(ActiveMode::Memory(memory)) => memory,
            other => panic!("expected memory round, got {other:?}"),
        };
        assert_eq!(memory.phase, MemoryPhase::Result);
    }

    #[test]
    fn finale_bets_are_bounded_and_settled_once() {
        let mut show = Show::new();
        let a = show.join("a");
        show.moderate(
            ClientMessage::AssignPoints {
                team_id: "a".into(),
                delta: 200,
            },
            0,
        )
        .unwrap();
        show.moderate(ClientMessage::FinaleStart, 10).unwrap();

        assert!(show
            .send(a, ClientMessage::FinaleBet { amount: 500 }, 20)
            .is_err());
        show.send(a, ClientMessage::FinaleBet { amount: 150 }, 30)
            .unwrap();
        show.moderate(
            ClientMessage::FinaleJudge {
                team_id: "a".into(),
                correct: false,
            },
            40,
        )
        .unwrap();
        assert_eq!(show.score("a"), 50);
        assert!(show
            .moderate(
                ClientMessage::FinaleJudge {
                    team_id: "a".into(),
                    correct: false,
                },
                50,
            )
            .is_err());
        assert_eq!(show.score("a"), 50);
    }

    #[test]
    fn hidden_leaderboard_keeps_scores_off_the_display() {
        let mut show = Show::new();
        show.join("a");
        show.moderate(
            ClientMessage::AssignPoints {
                team_id: "a".into(),
                delta: 777,
            },
            0,
        )
        .unwrap();
        show.moderate(ClientMessage::FinaleStart, 0).unwrap();

        let out = show
            .moderate(ClientMessage::FinaleLeaderboard { hidden: true }, 10)
            .unwrap();
        let teams = out
            .dispatches()
            .iter()
            .find(|d| d.event.event == EVENT_TEAMS)
            .unwrap();
        assert_eq!(teams.audience, Audience::Moderators);
        assert!(show.engine.snapshot(false).teams.is_none());
        assert!(show.engine.snapshot(true).teams.is_some());

        let out = show.moderate(ClientMessage::ShowWinner, 20).unwrap();
        for view in out.dispatches().iter().filter(|d| d.event.event == EVENT_VIEW) {
            assert_ne!(view.audience, Audience::All);
            let leaderboard = view.event.data["leaderboard"].as_array().unwrap();
            if view.audience == Audience::Moderators {
                assert_eq!(leaderboard[0]["score"], 777);
            } else {
                assert!(leaderboard.is_empty());
            }
        }
        let public = serde_json::to_value(show.engine.snapshot(false)).unwrap();
        assert_eq!(public["view"]["view"], "winner");
        assert_eq!(public["view"]["leaderboard"], serde_json::json!([]));
        let moderator = serde_json::to_value(show.engine.snapshot(true)).unwrap();
        assert_eq!(moderator["view"]["leaderboard"][0]["score"], 777);

        // Lifting the option puts the standings back on the winner screen.
        let out = show
            .moderate(ClientMessage::FinaleLeaderboard { hidden: false }, 30)
            .unwrap();
        let view = out
            .dispatches()
            .iter()
            .find(|d| d.event.event == EVENT_VIEW)
            .unwrap();
        assert_eq!(view.audience, Audience::All);
        assert_eq!(view.event.data["leaderboard"][0]["score"], 777);
    }

    #[test]
    fn hidden_leaderboard_keeps_scores_out_of_public_reveals() {
        let mut show = Show::new();
        let a = show.join("a");
        show.moderate(ClientMessage::FinaleStart, 0).unwrap();
        show.moderate(ClientMessage::FinaleLeaderboard { hidden: true }, 10)
            .unwrap();
        show.dispatch(QuestionMode::Buzzer, "Rome");
        show.send(a, ClientMessage::Buzz, 100).unwrap();

        let out = show
            .moderate(ClientMessage::JudgeCorrect { points: 100 }, 200)
            .unwrap();
        let reveals: Vec<&Dispatch> = out
            .dispatches()
            .iter()
            .filter(|d| d.event.event == EVENT_ANSWER_REVEAL)
            .collect();
        assert_eq!(reveals.len(), 3);
        for reveal in reveals {
            let winner = &reveal.event.data["winners"][0];
            assert_eq!(winner["id"], "a");
            if reveal.audience == Audience::Moderators {
                assert_eq!(winner["score"], 100);
            } else {
                assert!(winner.get("score").is_none());
            }
        }
    }

    #[test]
    fn replacing_a_zoom_closes_its_buzzer_window() {
        let mut show = Show::new();
        let a = show.join("a");
        show.moderate(ClientMessage::ZoomStart { question: None }, 0)
            .unwrap();
        assert!(!show.engine.state().buzzer.is_locked());

        let out = show
            .moderate(ClientMessage::MemoryStart { question: None }, 10)
            .unwrap();
        assert!(names(&out).contains(&EVENT_BUZZER_LOCKED));
        assert!(show.engine.state().buzzer.is_locked());

        assert!(show.send(a, ClientMessage::Buzz, 20).is_err());
        assert!(show.engine.state().buzzer.queue().is_empty());
        assert!(show
            .moderate(ClientMessage::JudgeCorrect { points: 250 }, 30)
            .is_err());
        assert_eq!(show.score("a"), 0);
    }

    #[test]
    fn dispatch_takes_the_question_as_given() {
        let mut show = Show::new();
        show.moderate(
            ClientMessage::DispatchQuestion {
                question: Question {
                    prompt: "   ".into(),
                    ..Question::default()
                },
            },
            0,
        )
        .unwrap();
        let question = show.engine.state().current_question.as_ref().unwrap();
        assert_eq!(question.prompt, "   ");
    }

    #[test]
    fn disconnect_keeps_the_score() {
        let mut show = Show::new();
        let a = show.join("a");
        show.moderate(
            ClientMessage::AssignPoints {
                team_id: "a".into(),
                delta: 40,
            },
            0,
        )
        .unwrap();

        let out = show.engine.disconnect(&a);
        assert_eq!(names(&out), vec![EVENT_TEAMS]);
        assert_eq!(show.score("a"), 40);
        assert!(!show.engine.state().teams["a"].connected);

        show.join("a");
        assert_eq!(show.score("a"), 40);
    }

    #[test]
    fn custom_text_falls_back_to_default() {
        let mut show = Show::new();
        show.moderate(
            ClientMessage::SaveCustomText {
                text: Some("Back in 5".into()),
            },
            0,
        )
        .unwrap();
        show.moderate(ClientMessage::ShowCustomScreen, 10).unwrap();
        assert_eq!(
            show.engine.state().view,
            DisplayView::Custom("Back in 5".into())
        );

        let out = show
            .moderate(ClientMessage::SaveCustomText { text: None }, 20)
            .unwrap();
        assert_eq!(out.dispatches()[0].event.data["text"], "Stay tuned!");
    }

    #[test]
    fn unknown_messages_are_ignored() {
        let mut show = Show::new();
        assert!(show.moderate(ClientMessage::Unknown, 0).is_err());
    }

    #[test]
    fn console_acts_as_moderator() {
        let mut show = Show::new();
        show.join("a");
        show.engine
            .handle(
                Caller::Console,
                ClientMessage::AssignPoints {
                    team_id: "a".into(),
                    delta: 5,
                },
                show.start,
            )
            .unwrap();
        assert_eq!(show.score("a"), 5);
    }

    #[test]
    fn answer_matching_accepts_choice_numbers_and_letters() {
        let question = Question {
            correct_answer: "Rome".into(),
            choices: Some(vec!["Paris".into(), "Rome".into()]),
            ..Question::default()
        };
        assert!(answer_matches(&question, "ROME"));
        assert!(answer_matches(&question, "2"));
        assert!(answer_matches(&question, "b"));
        assert!(!answer_matches(&question, "a"));
        assert!(!answer_matches(&question, "0"));
    }
}
