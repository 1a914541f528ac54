use std::time::{Duration, Instant};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::state::{buzzer::BuzzerArbiter, modes::ModeController};

/// Stable identity of a team: the client-provided key or the connection id.
pub type TeamId = String;

/// Fallback name used when a team registers without one.
pub const DEFAULT_TEAM_NAME_PREFIX: &str = "Team";

/// Team participating in the show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Team {
    /// Identity shared by every connection that claims this team.
    pub id: TeamId,
    /// Display name chosen by the team.
    pub name: String,
    /// Running score; only changed by explicit award operations.
    pub score: i32,
    /// Preview entries mirror the team UI but never act or rank.
    pub is_preview: bool,
    /// Whether a live connection is currently attached.
    pub connected: bool,
}

impl Team {
    /// Build a freshly registered team with a zero score.
    pub fn new(id: TeamId, name: String, is_preview: bool) -> Self {
        Self {
            id,
            name,
            score: 0,
            is_preview,
            connected: true,
        }
    }
}

/// Kind of question, deciding how teams answer it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum QuestionMode {
    /// Teams race on the buzzer and answer out loud.
    #[default]
    Buzzer,
    /// Teams pick one of the provided choices.
    #[serde(alias = "multiple", alias = "multiple-choice", alias = "multipla")]
    MultipleChoice,
    /// Teams submit a number; the closest wins.
    #[serde(alias = "stima")]
    Estimate,
    /// Teams unscramble a word.
    #[serde(alias = "anagramma")]
    Anagram,
    /// Free-text answer for bonus rounds.
    Bonus,
    /// Progressive image reveal.
    Zoom,
    /// Memory grid round.
    Memory,
    /// Any mode this server does not know about.
    #[serde(other)]
    Open,
}

/// Question as supplied by the bank or the moderator.
///
/// Questions are immutable once dispatched; the engine only ever clones them.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, ToSchema)]
#[serde(default)]
pub struct Question {
    /// Identifier from the question bank (free-form).
    pub id: String,
    /// Text shown to teams and display.
    #[serde(alias = "domanda", alias = "text")]
    pub prompt: String,
    /// How teams answer.
    #[serde(alias = "tipo", alias = "type")]
    pub mode: QuestionMode,
    /// Bank category the question was taken from.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// The solution; never sent to teams or displays before the reveal.
    #[serde(alias = "risposta", alias = "answer")]
    pub correct_answer: String,
    /// Answer choices for multiple-choice questions.
    #[serde(skip_serializing_if = "Option::is_none", alias = "opzioni")]
    pub choices: Option<Vec<String>>,
    /// Optional media (image or audio) reference.
    #[serde(skip_serializing_if = "Option::is_none", alias = "immagine")]
    pub media: Option<String>,
}

/// A team's place in the buzzer queue for the current window.
#[derive(Debug, Clone, PartialEq)]
pub struct BuzzerEntry {
    /// Team that buzzed.
    pub team_id: TeamId,
    /// Team name at the time of the buzz.
    pub name: String,
    /// Server-measured delay since the window opened.
    pub reaction_time: Duration,
    /// 1-based arrival position.
    pub queue_position: usize,
}

/// One judged answer in the current round's log.
#[derive(Debug, Clone, PartialEq)]
pub struct RoundAnswer {
    /// Team that answered.
    pub team_id: TeamId,
    /// Team name at the time of the answer.
    pub team_name: String,
    /// What the team answered (empty for spoken buzzer answers).
    pub answer_text: String,
    /// Whether the answer was judged correct.
    pub is_correct: bool,
    /// Delay between dispatch (or window opening) and the answer.
    pub reaction_time: Duration,
    /// Points credited for this answer.
    pub points_awarded: i32,
}

/// The single screen the display is showing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum DisplayView {
    /// Regular play: question, queue, scores.
    Game,
    /// Show paused.
    Pause,
    /// Final standings.
    Winner,
    /// Free text written by the moderator.
    Custom(String),
    /// Idle branding screen.
    #[default]
    Logo,
}

/// Authoritative aggregate for the whole show.
///
/// Only the engine mutates it, one action at a time.
#[derive(Debug)]
pub struct GameState {
    /// Roster in registration order.
    pub teams: IndexMap<TeamId, Team>,
    /// Question currently in play.
    pub current_question: Option<Question>,
    /// When the current question was dispatched.
    pub question_started_at: Option<Instant>,
    /// Buzzer race state.
    pub buzzer: BuzzerArbiter,
    /// Append-only log of judged answers for the current round.
    pub round_answers: Vec<RoundAnswer>,
    /// Whether the current round's answers were already revealed and paid out.
    pub answers_revealed: bool,
    /// Whether the show is paused.
    pub paused: bool,
    /// Text used by the custom screen.
    pub custom_text: String,
    /// Screen currently shown on the display.
    pub view: DisplayView,
    /// Special round slot.
    pub modes: ModeController,
}

impl GameState {
    /// Build an empty show using `custom_text` as the default custom screen text.
    pub fn new(custom_text: String) -> Self {
        Self {
            teams: IndexMap::new(),
            current_question: None,
            question_started_at: None,
            buzzer: BuzzerArbiter::new(),
            round_answers: Vec::new(),
            answers_revealed: false,
            paused: false,
            custom_text,
            view: DisplayView::default(),
            modes: ModeController::default(),
        }
    }

    /// Team lookup that skips preview entries.
    pub fn playing_team(&self, team_id: &str) -> Option<&Team> {
        self.teams.get(team_id).filter(|team| !team.is_preview)
    }

    /// Add `points` to a team's score and return the updated score. The score
    /// saturates at the `i32` bounds.
    pub fn credit(&mut self, team_id: &str, points: i32) -> Option<i32> {
        let team = self.teams.get_mut(team_id).filter(|team| !team.is_preview)?;
        team.score = team.score.saturating_add(points);
        Some(team.score)
    }

    /// Teams that rank on the leaderboard, in registration order.
    pub fn ranked_teams(&self) -> impl Iterator<Item = &Team> {
        self.teams.values().filter(|team| !team.is_preview)
    }

    /// Time elapsed since the current question was dispatched.
    pub fn elapsed(&self, now: Instant) -> Duration {
        self.question_started_at
            .map(|start| now.saturating_duration_since(start))
            .unwrap_or(Duration::ZERO)
    }

    /// Teams sorted by descending score, ties kept in registration order.
    pub fn leaderboard(&self) -> Vec<&Team> {
        let mut teams: Vec<&Team> = self.ranked_teams().collect();
        teams.sort_by(|a, b| b.score.cmp(&a.score));
        teams
    }
}
