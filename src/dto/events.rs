//! Payloads of every event pushed to clients over WebSocket and SSE.

use std::time::Duration;

use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    dao::question_bank::QuestionKind,
    state::{
        game::{BuzzerEntry, DisplayView, Question, QuestionMode, RoundAnswer, Team, TeamId},
        modes::{ActiveMode, MemoryPhase, ModeKind},
        registry::Role,
    },
};

#[derive(Clone, Debug, PartialEq, Serialize)]
/// Named event with its JSON payload, as delivered to one client.
pub struct ServerEvent {
    pub event: String,
    pub data: serde_json::Value,
}

impl ServerEvent {
    /// Convenience wrapper that serialises `payload` into the data field.
    pub fn json<T>(event: &str, payload: &T) -> serde_json::Result<Self>
    where
        T: Serialize,
    {
        Ok(Self {
            event: event.to_string(),
            data: serde_json::to_value(payload)?,
        })
    }
}

/// Seconds with millisecond precision, as shown to clients.
pub fn seconds(duration: Duration) -> f64 {
    (duration.as_secs_f64() * 1000.0).round() / 1000.0
}

#[derive(Clone, Debug, Serialize, ToSchema)]
/// Public projection of a team.
pub struct TeamSummary {
    pub id: String,
    pub name: String,
    /// Absent while the finale hides the leaderboard from the public.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<i32>,
    pub connected: bool,
}

impl TeamSummary {
    /// Same team with its score withheld.
    pub fn without_score(self) -> Self {
        Self {
            score: None,
            ..self
        }
    }
}

impl From<&Team> for TeamSummary {
    fn from(team: &Team) -> Self {
        Self {
            id: team.id.clone(),
            name: team.name.clone(),
            score: Some(team.score),
            connected: team.connected,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
/// Roster with current scores.
pub struct TeamsEvent {
    pub teams: Vec<TeamSummary>,
}

#[derive(Clone, Debug, Serialize, ToSchema)]
/// One place in the buzzer queue.
pub struct BuzzerEntrySummary {
    pub team_id: String,
    pub name: String,
    pub reaction_time_seconds: f64,
    pub queue_position: usize,
}

impl From<&BuzzerEntry> for BuzzerEntrySummary {
    fn from(entry: &BuzzerEntry) -> Self {
        Self {
            team_id: entry.team_id.clone(),
            name: entry.name.clone(),
            reaction_time_seconds: seconds(entry.reaction_time),
            queue_position: entry.queue_position,
        }
    }
}

#[derive(Clone, Debug, Serialize, ToSchema)]
/// Full buzzer queue for moderator and display.
pub struct BuzzerQueueEvent {
    pub entries: Vec<BuzzerEntrySummary>,
    pub locked: bool,
    pub standalone: bool,
}

#[derive(Debug, Serialize, ToSchema)]
/// The buzzer accepts presses again.
pub struct BuzzerArmedEvent {
    pub standalone: bool,
}

#[derive(Debug, Serialize, ToSchema)]
/// Private acknowledgement telling a team where it landed.
pub struct BuzzerPositionEvent {
    pub queue_position: usize,
    pub reaction_time_seconds: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, ToSchema)]
/// Question as teams and displays may see it: never the solution, and no
/// choices for buzzer races.
pub struct QuestionPayload {
    pub id: String,
    pub prompt: String,
    pub mode: QuestionMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub choices: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media: Option<String>,
}

impl From<&Question> for QuestionPayload {
    fn from(question: &Question) -> Self {
        let choices = match question.mode {
            QuestionMode::Buzzer => None,
            _ => question.choices.clone(),
        };
        Self {
            id: question.id.clone(),
            prompt: question.prompt.clone(),
            mode: question.mode,
            category: question.category.clone(),
            choices,
            media: question.media.clone(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
/// Question dispatched to teams and displays.
pub struct QuestionEvent {
    pub question: QuestionPayload,
}

#[derive(Debug, Serialize, ToSchema)]
/// Question with its solution, for moderators only.
pub struct ModeratorQuestionEvent {
    pub question: Question,
}

#[derive(Debug, Serialize, ToSchema)]
/// Question bank listing requested by a moderator.
pub struct QuestionListEvent {
    pub kind: QuestionKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    pub questions: Vec<Question>,
}

#[derive(Clone, Debug, Serialize, ToSchema)]
/// The round is over: show the solution and who got it.
pub struct RevealEvent {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correct_answer: Option<String>,
    pub winners: Vec<TeamSummary>,
}

impl RevealEvent {
    /// Same reveal with the winners' scores withheld.
    pub fn without_scores(self) -> Self {
        Self {
            winners: self
                .winners
                .into_iter()
                .map(TeamSummary::without_score)
                .collect(),
            ..self
        }
    }
}

#[derive(Clone, Debug, Serialize, ToSchema)]
/// One judged answer of the current round.
pub struct RoundAnswerSummary {
    pub team_id: String,
    pub team_name: String,
    pub answer_text: String,
    pub is_correct: bool,
    pub reaction_time_seconds: f64,
    pub points_awarded: i32,
}

impl From<&RoundAnswer> for RoundAnswerSummary {
    fn from(answer: &RoundAnswer) -> Self {
        Self {
            team_id: answer.team_id.clone(),
            team_name: answer.team_name.clone(),
            answer_text: answer.answer_text.clone(),
            is_correct: answer.is_correct,
            reaction_time_seconds: seconds(answer.reaction_time),
            points_awarded: answer.points_awarded,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
/// Answer log of the current round.
pub struct RoundAnswersEvent {
    pub answers: Vec<RoundAnswerSummary>,
}

#[derive(Debug, Serialize, ToSchema)]
/// Private acknowledgement of a submitted answer, guess or bet.
pub struct AnswerReceivedEvent {
    pub kind: String,
}

#[derive(Clone, Debug, Serialize, ToSchema)]
#[serde(tag = "view", rename_all = "snake_case")]
/// The one screen the display must show.
pub enum ViewEvent {
    /// Regular play.
    Game,
    /// Show paused.
    Pause,
    /// Final standings.
    Winner {
        /// Teams by descending score.
        leaderboard: Vec<TeamSummary>,
    },
    /// Moderator text.
    Custom {
        /// Text to show.
        text: String,
    },
    /// Branding screen.
    Logo,
}

impl ViewEvent {
    /// Build the event for `view`, attaching the standings for the winner screen.
    pub fn new(view: &DisplayView, leaderboard: Vec<TeamSummary>) -> Self {
        match view {
            DisplayView::Game => ViewEvent::Game,
            DisplayView::Pause => ViewEvent::Pause,
            DisplayView::Winner => ViewEvent::Winner { leaderboard },
            DisplayView::Custom(text) => ViewEvent::Custom { text: text.clone() },
            DisplayView::Logo => ViewEvent::Logo,
        }
    }
}

#[derive(Clone, Debug, Serialize, ToSchema)]
/// A team's guess in the memory round.
pub struct MemoryGuess {
    pub team_id: String,
    pub position: u32,
}

#[derive(Clone, Debug, Serialize, ToSchema)]
/// A team's stake in the finale.
pub struct FinaleBet {
    pub team_id: String,
    pub amount: i32,
}

#[derive(Clone, Debug, Serialize, ToSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
/// Special round progress. Secret fields are only filled for moderators.
pub enum ModeView {
    /// Duel progress.
    Duel {
        /// Calling team.
        challenger: String,
        /// Called team.
        defender: String,
        /// 1-based question number.
        question_index: u8,
        /// Participant allowed to answer.
        current_buzzer: Option<String>,
        /// Participants locked out of this question.
        locked_out: Vec<String>,
        /// Duel-local points.
        scores: Vec<TeamScore>,
        /// Last question played.
        finished: bool,
        /// Prize already credited.
        reconciled: bool,
    },
    /// Zoom progress.
    Zoom {
        /// 1-based reveal level.
        current_level: u8,
        /// Points on offer.
        points_available: i32,
        /// Teams that may not try again.
        already_answered: Vec<String>,
        /// Team that solved the image.
        solved_by: Option<String>,
        /// Image question.
        question: Option<QuestionPayload>,
        /// Moderators only.
        #[serde(skip_serializing_if = "Option::is_none")]
        correct_answer: Option<String>,
    },
    /// Memory progress.
    Memory {
        /// Current step.
        phase: MemoryPhase,
        /// Grid question.
        question: Option<QuestionPayload>,
        /// Teams that already answered.
        answered: Vec<String>,
        /// Target cell; public once the result is shown.
        #[serde(skip_serializing_if = "Option::is_none")]
        target_position: Option<u32>,
        /// Teams on target, known in the result step.
        winners: Vec<String>,
        /// Moderators only.
        #[serde(skip_serializing_if = "Option::is_none")]
        guesses: Option<Vec<MemoryGuess>>,
    },
    /// Finale progress.
    Finale {
        /// 1-based question number.
        question_index: u8,
        /// Current question.
        question: Option<QuestionPayload>,
        /// Teams that placed a stake.
        teams_bet: Vec<String>,
        /// Teams already settled.
        judged: Vec<String>,
        /// Display hides scores.
        hide_leaderboard: bool,
        /// Last question played.
        finished: bool,
        /// Moderators only.
        #[serde(skip_serializing_if = "Option::is_none")]
        bets: Option<Vec<FinaleBet>>,
        /// Moderators only.
        #[serde(skip_serializing_if = "Option::is_none")]
        correct_answer: Option<String>,
    },
}

#[derive(Clone, Debug, Serialize, ToSchema)]
/// Duel-local score.
pub struct TeamScore {
    pub team_id: String,
    pub score: i32,
}

impl ModeView {
    /// Projection for teams and displays.
    pub fn public(mode: &ActiveMode) -> Self {
        Self::build(mode, false)
    }

    /// Projection for moderators, including stakes, guesses and solutions.
    pub fn moderator(mode: &ActiveMode) -> Self {
        Self::build(mode, true)
    }

    fn build(mode: &ActiveMode, secrets: bool) -> Self {
        let answer_of = |question: &Option<Question>| {
            question
                .as_ref()
                .filter(|_| secrets)
                .map(|question| question.correct_answer.clone())
        };

        match mode {
            ActiveMode::Duel(duel) => ModeView::Duel {
                challenger: duel.challenger.clone(),
                defender: duel.defender.clone(),
                question_index: duel.question_index,
                current_buzzer: duel.current_buzzer.clone(),
                locked_out: duel.locked_out.clone(),
                scores: duel
                    .scores
                    .iter()
                    .map(|(team_id, score)| TeamScore {
                        team_id: team_id.clone(),
                        score: *score,
                    })
                    .collect(),
                finished: duel.finished,
                reconciled: duel.reconciled,
            },
            ActiveMode::Zoom(zoom) => ModeView::Zoom {
                current_level: zoom.current_level,
                points_available: zoom.points_available,
                already_answered: zoom.already_answered.clone(),
                solved_by: zoom.solved_by.clone(),
                question: zoom.question.as_ref().map(QuestionPayload::from),
                correct_answer: answer_of(&zoom.question),
            },
            ActiveMode::Memory(memory) => {
                let show_result = secrets || memory.phase == MemoryPhase::Result;
                ModeView::Memory {
                    phase: memory.phase,
                    question: memory.question.as_ref().map(QuestionPayload::from),
                    answered: memory.answers.keys().cloned().collect(),
                    target_position: memory.target_position().filter(|_| show_result),
                    winners: memory.winners.clone(),
                    guesses: secrets.then(|| {
                        memory
                            .answers
                            .iter()
                            .map(|(team_id, position)| MemoryGuess {
                                team_id: team_id.clone(),
                                position: *position,
                            })
                            .collect()
                    }),
                }
            }
            ActiveMode::Finale(finale) => ModeView::Finale {
                question_index: finale.question_index,
                question: finale.question.as_ref().map(QuestionPayload::from),
                teams_bet: finale.all_in_bets.keys().cloned().collect(),
                judged: finale.judged.clone(),
                hide_leaderboard: finale.hide_leaderboard,
                finished: finale.finished,
                bets: secrets.then(|| {
                    finale
                        .all_in_bets
                        .iter()
                        .map(|(team_id, amount)| FinaleBet {
                            team_id: team_id.clone(),
                            amount: *amount,
                        })
                        .collect()
                }),
                correct_answer: answer_of(&finale.question),
            },
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
/// Active special round, or none.
pub struct ModeEvent {
    pub active: Option<ModeKind>,
    pub mode: Option<ModeView>,
}

#[derive(Debug, Serialize, ToSchema)]
/// Sent once to a connection after it declared its role.
pub struct RegisteredEvent {
    pub connection_id: Uuid,
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team_id: Option<TeamId>,
}

#[derive(Debug, Serialize, ToSchema)]
/// Everything a client needs to draw the current state from scratch.
pub struct StateSnapshot {
    /// RFC 3339 server time of the snapshot.
    pub server_time: String,
    /// Roster; absent while the finale hides the leaderboard.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub teams: Option<Vec<TeamSummary>>,
    pub question: Option<QuestionPayload>,
    pub buzzer: BuzzerQueueEvent,
    pub view: ViewEvent,
    pub paused: bool,
    pub mode: ModeEvent,
    /// Moderators only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub moderator: Option<ModeratorExtras>,
}

#[derive(Debug, Serialize, ToSchema)]
/// Snapshot fields reserved to moderators.
pub struct ModeratorExtras {
    pub question: Option<Question>,
    pub round_answers: Vec<RoundAnswerSummary>,
    pub custom_text: String,
    pub connections: usize,
}
