use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    dao::question_bank::QuestionKind,
    state::{game::Question, registry::Role},
};

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, ToSchema)]
/// Messages accepted from WebSocket clients and from the moderator REST surface.
///
/// Unknown `type` values deserialize to [`ClientMessage::Unknown`] and are ignored.
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Declare the connection's role; must be the first message.
    Register {
        role: Role,
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        team_id: Option<String>,
    },
    /// Ask for a fresh state snapshot.
    RequestSnapshot,

    /// Team: press the buzzer.
    Buzz,
    /// Team: answer a non-buzzer question.
    SubmitAnswer { answer: String },
    /// Team: pick a cell in the memory round.
    MemoryAnswer { position: u32 },
    /// Team: stake points in the finale.
    FinaleBet { amount: i32 },

    /// Moderator: list questions from the bank.
    RequestQuestions {
        kind: QuestionKind,
        #[serde(default)]
        key: Option<String>,
    },
    /// Moderator: put a question in play.
    DispatchQuestion { question: Question },
    /// Moderator: open a buzzer window.
    OpenBuzzer {
        #[serde(default)]
        standalone: bool,
    },
    /// Moderator: credit a team for the current question directly.
    AwardPoints { team_id: String, points: i32 },
    /// Moderator: the head of the queue answered wrong.
    JudgeWrong,
    /// Moderator: the head of the queue answered right.
    JudgeCorrect { points: i32 },
    /// Moderator: stop accepting buzzes.
    CloseBuzzer,
    /// Moderator: empty the queue and reopen the window.
    ResetBuzzer,
    /// Moderator: return every screen to idle.
    ResetDisplays,
    /// Moderator: pause the show.
    Pause,
    /// Moderator: resume the show.
    Resume,
    /// Moderator: store the custom screen text; empty restores the default.
    SaveCustomText {
        #[serde(default)]
        text: Option<String>,
    },
    /// Moderator: show the custom text screen.
    ShowCustomScreen,
    /// Moderator: show the standings.
    ShowWinner,
    /// Moderator: show the logo.
    ShowLogo,
    /// Moderator: back to the game screen.
    ShowGame,
    /// Moderator: manual score correction.
    AssignPoints { team_id: String, delta: i32 },
    /// Moderator: judge submitted answers and credit the correct ones.
    RevealAnswers {
        #[serde(default)]
        points: Option<i32>,
    },

    /// Moderator: start a duel between two teams.
    DuelStart { challenger: String, defender: String },
    /// Moderator: judge the duel buzzer holder.
    DuelJudge { correct: bool },
    /// Moderator: next duel question.
    DuelNext,
    /// Moderator: credit the duel winner once.
    DuelReconcile { points: i32 },
    /// Moderator: leave the duel.
    DuelReset,

    /// Moderator: start a zoom image.
    ZoomStart {
        #[serde(default)]
        question: Option<Question>,
    },
    /// Moderator: reveal one more zoom level.
    ZoomReveal,
    /// Moderator: judge the team at the head of the zoom queue.
    ZoomJudge { correct: bool },
    /// Moderator: leave the zoom round.
    ZoomReset,

    /// Moderator: start a memory round.
    MemoryStart {
        #[serde(default)]
        question: Option<Question>,
    },
    /// Moderator: move the memory round to its next step.
    MemoryAdvance,
    /// Moderator: leave the memory round.
    MemoryReset,

    /// Moderator: start the finale.
    FinaleStart,
    /// Moderator: set the current finale question.
    FinaleQuestion { question: Question },
    /// Moderator: settle one team's stake.
    FinaleJudge { team_id: String, correct: bool },
    /// Moderator: next finale question.
    FinaleNext,
    /// Moderator: hide or show scores on the display.
    FinaleLeaderboard { hidden: bool },
    /// Moderator: leave the finale.
    FinaleReset,

    /// Anything this server does not understand.
    #[serde(other)]
    Unknown,
}

/// Who is allowed to send a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    /// Any registered connection.
    Anyone,
    /// A playing team (never a preview).
    Team,
    /// A moderator.
    Moderator,
}

impl ClientMessage {
    /// Role required to perform this message.
    pub fn permission(&self) -> Permission {
        use ClientMessage::*;
        match self {
            Register { .. } | RequestSnapshot | Unknown => Permission::Anyone,
            Buzz | SubmitAnswer { .. } | MemoryAnswer { .. } | FinaleBet { .. } => {
                Permission::Team
            }
            _ => Permission::Moderator,
        }
    }

    /// Wire name of the message, for logs.
    pub fn name(&self) -> &'static str {
        use ClientMessage::*;
        match self {
            Register { .. } => "register",
            RequestSnapshot => "request_snapshot",
            Buzz => "buzz",
            SubmitAnswer { .. } => "submit_answer",
            MemoryAnswer { .. } => "memory_answer",
            FinaleBet { .. } => "finale_bet",
            RequestQuestions { .. } => "request_questions",
            DispatchQuestion { .. } => "dispatch_question",
            OpenBuzzer { .. } => "open_buzzer",
            AwardPoints { .. } => "award_points",
            JudgeWrong => "judge_wrong",
            JudgeCorrect { .. } => "judge_correct",
            CloseBuzzer => "close_buzzer",
            ResetBuzzer => "reset_buzzer",
            ResetDisplays => "reset_displays",
            Pause => "pause",
            Resume => "resume",
            SaveCustomText { .. } => "save_custom_text",
            ShowCustomScreen => "show_custom_screen",
            ShowWinner => "show_winner",
            ShowLogo => "show_logo",
            ShowGame => "show_game",
            AssignPoints { .. } => "assign_points",
            RevealAnswers { .. } => "reveal_answers",
            DuelStart { .. } => "duel_start",
            DuelJudge { .. } => "duel_judge",
            DuelNext => "duel_next",
            DuelReconcile { .. } => "duel_reconcile",
            DuelReset => "duel_reset",
            ZoomStart { .. } => "zoom_start",
            ZoomReveal => "zoom_reveal",
            ZoomJudge { .. } => "zoom_judge",
            ZoomReset => "zoom_reset",
            MemoryStart { .. } => "memory_start",
            MemoryAdvance => "memory_advance",
            MemoryReset => "memory_reset",
            FinaleStart => "finale_start",
            FinaleQuestion { .. } => "finale_question",
            FinaleJudge { .. } => "finale_judge",
            FinaleNext => "finale_next",
            FinaleLeaderboard { .. } => "finale_leaderboard",
            FinaleReset => "finale_reset",
            Unknown => "unknown",
        }
    }
}
