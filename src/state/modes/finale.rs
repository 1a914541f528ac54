//! Bet-based final: before each question teams stake part of their score and
//! win or lose the stake on the answer.

use indexmap::IndexMap;

use crate::{
    error::Rejection,
    state::game::{Question, TeamId},
};

/// Questions in the finale.
pub const FINALE_QUESTIONS: u8 = 5;

/// Finale progress.
#[derive(Debug, Clone, PartialEq)]
pub struct FinaleState {
    /// Current question, 1 to [`FINALE_QUESTIONS`].
    pub question_index: u8,
    /// Question currently asked, if the moderator already sent it.
    pub question: Option<Question>,
    /// Stakes for the current question.
    pub all_in_bets: IndexMap<TeamId, i32>,
    /// Teams whose stake has been settled for the current question.
    pub judged: Vec<TeamId>,
    /// Keep scores off the display.
    pub hide_leaderboard: bool,
    /// Set after the last question.
    pub finished: bool,
}

impl Default for FinaleState {
    fn default() -> Self {
        Self {
            question_index: 1,
            question: None,
            all_in_bets: IndexMap::new(),
            judged: Vec::new(),
            hide_leaderboard: false,
            finished: false,
        }
    }
}

impl FinaleState {
    /// Stake `amount` for `team_id`, who currently holds `score` points.
    ///
    /// A team may change its stake until it has been judged.
    pub fn place_bet(&mut self, team_id: &TeamId, amount: i32, score: i32) -> Result<(), Rejection> {
        if self.finished {
            return Err(Rejection::invalid("finale is over"));
        }
        if self.judged.contains(team_id) {
            return Err(Rejection::invalid(format!(
                "team `{team_id}` was already judged"
            )));
        }
        if amount < 0 || amount > score.max(0) {
            return Err(Rejection::invalid(format!(
                "bet {amount} outside 0..={}",
                score.max(0)
            )));
        }
        self.all_in_bets.insert(team_id.clone(), amount);
        Ok(())
    }

    /// Settle `team_id`'s stake, returning the score delta to apply.
    pub fn judge(&mut self, team_id: &TeamId, correct: bool) -> Result<i32, Rejection> {
        if self.judged.contains(team_id) {
            return Err(Rejection::invalid(format!(
                "team `{team_id}` was already judged"
            )));
        }
        let bet = *self
            .all_in_bets
            .get(team_id)
            .ok_or_else(|| Rejection::missing(format!("bet for team `{team_id}`")))?;
        self.judged.push(team_id.clone());
        Ok(if correct { bet } else { -bet })
    }

    /// Set the question for the current index.
    pub fn set_question(&mut self, question: Question) -> Result<(), Rejection> {
        if self.finished {
            return Err(Rejection::invalid("finale is over"));
        }
        self.question = Some(question);
        Ok(())
    }

    /// Move on, clearing stakes; finishes after the last question.
    pub fn next_question(&mut self) -> Result<(), Rejection> {
        if self.finished {
            return Err(Rejection::invalid("finale is over"));
        }
        self.all_in_bets.clear();
        self.judged.clear();
        self.question = None;
        if self.question_index < FINALE_QUESTIONS {
            self.question_index += 1;
        } else {
            self.finished = true;
        }
        Ok(())
    }
}
