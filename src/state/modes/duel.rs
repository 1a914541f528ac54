//! Two-team head-to-head with its own single-slot buzzer.
//!
//! Duel points stay local to the duel. They reach the roster only through an
//! explicit reconcile, so an abandoned duel leaves scores untouched.

use indexmap::IndexMap;

use crate::{error::Rejection, state::game::TeamId};

/// Questions in a duel.
pub const DUEL_QUESTIONS: u8 = 3;

/// Result of judging the duel buzzer holder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DuelJudgement {
    /// The holder scored a duel point.
    Correct(TeamId),
    /// The holder is locked out for this question.
    Wrong(TeamId),
}

/// Duel progress.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuelState {
    /// Team that called the duel.
    pub challenger: TeamId,
    /// Team that was called out.
    pub defender: TeamId,
    /// Current question, 1 to [`DUEL_QUESTIONS`].
    pub question_index: u8,
    /// Participant allowed to answer right now.
    pub current_buzzer: Option<TeamId>,
    /// Participants that already failed the current question.
    pub locked_out: Vec<TeamId>,
    /// Duel-local points per participant.
    pub scores: IndexMap<TeamId, i32>,
    /// Set after the last question has been played.
    pub finished: bool,
    /// Set once the winner's prize reached the roster.
    pub reconciled: bool,
}

impl DuelState {
    /// Fresh duel between two teams.
    pub fn new(challenger: TeamId, defender: TeamId) -> Self {
        let mut scores = IndexMap::new();
        scores.insert(challenger.clone(), 0);
        scores.insert(defender.clone(), 0);
        Self {
            challenger,
            defender,
            question_index: 1,
            current_buzzer: None,
            locked_out: Vec::new(),
            scores,
            finished: false,
            reconciled: false,
        }
    }

    /// Whether `team_id` is one of the two duellists.
    pub fn is_participant(&self, team_id: &str) -> bool {
        self.challenger == team_id || self.defender == team_id
    }

    /// Claim the duel buzzer for `team_id`.
    pub fn buzz(&mut self, team_id: &TeamId) -> Result<(), Rejection> {
        if !self.is_participant(team_id) {
            return Err(Rejection::invalid(format!(
                "team `{team_id}` is not in the duel"
            )));
        }
        if self.finished {
            return Err(Rejection::invalid("duel is finished"));
        }
        if self.current_buzzer.is_some() {
            return Err(Rejection::invalid("duel buzzer already taken"));
        }
        if self.locked_out.contains(team_id) {
            return Err(Rejection::invalid(format!(
                "team `{team_id}` already failed this duel question"
            )));
        }
        self.current_buzzer = Some(team_id.clone());
        Ok(())
    }

    /// Judge the buzzer holder's answer.
    pub fn judge(&mut self, correct: bool) -> Result<DuelJudgement, Rejection> {
        let holder = self
            .current_buzzer
            .take()
            .ok_or_else(|| Rejection::invalid("nobody holds the duel buzzer"))?;

        if correct {
            *self.scores.entry(holder.clone()).or_insert(0) += 1;
            self.advance();
            return Ok(DuelJudgement::Correct(holder));
        }

        self.locked_out.push(holder.clone());
        if self.locked_out.len() >= 2 {
            self.advance();
        }
        Ok(DuelJudgement::Wrong(holder))
    }

    /// Skip to the next duel question.
    pub fn next_question(&mut self) -> Result<(), Rejection> {
        if self.finished {
            return Err(Rejection::invalid("duel is finished"));
        }
        self.advance();
        Ok(())
    }

    /// Participant with strictly more duel points.
    pub fn leader(&self) -> Option<&TeamId> {
        let challenger = self.scores.get(&self.challenger).copied().unwrap_or(0);
        let defender = self.scores.get(&self.defender).copied().unwrap_or(0);
        match challenger.cmp(&defender) {
            std::cmp::Ordering::Greater => Some(&self.challenger),
            std::cmp::Ordering::Less => Some(&self.defender),
            std::cmp::Ordering::Equal => None,
        }
    }

    /// Mark the duel as paid out and return the team to credit.
    pub fn reconcile(&mut self) -> Result<TeamId, Rejection> {
        if self.reconciled {
            return Err(Rejection::invalid("duel already reconciled"));
        }
        let winner = self
            .leader()
            .cloned()
            .ok_or_else(|| Rejection::invalid("duel is tied"))?;
        self.reconciled = true;
        Ok(winner)
    }

    fn advance(&mut self) {
        self.current_buzzer = None;
        self.locked_out.clear();
        if self.question_index < DUEL_QUESTIONS {
            self.question_index += 1;
        } else {
            self.finished = true;
        }
    }
}
