//! Memory round: teams study a grid, the grid is covered, then each team
//! points at the cell they think holds the target.

use indexmap::IndexMap;
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    error::Rejection,
    state::game::{Question, TeamId},
};

/// Steps of a memory round, driven by the moderator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum MemoryPhase {
    /// Grid visible.
    #[default]
    Memorize,
    /// Grid hidden, question shown.
    Covered,
    /// Teams submit positions.
    Answer,
    /// Target revealed and winners known.
    Result,
}

impl MemoryPhase {
    fn next(self) -> Option<Self> {
        match self {
            MemoryPhase::Memorize => Some(MemoryPhase::Covered),
            MemoryPhase::Covered => Some(MemoryPhase::Answer),
            MemoryPhase::Answer => Some(MemoryPhase::Result),
            MemoryPhase::Result => None,
        }
    }
}

/// Memory round progress.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemoryState {
    /// Current step.
    pub phase: MemoryPhase,
    /// Grid question; its correct answer is the 1-based target position.
    pub question: Option<Question>,
    /// First guess of each team, in submission order.
    pub answers: IndexMap<TeamId, u32>,
    /// Teams that found the target, filled when entering [`MemoryPhase::Result`].
    pub winners: Vec<TeamId>,
}

impl MemoryState {
    /// Fresh round for `question`.
    pub fn new(question: Option<Question>) -> Self {
        Self {
            question,
            ..Self::default()
        }
    }

    /// Target cell parsed from the question's answer.
    pub fn target_position(&self) -> Option<u32> {
        self.question
            .as_ref()
            .and_then(|question| question.correct_answer.trim().parse().ok())
    }

    /// Record a team's guess; only the first guess counts.
    pub fn submit(&mut self, team_id: &TeamId, position: u32) -> Result<(), Rejection> {
        if self.phase != MemoryPhase::Answer {
            return Err(Rejection::invalid("memory answers are closed"));
        }
        if position == 0 {
            return Err(Rejection::invalid("memory positions start at 1"));
        }
        if self.answers.contains_key(team_id) {
            return Err(Rejection::invalid(format!(
                "team `{team_id}` already answered"
            )));
        }
        self.answers.insert(team_id.clone(), position);
        Ok(())
    }

    /// Move to the next step, evaluating guesses on entry into the result.
    pub fn advance(&mut self) -> Result<MemoryPhase, Rejection> {
        let next = self
            .phase
            .next()
            .ok_or_else(|| Rejection::invalid("memory round already finished"))?;
        self.phase = next;

        if next == MemoryPhase::Result {
            let target = self.target_position();
            self.winners = self
                .answers
                .iter()
                .filter(|(_, guess)| Some(**guess) == target)
                .map(|(team_id, _)| team_id.clone())
                .collect();
        }
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory(target: &str) -> MemoryState {
        MemoryState::new(Some(Question {
            prompt: "Where was the cat?".into(),
            correct_answer: target.into(),
            ..Question::default()
        }))
    }

    fn to_answer(state: &mut MemoryState) {
        state.advance().unwrap();
        state.advance().unwrap();
    }

    #[test]
    fn walks_through_phases_in_order() {
        let mut state = memory("3");
        assert_eq!(state.phase, MemoryPhase::Memorize);
        assert_eq!(state.advance().unwrap(), MemoryPhase::Covered);
        assert_eq!(state.advance().unwrap(), MemoryPhase::Answer);
        assert_eq!(state.advance().unwrap(), MemoryPhase::Result);
        assert!(state.advance().is_err());
    }

    #[test]
    fn answers_only_accepted_during_answer_phase() {
        let mut state = memory("3");
        assert!(state.submit(&"a".into(), 3).is_err());
        to_answer(&mut state);
        state.submit(&"a".into(), 3).unwrap();
        assert!(state.submit(&"a".into(), 4).is_err());
        assert_eq!(state.answers["a"], 3);
    }

    #[test]
    fn result_lists_teams_on_target() {
        let mut state = memory(" 3 ");
        to_answer(&mut state);
        state.submit(&"a".into(), 3).unwrap();
        state.submit(&"b".into(), 5).unwrap();
        state.submit(&"c".into(), 3).unwrap();
        state.advance().unwrap();
        assert_eq!(state.winners, vec!["a".to_string(), "c".to_string()]);
    }

    #[test]
    fn unparseable_target_has_no_winners() {
        let mut state = memory("top left");
        to_answer(&mut state);
        state.submit(&"a".into(), 1).unwrap();
        state.advance().unwrap();
        assert!(state.winners.is_empty());
    }
}
