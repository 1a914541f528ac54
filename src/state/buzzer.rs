//! Buzzer race arbitration.
//!
//! Positions are handed out in the order attempts reach the arbiter. Callers
//! pass the server clock reading taken when the action was dequeued, so the
//! arbiter never trusts a client timestamp.

use std::time::{Duration, Instant};

use crate::{
    error::Rejection,
    state::game::{BuzzerEntry, TeamId},
};

/// What happened after the head of the queue was judged wrong.
#[derive(Debug, Clone, PartialEq)]
pub enum AdvanceOutcome {
    /// Another team is waiting; it is now the head.
    NextUp(BuzzerEntry),
    /// The queue ran dry and the window is accepting buzzes again.
    Reopened,
}

/// Buzzer window state and arrival queue.
#[derive(Debug, Clone)]
pub struct BuzzerArbiter {
    locked: bool,
    queue: Vec<BuzzerEntry>,
    standalone: bool,
    window_started_at: Option<Instant>,
    issued: usize,
}

impl Default for BuzzerArbiter {
    fn default() -> Self {
        Self::new()
    }
}

impl BuzzerArbiter {
    /// A locked arbiter with no window.
    pub fn new() -> Self {
        Self {
            locked: true,
            queue: Vec::new(),
            standalone: false,
            window_started_at: None,
            issued: 0,
        }
    }

    /// Whether buzzes are currently refused.
    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// Whether the window runs without an attached question.
    pub fn is_standalone(&self) -> bool {
        self.standalone
    }

    /// Entries in arrival order.
    pub fn queue(&self) -> &[BuzzerEntry] {
        &self.queue
    }

    /// Team currently expected to answer.
    pub fn head(&self) -> Option<&BuzzerEntry> {
        self.queue.first()
    }

    /// Whether `team_id` already holds a place in this window.
    pub fn has_buzzed(&self, team_id: &str) -> bool {
        self.queue.iter().any(|entry| entry.team_id == team_id)
    }

    /// Open a fresh window: empty queue, unlocked, clock restarted at `now`.
    pub fn open_window(&mut self, standalone: bool, now: Instant) {
        self.queue.clear();
        self.issued = 0;
        self.locked = false;
        self.standalone = standalone;
        self.window_started_at = Some(now);
    }

    /// Register a buzz from `team_id`, returning its queue entry.
    pub fn attempt_buzz(
        &mut self,
        team_id: &TeamId,
        name: &str,
        now: Instant,
    ) -> Result<BuzzerEntry, Rejection> {
        if self.locked {
            return Err(Rejection::invalid("buzzer is locked"));
        }
        if self.has_buzzed(team_id) {
            return Err(Rejection::invalid(format!(
                "team `{team_id}` already buzzed in this window"
            )));
        }

        let reaction_time = self
            .window_started_at
            .map(|start| now.saturating_duration_since(start))
            .unwrap_or(Duration::ZERO);

        let entry = BuzzerEntry {
            team_id: team_id.clone(),
            name: name.to_string(),
            reaction_time,
            queue_position: self.issued + 1,
        };
        self.issued += 1;
        self.queue.push(entry.clone());
        Ok(entry)
    }

    /// Drop the head of the queue after a wrong answer.
    ///
    /// Remaining positions are not renumbered: each team keeps the position it
    /// was told when it buzzed, and later buzzes continue the sequence until the
    /// queue runs dry and the window reopens.
    pub fn advance_past_wrong(&mut self) -> Result<(BuzzerEntry, AdvanceOutcome), Rejection> {
        if self.queue.is_empty() {
            return Err(Rejection::invalid("buzzer queue is empty"));
        }
        let judged = self.queue.remove(0);

        let outcome = match self.queue.first() {
            Some(next) => AdvanceOutcome::NextUp(next.clone()),
            None => {
                self.issued = 0;
                self.locked = false;
                AdvanceOutcome::Reopened
            }
        };
        Ok((judged, outcome))
    }

    /// Take the head for a correct answer, ending the round's race.
    pub fn award_head(&mut self) -> Result<BuzzerEntry, Rejection> {
        if self.queue.is_empty() {
            return Err(Rejection::invalid("buzzer queue is empty"));
        }
        let head = self.queue.remove(0);
        self.queue.clear();
        self.locked = true;
        Ok(head)
    }

    /// End the race without judging the head, e.g. after a direct award.
    pub fn settle(&mut self) {
        self.queue.clear();
        self.locked = true;
    }

    /// Stop accepting buzzes without judging.
    pub fn close(&mut self) {
        self.locked = true;
    }

    /// Clear the queue, unlock and restart the window clock.
    pub fn reset_for_new_round(&mut self, now: Instant) {
        self.queue.clear();
        self.issued = 0;
        self.locked = false;
        self.window_started_at = Some(now);
    }

    /// Back to the initial locked state, forgetting the window entirely.
    pub fn clear(&mut self) {
        *self = Self::new();
    }
}
