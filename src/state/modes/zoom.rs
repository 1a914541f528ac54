//! Progressive image reveal: every extra level shows more of the picture and
//! is worth fewer points.

use crate::{
    error::Rejection,
    state::game::{Question, TeamId},
};

/// Number of reveal levels.
pub const ZOOM_LEVELS: u8 = 5;
/// Points on offer at level 1.
pub const ZOOM_START_POINTS: i32 = 250;
/// Points lost with each level.
pub const ZOOM_POINT_STEP: i32 = 50;

/// Zoom round progress.
#[derive(Debug, Clone, PartialEq)]
pub struct ZoomState {
    /// Reveal level, 1 (most zoomed in) to [`ZOOM_LEVELS`].
    pub current_level: u8,
    /// Points a correct answer earns at the current level.
    pub points_available: i32,
    /// Teams that answered wrong on this image.
    pub already_answered: Vec<TeamId>,
    /// Image question being guessed.
    pub question: Option<Question>,
    /// Team that found the answer, ending the image.
    pub solved_by: Option<TeamId>,
}

impl Default for ZoomState {
    fn default() -> Self {
        Self {
            current_level: 1,
            points_available: ZOOM_START_POINTS,
            already_answered: Vec::new(),
            question: None,
            solved_by: None,
        }
    }
}

impl ZoomState {
    /// Fresh round for `question`.
    pub fn new(question: Option<Question>) -> Self {
        Self {
            question,
            ..Self::default()
        }
    }

    /// Whether the image is still open for guesses.
    pub fn is_open(&self) -> bool {
        self.solved_by.is_none()
    }

    /// Whether `team_id` may still try this image.
    pub fn can_attempt(&self, team_id: &str) -> bool {
        self.is_open() && !self.already_answered.iter().any(|id| id == team_id)
    }

    /// Show one more level and lower the points on offer.
    pub fn reveal_next_level(&mut self) -> Result<u8, Rejection> {
        if !self.is_open() {
            return Err(Rejection::invalid("zoom image already solved"));
        }
        if self.current_level >= ZOOM_LEVELS {
            return Err(Rejection::invalid("zoom image fully revealed"));
        }
        self.current_level += 1;
        self.points_available = points_for_level(self.current_level);
        Ok(self.current_level)
    }

    /// Exclude `team_id` from further guesses on this image.
    pub fn record_wrong(&mut self, team_id: &TeamId) {
        if !self.already_answered.contains(team_id) {
            self.already_answered.push(team_id.clone());
        }
    }

    /// Close the image in favour of `team_id`, returning the points earned.
    pub fn record_solved(&mut self, team_id: &TeamId) -> i32 {
        self.solved_by = Some(team_id.clone());
        self.points_available
    }
}

/// Points available at `level` (1-based).
pub fn points_for_level(level: u8) -> i32 {
    let level = level.clamp(1, ZOOM_LEVELS);
    ZOOM_START_POINTS - ZOOM_POINT_STEP * i32::from(level - 1)
}
