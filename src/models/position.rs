//! Planar positions.

use serde::{Deserialize, Serialize};

/// Distance under which a robot counts as arrived.
pub const GOAL_TOLERANCE: f64 = 0.01;

/// A point on the map.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    /// Creates a position.
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to `other`.
    #[inline]
    pub fn distance_to(&self, other: &Position) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    /// Whether both coordinates are within `tolerance` of `other`.
    #[inline]
    pub fn approx_eq(&self, other: &Position, tolerance: f64) -> bool {
        (self.x - other.x).abs() <= tolerance && (self.y - other.y).abs() <= tolerance
    }

    /// Moves at most `step` toward `goal`, never overshooting.
    pub fn step_toward(&self, goal: &Position, step: f64) -> Position {
        let distance = self.distance_to(goal);
        if distance == 0.0 || step >= distance {
            return *goal;
        }
        let ratio = step / distance;
        Position::new(
            self.x + (goal.x - self.x) * ratio,
            self.y + (goal.y - self.y) * ratio,
        )
    }
}
