//! Route plans priced by cost rules.

use crate::models::Position;

/// One drive between two points followed by slot transfers on arrival.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteLeg {
    pub from: Position,
    pub to: Position,
    /// Suborders handled at `to`.
    pub transfers: usize,
}

impl RouteLeg {
    #[inline]
    pub fn distance(&self) -> f64 {
        self.from.distance_to(&self.to)
    }
}

/// The drives a robot would perform to serve its queue and a new order.
#[derive(Debug, Clone, PartialEq)]
pub struct RoutePlan {
    /// Robot the plan belongs to.
    pub amr_id: String,
    /// Starting point (the robot's current position).
    pub origin: Position,
    /// Legs in driving order.
    pub legs: Vec<RouteLeg>,
}

impl RoutePlan {
    /// Creates an empty plan starting at `origin`.
    pub fn new(amr_id: impl Into<String>, origin: Position) -> Self {
        Self {
            amr_id: amr_id.into(),
            origin,
            legs: Vec::new(),
        }
    }

    /// Where the plan currently ends.
    pub fn end(&self) -> Position {
        self.legs.last().map_or(self.origin, |leg| leg.to)
    }

    /// Appends a leg from the current end to `to`.
    pub fn travel_to(&mut self, to: Position, transfers: usize) {
        let from = self.end();
        self.legs.push(RouteLeg { from, to, transfers });
    }

    /// Total driven distance.
    pub fn total_distance(&self) -> f64 {
        self.legs.iter().map(RouteLeg::distance).sum()
    }

    /// Total suborders handled along the plan.
    pub fn total_transfers(&self) -> usize {
        self.legs.iter().map(|leg| leg.transfers).sum()
    }
}
