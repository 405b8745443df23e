//! Autonomous mobile robot model.
//!
//! Slot occupancy on the robot is the ground-truth physical state; the
//! scheduler's projections are validated against it.

use serde::{Deserialize, Serialize};

use super::slot::empty_slots;
use super::{Position, Slot, SlotHolder, TaskId, GOAL_TOLERANCE};

/// Robot lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AmrStatus {
    /// No task in progress.
    Idle,
    /// Travelling to, or working at, a task's station.
    Busy,
    /// Halted by a fatal fault; requires a reset.
    Error,
}

/// An autonomous mobile robot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Amr {
    /// Unique robot identifier.
    pub id: String,
    /// Lifecycle status.
    pub status: AmrStatus,
    /// Whether the robot moved during the last tick.
    pub is_moving: bool,
    /// Whether the robot rests on its parking spot.
    pub is_parked: bool,
    /// Fixed-capacity slots.
    pub slots: Vec<Slot>,
    /// Current position.
    pub position: Position,
    /// Position the robot is heading to.
    pub goal: Position,
    /// Tick at which the current goal was claimed. `None` = no claim.
    pub goal_timestamp: Option<u64>,
    /// Task currently executing.
    pub task_id: Option<TaskId>,
    /// Ticks spent busy since reset.
    pub busy_ticks: u64,
    /// Description of the fault that halted the robot.
    pub fault: Option<String>,
}

impl Amr {
    /// Creates an idle robot with empty slots at `position`.
    pub fn new(id: impl Into<String>, position: Position, capacity: usize) -> Self {
        Self {
            id: id.into(),
            status: AmrStatus::Idle,
            is_moving: false,
            is_parked: false,
            slots: empty_slots(capacity),
            position,
            goal: position,
            goal_timestamp: None,
            task_id: None,
            busy_ticks: 0,
            fault: None,
        }
    }

    /// Sets a new goal. The claim timestamp only changes when the goal does.
    pub fn set_goal(&mut self, goal: Position, tick: u64) {
        if self.goal_timestamp.is_none() || !self.goal.approx_eq(&goal, GOAL_TOLERANCE) {
            self.goal_timestamp = Some(tick);
        }
        self.goal = goal;
    }

    /// Drops the claim on the current goal.
    pub fn release_goal(&mut self) {
        self.goal_timestamp = None;
    }

    /// Whether the robot stands on its goal.
    #[inline]
    pub fn at_goal(&self) -> bool {
        self.position.approx_eq(&self.goal, GOAL_TOLERANCE)
    }

    /// Halts the robot with a fault description.
    pub fn halt(&mut self, reason: impl Into<String>) {
        self.status = AmrStatus::Error;
        self.is_moving = false;
        self.fault = Some(reason.into());
    }
}

impl SlotHolder for Amr {
    fn holder_id(&self) -> &str {
        &self.id
    }

    fn slots(&self) -> &[Slot] {
        &self.slots
    }

    fn slots_mut(&mut self) -> &mut [Slot] {
        &mut self.slots
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_amr() {
        let amr = Amr::new("AMR0", Position::new(10.0, 20.0), 3);
        assert_eq!(amr.status, AmrStatus::Idle);
        assert_eq!(amr.capacity(), 3);
        assert_eq!(amr.free_count(), 3);
        assert!(amr.at_goal());
    }

    #[test]
    fn test_goal_timestamp_only_moves_with_goal() {
        let mut amr = Amr::new("AMR0", Position::new(0.0, 0.0), 1);
        amr.set_goal(Position::new(5.0, 5.0), 3);
        assert_eq!(amr.goal_timestamp, Some(3));
        amr.set_goal(Position::new(5.0, 5.0), 9);
        assert_eq!(amr.goal_timestamp, Some(3));
        amr.set_goal(Position::new(1.0, 1.0), 9);
        assert_eq!(amr.goal_timestamp, Some(9));
        amr.release_goal();
        assert_eq!(amr.goal_timestamp, None);
    }

    #[test]
    fn test_halt() {
        let mut amr = Amr::new("AMR0", Position::default(), 1);
        amr.halt("deadlock");
        assert_eq!(amr.status, AmrStatus::Error);
        assert_eq!(amr.fault.as_deref(), Some("deadlock"));
    }

    #[test]
    fn test_status_serializes_snake_case() {
        let json = serde_json::to_string(&AmrStatus::Busy).unwrap();
        assert_eq!(json, "\"busy\"");
    }
}
