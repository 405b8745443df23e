//! Station and parking models.

use serde::{Deserialize, Serialize};

use super::slot::empty_slots;
use super::{Position, Slot, SlotHolder};

/// Station docking status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StationStatus {
    /// No task is docked.
    Idle,
    /// A robot's executing task targets this station.
    Busy,
}

/// A fixed station with load-bearing slots.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Station {
    /// Unique station identifier.
    pub id: String,
    /// Docking status.
    pub status: StationStatus,
    /// Fixed-capacity slots.
    pub slots: Vec<Slot>,
    /// Docking position.
    pub position: Position,
}

impl Station {
    /// Creates an idle station with empty slots.
    pub fn new(id: impl Into<String>, position: Position, capacity: usize) -> Self {
        Self {
            id: id.into(),
            status: StationStatus::Idle,
            slots: empty_slots(capacity),
            position,
        }
    }

    /// Whether a task is docked here.
    #[inline]
    pub fn is_busy(&self) -> bool {
        self.status == StationStatus::Busy
    }
}

impl SlotHolder for Station {
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

/// A robot's dedicated idle position.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Parking {
    /// Unique parking identifier.
    pub id: String,
    /// Robot this spot belongs to.
    pub amr_id: String,
    /// Spot position.
    pub position: Position,
}

impl Parking {
    /// Creates a parking spot for `amr_id`.
    pub fn new(id: impl Into<String>, amr_id: impl Into<String>, position: Position) -> Self {
        Self {
            id: id.into(),
            amr_id: amr_id.into(),
            position,
        }
    }
}
