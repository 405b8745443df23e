//! Suborder model.
//!
//! Every order splits into a pickup suborder at its source station and a
//! delivery suborder at its destination. A delivery only becomes executable
//! once its sibling pickup has completed and the object is aboard the robot.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::{OrderId, SlotIndex, TaskId};

/// Unique identifier for a suborder.
pub type SubOrderId = u64;

/// Which half of an order a suborder is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubOrderKind {
    /// Station → robot transfer.
    Pickup,
    /// Robot → station transfer.
    Delivery,
}

impl fmt::Display for SubOrderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pickup => f.write_str("pickup"),
            Self::Delivery => f.write_str("delivery"),
        }
    }
}

/// Suborder execution status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubOrderStatus {
    Pending,
    Executing,
    Completed,
    Failed,
}

impl SubOrderStatus {
    /// Whether no further transition is possible.
    #[inline]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// One half (pickup or delivery) of an order, bound to one station.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubOrder {
    /// Unique suborder identifier.
    pub id: SubOrderId,
    /// Owning order.
    pub order_id: OrderId,
    /// Pickup or delivery.
    pub kind: SubOrderKind,
    /// Station where the transfer happens.
    pub station_id: String,
    /// Transferred object.
    pub object_id: String,
    /// Execution status.
    pub status: SubOrderStatus,
    /// Task currently carrying this suborder.
    pub task_id: Option<TaskId>,
    /// Robot slot resolved when execution begins.
    pub amr_slot: Option<SlotIndex>,
    /// Station slot resolved when execution begins.
    pub station_slot: Option<SlotIndex>,
    /// Ticks spent executing.
    pub timestep: u32,
}

impl SubOrder {
    /// Creates a pending, unassigned suborder.
    pub fn new(
        id: SubOrderId,
        order_id: OrderId,
        kind: SubOrderKind,
        station_id: impl Into<String>,
        object_id: impl Into<String>,
    ) -> Self {
        Self {
            id,
            order_id,
            kind,
            station_id: station_id.into(),
            object_id: object_id.into(),
            status: SubOrderStatus::Pending,
            task_id: None,
            amr_slot: None,
            station_slot: None,
            timestep: 0,
        }
    }

    #[inline]
    pub fn is_pending(&self) -> bool {
        self.status == SubOrderStatus::Pending
    }

    #[inline]
    pub fn is_pickup(&self) -> bool {
        self.kind == SubOrderKind::Pickup
    }

    /// One-line description, e.g. `3: pickup Object01 from Station0`.
    pub fn describe(&self) -> String {
        let preposition = match self.kind {
            SubOrderKind::Pickup => "from",
            SubOrderKind::Delivery => "to",
        };
        format!(
            "{}: {} {} {} {}",
            self.id, self.kind, self.object_id, preposition, self.station_id
        )
    }
}
