//! Read-only inspection records.
//!
//! Every record is a flat, serializable copy of one entity with references
//! expressed as ids. Records never borrow scheduler state, so they can be
//! handed to a reporting surface after the lock is released.

use serde::Serialize;

use crate::error::SchedulerError;
use crate::ledger::Ledger;
use crate::models::{
    slot_label, Amr, AmrStatus, Order, OrderId, OrderStatus, Position, Slot, Station,
    StationStatus, SubOrder, SubOrderId, SubOrderKind, SubOrderStatus, TaskId, TaskStatus,
};

/// One slot of a robot or station.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlotRecord {
    pub slot: String,
    pub object_id: Option<String>,
    pub reservations: Vec<OrderId>,
}

impl SlotRecord {
    fn list(slots: &[Slot]) -> Vec<Self> {
        slots
            .iter()
            .enumerate()
            .map(|(i, s)| Self {
                slot: slot_label(i),
                object_id: s.object_id.clone(),
                reservations: s.reservations.clone(),
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderRecord {
    pub id: OrderId,
    pub object_id: String,
    pub source_station: String,
    pub destination_station: String,
    pub allow_grouping: bool,
    pub priority: i32,
    pub pickup: SubOrderId,
    pub delivery: SubOrderId,
    pub status: OrderStatus,
    pub assigned_amr: Option<String>,
    pub created_tick: u64,
    pub finished_tick: Option<u64>,
}

impl From<&Order> for OrderRecord {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id,
            object_id: order.object_id.clone(),
            source_station: order.source_station.clone(),
            destination_station: order.destination_station.clone(),
            allow_grouping: order.allow_grouping,
            priority: order.priority,
            pickup: order.pickup,
            delivery: order.delivery,
            status: order.status,
            assigned_amr: order.assigned_amr.clone(),
            created_tick: order.created_tick,
            finished_tick: order.finished_tick,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubOrderRecord {
    pub id: SubOrderId,
    pub order_id: OrderId,
    pub kind: SubOrderKind,
    pub station_id: String,
    pub object_id: String,
    pub status: SubOrderStatus,
    pub task_id: Option<TaskId>,
    pub amr_slot: Option<String>,
    pub station_slot: Option<String>,
    pub timestep: u32,
}

impl From<&SubOrder> for SubOrderRecord {
    fn from(suborder: &SubOrder) -> Self {
        Self {
            id: suborder.id,
            order_id: suborder.order_id,
            kind: suborder.kind,
            station_id: suborder.station_id.clone(),
            object_id: suborder.object_id.clone(),
            status: suborder.status,
            task_id: suborder.task_id,
            amr_slot: suborder.amr_slot.map(slot_label),
            station_slot: suborder.station_slot.map(slot_label),
            timestep: suborder.timestep,
        }
    }
}

/// A task with human-readable suborder descriptions.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskRecord {
    pub id: TaskId,
    pub assigned_amr: String,
    pub station_id: String,
    pub status: TaskStatus,
    pub suborders: Vec<SubOrderId>,
    pub descriptions: Vec<String>,
    pub created_tick: u64,
}

impl TaskRecord {
    pub(crate) fn build(ledger: &Ledger, task_id: TaskId) -> Result<Self, SchedulerError> {
        let task = ledger.task(task_id)?;
        let descriptions = ledger
            .task_suborders(task_id)?
            .into_iter()
            .map(SubOrder::describe)
            .collect();
        Ok(Self {
            id: task.id,
            assigned_amr: task.assigned_amr.clone(),
            station_id: task.station_id.clone(),
            status: task.status,
            suborders: task.suborders.clone(),
            descriptions,
            created_tick: task.created_tick,
        })
    }
}

/// A robot queue: tasks in order plus the projected load after each.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueueRecord {
    pub amr_id: String,
    pub tasks: Vec<TaskRecord>,
    pub expected_states: Vec<Vec<String>>,
}

impl QueueRecord {
    pub(crate) fn build(ledger: &Ledger, amr_id: &str) -> Result<Self, SchedulerError> {
        let queue = ledger.queue(amr_id)?;
        let tasks = queue
            .tasks
            .iter()
            .map(|&t| TaskRecord::build(ledger, t))
            .collect::<Result<_, _>>()?;
        Ok(Self {
            amr_id: amr_id.to_string(),
            tasks,
            expected_states: queue
                .expected_states
                .iter()
                .map(|state| state.iter().cloned().collect())
                .collect(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AmrRecord {
    pub id: String,
    pub status: AmrStatus,
    pub is_moving: bool,
    pub is_parked: bool,
    pub position: Position,
    pub goal: Position,
    pub goal_timestamp: Option<u64>,
    pub task_id: Option<TaskId>,
    pub slots: Vec<SlotRecord>,
    pub fault: Option<String>,
}

impl From<&Amr> for AmrRecord {
    fn from(amr: &Amr) -> Self {
        Self {
            id: amr.id.clone(),
            status: amr.status,
            is_moving: amr.is_moving,
            is_parked: amr.is_parked,
            position: amr.position,
            goal: amr.goal,
            goal_timestamp: amr.goal_timestamp,
            task_id: amr.task_id,
            slots: SlotRecord::list(&amr.slots),
            fault: amr.fault.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StationRecord {
    pub id: String,
    pub status: StationStatus,
    pub position: Position,
    pub slots: Vec<SlotRecord>,
}

impl From<&Station> for StationRecord {
    fn from(station: &Station) -> Self {
        Self {
            id: station.id.clone(),
            status: station.status,
            position: station.position,
            slots: SlotRecord::list(&station.slots),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::Fixture;

    #[test]
    fn test_queue_record_shape() {
        let mut fx = Fixture::new(1, 2, 2);
        fx.place("Object01", "Station0", 0);
        let o1 = fx.order("Object01", "Station0", "Station1");
        fx.task("AMR0", "Station0", &[fx.pickup(o1)]);
        fx.task("AMR0", "Station1", &[fx.delivery(o1)]);

        let record = QueueRecord::build(&fx.ledger, "AMR0").unwrap();
        assert_eq!(record.tasks.len(), 2);
        assert_eq!(record.expected_states, vec![vec!["Object01".to_string()], vec![]]);
        assert_eq!(record.tasks[0].descriptions, vec!["1: pickup Object01 from Station0"]);

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["tasks"][1]["status"], "queued");
        assert_eq!(json["tasks"][1]["descriptions"][0], "2: delivery Object01 to Station1");
    }

    #[test]
    fn test_entity_records() {
        let mut fx = Fixture::new(1, 1, 2);
        fx.place("Object01", "Station0", 1);
        fx.registry.station_mut("Station0").unwrap().slots[0].reserve(7);

        let station = StationRecord::from(fx.registry.station("Station0").unwrap());
        assert_eq!(station.slots[1].slot, "slot_1");
        assert_eq!(station.slots[1].object_id.as_deref(), Some("Object01"));
        assert_eq!(station.slots[0].reservations, vec![7]);

        let amr = AmrRecord::from(fx.registry.amr("AMR0").unwrap());
        let json = serde_json::to_value(&amr).unwrap();
        assert_eq!(json["status"], "idle");
        assert_eq!(json["slots"].as_array().unwrap().len(), 3);
    }
}
