//! Two-phase slot reservation.
//!
//! A task is only committed when its total slot demand can be met while it
//! executes:
//!
//! 1. [`amr_slot_reservation`] checks that the robot has room for the net
//!    pickups of the task.
//! 2. [`station_slot_reservation`] walks the pending suborders in task order
//!    against a simulated pool of station slots that will be free by then,
//!    and tags one slot per suborder with the owning order id.
//!
//! The whole plan is computed before any tag is written, so a failing
//! reservation leaves the station untouched.

use std::collections::VecDeque;

use tracing::debug;

use crate::error::SchedulerError;
use crate::ledger::Ledger;
use crate::models::{OrderId, SlotHolder, SlotIndex, SubOrderKind, TaskId};
use crate::registry::Registry;

/// Checks that `amr_id` can hold the net pickups of `task_id`.
///
/// Required slots are `max(0, pending pickups − pending deliveries)`.
pub fn amr_slot_reservation(
    registry: &Registry,
    ledger: &Ledger,
    amr_id: &str,
    task_id: TaskId,
) -> Result<(), SchedulerError> {
    let amr = registry.amr(amr_id)?;
    let (mut pickups, mut deliveries) = (0usize, 0usize);
    for suborder in ledger.task_suborders(task_id)? {
        if !suborder.is_pending() {
            continue;
        }
        match suborder.kind {
            SubOrderKind::Pickup => pickups += 1,
            SubOrderKind::Delivery => deliveries += 1,
        }
    }
    let required = pickups.saturating_sub(deliveries);
    let available = amr.free_count();
    if available < required {
        return Err(SchedulerError::AmrCapacity {
            amr: amr_id.to_string(),
            task: task_id,
            required,
            available,
        });
    }
    Ok(())
}

/// Tags station slots for every pending suborder of `task_id`.
///
/// Pickups tag the slot holding their object and return it to the pool.
/// Deliveries keep an existing tag of their order, or take the oldest slot
/// from the pool. Tagging twice for the same order is a no-op.
pub fn station_slot_reservation(
    registry: &mut Registry,
    ledger: &Ledger,
    task_id: TaskId,
) -> Result<(), SchedulerError> {
    let task = ledger.task(task_id)?;
    let station = registry.station(&task.station_id)?;

    let mut pool: VecDeque<SlotIndex> = station
        .slots
        .iter()
        .enumerate()
        .filter(|(_, s)| s.is_empty() && !s.is_reserved())
        .map(|(i, _)| i)
        .collect();
    let mut plan: Vec<(SlotIndex, OrderId)> = Vec::new();

    for suborder in ledger.task_suborders(task_id)? {
        if !suborder.is_pending() {
            continue;
        }
        match suborder.kind {
            SubOrderKind::Pickup => {
                let slot = station.find_object(&suborder.object_id).ok_or_else(|| {
                    SchedulerError::ObjectNotFound {
                        object: suborder.object_id.clone(),
                        holder: station.id.clone(),
                    }
                })?;
                plan.push((slot, suborder.order_id));
                pool.push_back(slot);
            }
            SubOrderKind::Delivery => {
                let slot = match station.reserved_slot(suborder.order_id) {
                    Some(slot) => slot,
                    None => pool.pop_front().ok_or_else(|| SchedulerError::StationCapacity {
                        station: station.id.clone(),
                        order: suborder.order_id,
                    })?,
                };
                plan.push((slot, suborder.order_id));
            }
        }
    }

    let station_id = task.station_id.clone();
    let station = registry.station_mut(&station_id)?;
    for (slot, order_id) in plan {
        if station.slots[slot].reserve(order_id) {
            debug!(station = %station_id, slot, order = order_id, "slot reserved");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::Fixture;

    #[test]
    fn test_amr_capacity_check() {
        let mut fx = Fixture::new(1, 2, 4);
        fx.place("Object01", "Station0", 0);
        fx.place("Object02", "Station0", 1);
        let o1 = fx.order("Object01", "Station0", "Station1");
        let o2 = fx.order("Object02", "Station0", "Station1");
        let task = fx.task("AMR0", "Station0", &[fx.pickup(o1), fx.pickup(o2)]);
        assert!(amr_slot_reservation(&fx.registry, &fx.ledger, "AMR0", task).is_ok());

        fx.registry.place_object("Object09", "AMR0", 0).unwrap();
        fx.registry.place_object("Object10", "AMR0", 1).unwrap();
        let err = amr_slot_reservation(&fx.registry, &fx.ledger, "AMR0", task).unwrap_err();
        assert_eq!(
            err,
            SchedulerError::AmrCapacity {
                amr: "AMR0".into(),
                task,
                required: 2,
                available: 1
            }
        );
    }

    #[test]
    fn test_delivery_reuses_slot_freed_by_pickup() {
        let mut fx = Fixture::new(1, 3, 2);
        fx.place("Object01", "Station0", 0);
        fx.place("Object02", "Station1", 0);
        fx.place("Object03", "Station1", 1);
        let o1 = fx.order("Object02", "Station1", "Station2");
        let o2 = fx.order("Object01", "Station0", "Station1");

        // Station1 is full; only the pickup can make room for the delivery.
        let task = fx.task("AMR0", "Station1", &[fx.pickup(o1), fx.delivery(o2)]);
        station_slot_reservation(&mut fx.registry, &fx.ledger, task).unwrap();

        let station = fx.registry.station("Station1").unwrap();
        assert!(station.slots[0].is_reserved_by(o1));
        assert!(station.slots[0].is_reserved_by(o2));
        assert!(!station.slots[1].is_reserved());
    }

    #[test]
    fn test_delivery_without_room_fails_untouched() {
        let mut fx = Fixture::new(1, 2, 1);
        fx.place("Object01", "Station0", 0);
        fx.place("Object02", "Station1", 0);
        let o1 = fx.order("Object01", "Station0", "Station1");

        let task = fx.task("AMR0", "Station1", &[fx.delivery(o1)]);
        let err = station_slot_reservation(&mut fx.registry, &fx.ledger, task).unwrap_err();
        assert_eq!(err.code(), "FLEET_STATION_CAPACITY");
        assert!(!fx.registry.station("Station1").unwrap().slots[0].is_reserved());
    }

    #[test]
    fn test_reservation_is_idempotent() {
        let mut fx = Fixture::new(1, 2, 2);
        fx.place("Object01", "Station0", 0);
        let o1 = fx.order("Object01", "Station0", "Station1");
        let task = fx.task("AMR0", "Station1", &[fx.delivery(o1)]);

        station_slot_reservation(&mut fx.registry, &fx.ledger, task).unwrap();
        station_slot_reservation(&mut fx.registry, &fx.ledger, task).unwrap();

        let station = fx.registry.station("Station1").unwrap();
        let tags: usize = station.slots.iter().map(|s| s.reservations.len()).sum();
        assert_eq!(tags, 1);
    }
}
