//! Queue rearrangement and deadlock avoidance.
//!
//! Two guards run before a robot commits to work at a station:
//!
//! - [`pre_task_validation`] classifies every pending suborder of a queued
//!   task against live capacity. Suborders whose preconditions no longer hold
//!   fail immediately. Suborders that cannot run *yet* are delayed and moved
//!   to a later task. A task left with nothing executable goes to sleep.
//! - [`rearrange_suborders`] runs at the station before each pending
//!   suborder. It promotes the one suborder that can free capacity when
//!   either side is full, and reports a deadlock when neither side can move.
//!
//! Sleeping tasks are re-validated by [`wake_task`].

use tracing::{debug, info, warn};

use crate::config::FleetConfig;
use crate::dispatching::sort_alternating;
use crate::error::SchedulerError;
use crate::ledger::Ledger;
use crate::models::{
    OrderId, SlotHolder, Station, SubOrderId, SubOrderKind, SubOrderStatus, TaskId, TaskStatus,
};
use crate::projection::update_expected_states;
use crate::registry::Registry;

/// Empty station slots that are unclaimed or claimed only by `orders`.
fn station_room(station: &Station, orders: &[OrderId]) -> usize {
    station
        .slots
        .iter()
        .filter(|s| s.is_empty() && s.reservations.iter().all(|o| orders.contains(o)))
        .count()
}

/// Reorders the pending suborders of an executing task so the next one can
/// make progress.
///
/// | Station room | Robot room | Action |
/// |--------------|-----------|--------|
/// | 0 | 0 | deadlock |
/// | 0 | > 0 | promote the first pending pickup |
/// | > 0 | 0 | promote the first pending delivery with an empty reserved slot |
/// | > 0 | > 0 | keep the alternating order |
pub fn rearrange_suborders(
    registry: &Registry,
    ledger: &mut Ledger,
    task_id: TaskId,
) -> Result<(), SchedulerError> {
    let task = ledger.task(task_id)?;
    let amr = registry.amr(&task.assigned_amr)?;
    let station = registry.station(&task.station_id)?;
    let pending: Vec<_> = ledger
        .task_suborders(task_id)?
        .into_iter()
        .filter(|s| s.is_pending())
        .collect();
    if pending.is_empty() {
        return Ok(());
    }

    let delivery_orders: Vec<OrderId> = pending
        .iter()
        .filter(|s| !s.is_pickup())
        .map(|s| s.order_id)
        .collect();
    let station_free = station_room(station, &delivery_orders);
    let amr_free = amr.free_count();

    let deadlock = |reason: &str| SchedulerError::Deadlock {
        amr: amr.id.clone(),
        station: station.id.clone(),
        task: task_id,
        reason: reason.to_string(),
    };

    let promoted: SubOrderId = match (station_free, amr_free) {
        (0, 0) => return Err(deadlock("station and robot are both full")),
        (0, _) => pending
            .iter()
            .find(|s| s.is_pickup())
            .map(|s| s.id)
            .ok_or_else(|| deadlock("station is full and no pickup can free a slot"))?,
        (_, 0) => pending
            .iter()
            .find(|s| {
                !s.is_pickup()
                    && station
                        .reserved_slot(s.order_id)
                        .is_some_and(|slot| station.slots[slot].is_empty())
            })
            .map(|s| s.id)
            .ok_or_else(|| deadlock("robot is full and no delivery can free a slot"))?,
        _ => return Ok(()),
    };

    debug!(task = task_id, suborder = promoted, station_free, amr_free, "suborder promoted");
    ledger.task_mut(task_id)?.promote(promoted);
    Ok(())
}

/// Classification of a task's pending suborders.
#[derive(Debug, Default)]
struct Triage {
    pickups: Vec<SubOrderId>,
    deliveries: Vec<SubOrderId>,
    delayed: Vec<SubOrderId>,
    invalid: Vec<SubOrderId>,
}

impl Triage {
    fn executable(&self) -> usize {
        self.pickups.len() + self.deliveries.len()
    }
}

/// Validates a queued (or sleeping) task before it is dispatched.
///
/// Returns `true` when the task has at least one executable suborder and is
/// `queued`. Otherwise the task has been put to sleep or, if nothing is left
/// in it, dropped from the queue.
///
/// # Errors
///
/// [`SchedulerError::Deadlock`] when deliveries are due at a station with no
/// free slot and no pending pickup there anywhere in the fleet. Deliveries
/// that only exceed the remaining free slots are invalidated instead.
pub fn pre_task_validation(
    config: &FleetConfig,
    registry: &Registry,
    ledger: &mut Ledger,
    task_id: TaskId,
    tick: u64,
) -> Result<bool, SchedulerError> {
    let task = ledger.task(task_id)?.clone();
    let station = registry.station(&task.station_id)?;
    if station.is_busy() {
        debug!(task = task_id, station = %station.id, "station busy, task waits");
        return Ok(false);
    }
    let amr = registry.amr(&task.assigned_amr)?;

    let mut triage = Triage::default();
    for suborder in ledger.task_suborders(task_id)? {
        if !suborder.is_pending() {
            continue;
        }
        match suborder.kind {
            SubOrderKind::Pickup if station.holds(&suborder.object_id) => {
                triage.pickups.push(suborder.id)
            }
            SubOrderKind::Pickup => triage.invalid.push(suborder.id),
            SubOrderKind::Delivery => match ledger.sibling(suborder.id)?.status {
                SubOrderStatus::Failed => triage.invalid.push(suborder.id),
                SubOrderStatus::Completed if amr.holds(&suborder.object_id) => {
                    triage.deliveries.push(suborder.id)
                }
                SubOrderStatus::Completed => triage.invalid.push(suborder.id),
                SubOrderStatus::Pending | SubOrderStatus::Executing => {
                    triage.delayed.push(suborder.id)
                }
            },
        }
    }

    // Deliveries beyond what the station can take once this task's pickups
    // have run. They wait only if some pickup elsewhere will free a slot.
    let delivery_orders: Vec<OrderId> = triage
        .deliveries
        .iter()
        .map(|&id| ledger.suborder(id).map(|s| s.order_id))
        .collect::<Result<_, _>>()?;
    let station_free = station_room(station, &delivery_orders);
    let station_excess = triage
        .deliveries
        .len()
        .saturating_sub(triage.pickups.len() + station_free);
    if station_excess > 0 {
        let relief = ledger.suborders().any(|s| {
            s.is_pending()
                && s.is_pickup()
                && s.station_id == task.station_id
                && s.task_id.is_some_and(|t| t != task_id)
        });
        // Nothing here or elsewhere will ever free a slot: the objects
        // aboard could never be delivered.
        if !relief && station_free + triage.pickups.len() == 0 {
            return Err(SchedulerError::Deadlock {
                amr: amr.id.clone(),
                station: station.id.clone(),
                task: task_id,
                reason: "station is full and no pickup can free a slot".to_string(),
            });
        }
        for _ in 0..station_excess {
            if let Some(id) = triage.deliveries.pop() {
                if relief {
                    triage.delayed.push(id);
                } else {
                    triage.invalid.push(id);
                }
            }
        }
    }

    let amr_free = amr.free_count();
    let amr_excess = triage
        .pickups
        .len()
        .saturating_sub(triage.deliveries.len() + amr_free);
    for _ in 0..amr_excess {
        if let Some(id) = triage.pickups.pop() {
            triage.delayed.push(id);
        }
    }

    if station_free + amr_free == 0 {
        triage.delayed.append(&mut triage.pickups);
        triage.delayed.append(&mut triage.deliveries);
    }

    for &id in &triage.invalid {
        ledger.detach_suborder(id)?;
        let suborder = ledger.suborder_mut(id)?;
        suborder.status = SubOrderStatus::Failed;
        warn!(task = task_id, suborder = id, order = suborder.order_id,
              "{} invalidated", suborder.describe());
    }

    let amr_id = task.assigned_amr.clone();
    if triage.executable() == 0 {
        if triage.delayed.is_empty() {
            ledger.prune_task(task_id);
        } else {
            ledger.task_mut(task_id)?.status = TaskStatus::Sleep;
            debug!(amr = %amr_id, task = task_id, delayed = triage.delayed.len(), "task sleeps");
        }
        update_expected_states(registry, ledger, &amr_id)?;
        return Ok(false);
    }

    for &id in &triage.delayed {
        relocate(config, registry, ledger, task_id, id, tick)?;
    }
    ledger.task_mut(task_id)?.status = TaskStatus::Queued;
    update_expected_states(registry, ledger, &amr_id)?;
    Ok(true)
}

/// Moves a delayed suborder out of `task_id` to a later task.
fn relocate(
    config: &FleetConfig,
    registry: &Registry,
    ledger: &mut Ledger,
    task_id: TaskId,
    suborder_id: SubOrderId,
    tick: u64,
) -> Result<(), SchedulerError> {
    let task = ledger.task(task_id)?;
    let amr_id = task.assigned_amr.clone();
    let station_id = task.station_id.clone();
    let suborder = ledger.suborder(suborder_id)?.clone();

    match suborder.kind {
        SubOrderKind::Delivery => {
            let queue = ledger.queue(&amr_id)?;
            let current = queue.position(task_id).unwrap_or(0);
            let pickup_at = ledger
                .sibling(suborder_id)?
                .task_id
                .and_then(|t| queue.position(t))
                .unwrap_or(0);
            let after = current.max(pickup_at);
            let mut target = None;
            for &candidate in queue.tasks.iter().skip(after + 1) {
                let t = ledger.task(candidate)?;
                if t.accepts_injection()
                    && t.station_id == station_id
                    && t.suborders.len() < config.max_task_suborders()
                {
                    target = Some(candidate);
                    break;
                }
            }
            let target = match target {
                Some(existing) => {
                    move_suborder(ledger, suborder_id, existing)?;
                    sort_alternating(registry, ledger, existing)?;
                    existing
                }
                None => {
                    let fresh = ledger.allocate_task(&amr_id, &station_id, tick)?;
                    move_suborder(ledger, suborder_id, fresh)?;
                    fresh
                }
            };
            debug!(amr = %amr_id, suborder = suborder_id, from = task_id, to = target,
                   "delivery delayed");
        }
        SubOrderKind::Pickup => {
            let fresh = ledger.allocate_task(&amr_id, &station_id, tick)?;
            move_suborder(ledger, suborder_id, fresh)?;
            debug!(amr = %amr_id, suborder = suborder_id, from = task_id, to = fresh,
                   "pickup delayed");

            let sibling = ledger.sibling(suborder_id)?.clone();
            if sibling.is_pending() {
                if let Some(old) = sibling.task_id {
                    let behind = ledger.allocate_task(&amr_id, &sibling.station_id, tick)?;
                    move_suborder(ledger, sibling.id, behind)?;
                    ledger.prune_task(old);
                    debug!(amr = %amr_id, suborder = sibling.id, from = old, to = behind,
                           "delivery follows delayed pickup");
                }
            }
        }
    }
    Ok(())
}

fn move_suborder(
    ledger: &mut Ledger,
    suborder_id: SubOrderId,
    target: TaskId,
) -> Result<(), SchedulerError> {
    ledger.detach_suborder(suborder_id)?;
    ledger.task_mut(target)?.suborders.push(suborder_id);
    ledger.suborder_mut(suborder_id)?.task_id = Some(target);
    Ok(())
}

/// Re-validates the sleeping tasks of an idle robot, waking at most one.
pub fn wake_task(
    config: &FleetConfig,
    registry: &Registry,
    ledger: &mut Ledger,
    amr_id: &str,
    tick: u64,
) -> Result<bool, SchedulerError> {
    let sleeping: Vec<TaskId> = ledger
        .queue(amr_id)?
        .tasks
        .iter()
        .copied()
        .filter(|&t| {
            ledger
                .task(t)
                .is_ok_and(|task| task.status == TaskStatus::Sleep)
        })
        .collect();
    for task_id in sleeping {
        if pre_task_validation(config, registry, ledger, task_id, tick)? {
            info!(amr = %amr_id, task = task_id, "task woken");
            return Ok(true);
        }
    }
    Ok(false)
}
