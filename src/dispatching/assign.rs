//! Cost-based order assignment.
//!
//! # Algorithm
//!
//! For every robot not in error:
//! 1. Search its queue for a *pickup injection point*: the first injectable
//!    task at the order's source whose projected load stays within the
//!    pickup capacity limit up to the delivery. From there, search for a
//!    *delivery injection point* at the destination.
//! 2. Build the route the robot would drive (its queue up to the injection
//!    point, plus any new tasks) and price it with the [`CostEngine`].
//!
//! The cheapest robot receives the order. Injected suborders join the
//! existing task and the task is re-sorted; otherwise new tasks are
//! appended. The robot's projection is refreshed afterwards.
//!
//! # Capacity policy
//!
//! A position may take one more object only if its projected load plus one
//! stays within [`FleetConfig::pickup_capacity_limit`], and a task may hold
//! at most [`FleetConfig::max_task_suborders`] suborders. Only queued or
//! sleeping tasks accept injection.
//!
//! An order is admitted only while its destination has an empty slot that
//! no other assigned delivery is counting on ([`destination_room`]). Until
//! then it stays unassigned and is retried on the next sweep.

use tracing::{debug, info};

use super::{CostEngine, RoutePlan};
use crate::config::FleetConfig;
use crate::error::SchedulerError;
use crate::ledger::Ledger;
use crate::models::{AmrStatus, Order, OrderId, SlotHolder, SubOrderId, TaskId};
use crate::projection::{tail_state, update_expected_states};
use crate::registry::Registry;

/// Queue positions an order's suborders can join.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InjectionPoints {
    pub pickup: Option<usize>,
    pub delivery: Option<usize>,
}

/// Outcome of a successful assignment.
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub amr_id: String,
    pub pickup_task: TaskId,
    pub delivery_task: TaskId,
    pub cost: f64,
}

/// Finds where `order` can join `amr_id`'s queue.
///
/// Returns `None` when the robot cannot take the order at all.
pub fn find_injection_points(
    config: &FleetConfig,
    registry: &Registry,
    ledger: &Ledger,
    amr_id: &str,
    order: &Order,
) -> Result<Option<InjectionPoints>, SchedulerError> {
    let limit = config.pickup_capacity_limit();
    let max_suborders = config.max_task_suborders();
    let queue = ledger.queue(amr_id)?;

    if order.allow_grouping {
        let injectable = |index: usize, station: &str| -> Result<bool, SchedulerError> {
            let task = ledger.task(queue.tasks[index])?;
            Ok(task.accepts_injection()
                && task.station_id == station
                && task.suborders.len() < max_suborders)
        };

        for pickup in 0..queue.len() {
            if !injectable(pickup, &order.source_station)? {
                continue;
            }
            let mut delivery = None;
            for index in pickup + 1..queue.len() {
                if injectable(index, &order.destination_station)? {
                    delivery = Some(index);
                    break;
                }
            }
            let end = delivery.unwrap_or(queue.len());
            let fits = queue.expected_states[pickup..end]
                .iter()
                .all(|state| state.len() < limit);
            if fits {
                return Ok(Some(InjectionPoints {
                    pickup: Some(pickup),
                    delivery,
                }));
            }
        }
    }

    let tail = tail_state(registry, ledger, amr_id)?;
    if tail.len() < limit {
        Ok(Some(InjectionPoints::default()))
    } else {
        Ok(None)
    }
}

/// Builds the route `amr_id` would drive to serve `order` at `points`.
fn route_plan(
    registry: &Registry,
    ledger: &Ledger,
    amr_id: &str,
    order: &Order,
    points: InjectionPoints,
) -> Result<RoutePlan, SchedulerError> {
    let amr = registry.amr(amr_id)?;
    let queue = ledger.queue(amr_id)?;
    let mut plan = RoutePlan::new(amr_id, amr.position);

    let last = match points {
        InjectionPoints {
            pickup: Some(_),
            delivery: Some(delivery),
        } => Some(delivery),
        _ => queue.len().checked_sub(1),
    };
    if let Some(last) = last {
        for index in 0..=last {
            let task = ledger.task(queue.tasks[index])?;
            let station = registry.station(&task.station_id)?;
            let injected = usize::from(points.pickup == Some(index))
                + usize::from(points.delivery == Some(index));
            plan.travel_to(station.position, task.suborders.len() + injected);
        }
    }

    let source = registry.station(&order.source_station)?.position;
    let destination = registry.station(&order.destination_station)?.position;
    match points {
        InjectionPoints {
            pickup: None,
            delivery: _,
        } => {
            plan.travel_to(source, 1);
            plan.travel_to(destination, 1);
        }
        InjectionPoints {
            pickup: Some(_),
            delivery: None,
        } => plan.travel_to(destination, 1),
        _ => {}
    }
    Ok(plan)
}

/// Assigns a pending order to the cheapest admissible robot.
///
/// Returns `Ok(None)` when no robot can take the order now.
pub fn assign_order(
    config: &FleetConfig,
    engine: &CostEngine,
    registry: &Registry,
    ledger: &mut Ledger,
    order_id: OrderId,
    tick: u64,
) -> Result<Option<Assignment>, SchedulerError> {
    let order = ledger.order(order_id)?.clone();

    if destination_room(registry, ledger, &order)? == 0 {
        debug!(order = order_id, station = %order.destination_station,
               "destination has no free slot, order waits");
        return Ok(None);
    }

    let mut candidates = Vec::new();
    let mut plans = Vec::new();
    for amr in registry.amrs() {
        if amr.status == AmrStatus::Error {
            continue;
        }
        let Some(points) = find_injection_points(config, registry, ledger, &amr.id, &order)? else {
            continue;
        };
        plans.push(route_plan(registry, ledger, &amr.id, &order, points)?);
        candidates.push(points);
    }

    let Some(best) = engine.select_best(&plans) else {
        debug!(order = order_id, "no robot can take order");
        return Ok(None);
    };
    let amr_id = plans[best].amr_id.clone();
    let points = candidates[best];
    let cost = engine.score(&plans[best]);

    let pickup_task = place_suborder(
        registry,
        ledger,
        &amr_id,
        order.pickup,
        points.pickup,
        &order.source_station,
        tick,
    )?;
    let delivery_task = place_suborder(
        registry,
        ledger,
        &amr_id,
        order.delivery,
        points.delivery,
        &order.destination_station,
        tick,
    )?;
    ledger.order_mut(order_id)?.assigned_amr = Some(amr_id.clone());
    update_expected_states(registry, ledger, &amr_id)?;

    info!(order = order_id, amr = %amr_id, pickup_task, delivery_task, cost,
          injected = points.pickup.is_some(), "order assigned");
    Ok(Some(Assignment {
        amr_id,
        pickup_task,
        delivery_task,
        cost,
    }))
}

/// Empty slots at the order's destination not already promised to the
/// delivery of another assigned order.
pub fn destination_room(
    registry: &Registry,
    ledger: &Ledger,
    order: &Order,
) -> Result<usize, SchedulerError> {
    let station = registry.station(&order.destination_station)?;
    let mut promised = 0;
    for other in ledger.orders() {
        if other.id == order.id
            || other.assigned_amr.is_none()
            || other.destination_station != order.destination_station
        {
            continue;
        }
        if !ledger.suborder(other.delivery)?.status.is_terminal() {
            promised += 1;
        }
    }
    Ok(station.free_count().saturating_sub(promised))
}

/// Appends a suborder to the task at `position`, or to a new task.
fn place_suborder(
    registry: &Registry,
    ledger: &mut Ledger,
    amr_id: &str,
    suborder_id: SubOrderId,
    position: Option<usize>,
    station_id: &str,
    tick: u64,
) -> Result<TaskId, SchedulerError> {
    let task_id = match position {
        Some(index) => ledger.queue(amr_id)?.tasks[index],
        None => ledger.allocate_task(amr_id, station_id, tick)?,
    };
    ledger.task_mut(task_id)?.suborders.push(suborder_id);
    ledger.suborder_mut(suborder_id)?.task_id = Some(task_id);
    if position.is_some() {
        sort_alternating(registry, ledger, task_id)?;
    }
    Ok(task_id)
}

/// Interleaves the pending pickups and deliveries of a task.
///
/// Starts with a pickup when the station has strictly fewer free slots than
/// the robot, otherwise with a delivery. Suborders that already left
/// `pending` keep their place at the front.
pub fn sort_alternating(
    registry: &Registry,
    ledger: &mut Ledger,
    task_id: TaskId,
) -> Result<(), SchedulerError> {
    let task = ledger.task(task_id)?;
    let station_free = registry.station(&task.station_id)?.free_count();
    let amr_free = registry.amr(&task.assigned_amr)?.free_count();

    let mut settled = Vec::new();
    let mut pickups = Vec::new();
    let mut deliveries = Vec::new();
    for suborder in ledger.task_suborders(task_id)? {
        if !suborder.is_pending() {
            settled.push(suborder.id);
        } else if suborder.is_pickup() {
            pickups.push(suborder.id);
        } else {
            deliveries.push(suborder.id);
        }
    }

    let (first, second) = if station_free < amr_free {
        (pickups, deliveries)
    } else {
        (deliveries, pickups)
    };
    let mut ordered = settled;
    let mut first = first.into_iter();
    let mut second = second.into_iter();
    loop {
        let a = first.next();
        let b = second.next();
        if a.is_none() && b.is_none() {
            break;
        }
        ordered.extend(a);
        ordered.extend(b);
    }
    ledger.task_mut(task_id)?.suborders = ordered;
    Ok(())
}
