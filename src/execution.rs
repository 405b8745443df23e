//! Suborder execution state machine.
//!
//! ```text
//! pending ──begin──▶ executing ──(duration ticks)──▶ completed
//!    │                    │
//!    └──── failed ◀───────┘
//! ```
//!
//! Beginning resolves the physical slot on each side of the transfer. After
//! the configured duration the object moves between the two slots, the
//! order's reservation tag on the station slot is cleared and the suborder
//! completes. Any unresolvable slot fails the suborder and is returned as a
//! fatal error.

use tracing::{debug, info};

use crate::config::FleetConfig;
use crate::error::SchedulerError;
use crate::ledger::Ledger;
use crate::models::{SlotHolder, SubOrderId, SubOrderKind, SubOrderStatus};
use crate::registry::Registry;

/// Moves a pending suborder to `executing`, resolving both slots.
///
/// - Pickup: the station slot holding the object, and any free robot slot.
/// - Delivery: the robot slot holding the object, and the station slot
///   tagged for the order, which must be empty.
pub fn begin_suborder(
    registry: &Registry,
    ledger: &mut Ledger,
    amr_id: &str,
    suborder_id: SubOrderId,
) -> Result<(), SchedulerError> {
    let suborder = ledger.suborder(suborder_id)?;
    let amr = registry.amr(amr_id)?;
    let station = registry.station(&suborder.station_id)?;

    let resolved = match suborder.kind {
        SubOrderKind::Pickup => station
            .find_object(&suborder.object_id)
            .ok_or_else(|| SchedulerError::ObjectNotFound {
                object: suborder.object_id.clone(),
                holder: station.id.clone(),
            })
            .and_then(|station_slot| {
                amr.find_free_slot()
                    .map(|amr_slot| (amr_slot, station_slot))
                    .ok_or_else(|| SchedulerError::SlotUnavailable {
                        holder: amr.id.clone(),
                        order: suborder.order_id,
                    })
            }),
        SubOrderKind::Delivery => amr
            .find_object(&suborder.object_id)
            .ok_or_else(|| SchedulerError::ObjectNotFound {
                object: suborder.object_id.clone(),
                holder: amr.id.clone(),
            })
            .and_then(|amr_slot| {
                station
                    .reserved_slot(suborder.order_id)
                    .filter(|&slot| station.slots[slot].is_empty())
                    .map(|station_slot| (amr_slot, station_slot))
                    .ok_or_else(|| SchedulerError::SlotUnavailable {
                        holder: station.id.clone(),
                        order: suborder.order_id,
                    })
            }),
    };

    let suborder = ledger.suborder_mut(suborder_id)?;
    match resolved {
        Ok((amr_slot, station_slot)) => {
            suborder.amr_slot = Some(amr_slot);
            suborder.station_slot = Some(station_slot);
            suborder.timestep = 0;
            suborder.status = SubOrderStatus::Executing;
            debug!(amr = %amr_id, suborder = suborder_id, amr_slot, station_slot,
                   "{}", suborder.describe());
            Ok(())
        }
        Err(err) => {
            suborder.status = SubOrderStatus::Failed;
            Err(err)
        }
    }
}

/// Advances an executing suborder by one tick.
///
/// Returns `true` once the transfer has been performed.
pub fn advance_suborder(
    config: &FleetConfig,
    registry: &mut Registry,
    ledger: &mut Ledger,
    amr_id: &str,
    suborder_id: SubOrderId,
) -> Result<bool, SchedulerError> {
    let suborder = ledger.suborder_mut(suborder_id)?;
    suborder.timestep += 1;
    if suborder.timestep < config.suborder_duration {
        return Ok(false);
    }

    let suborder = suborder.clone();
    let (Some(amr_slot), Some(station_slot)) = (suborder.amr_slot, suborder.station_slot) else {
        return Err(SchedulerError::SlotUnavailable {
            holder: suborder.station_id.clone(),
            order: suborder.order_id,
        });
    };

    // Check both sides before touching either.
    let (source_holder, target_holder) = match suborder.kind {
        SubOrderKind::Pickup => (suborder.station_id.as_str(), amr_id),
        SubOrderKind::Delivery => (amr_id, suborder.station_id.as_str()),
    };
    let amr = registry.amr(amr_id)?;
    let station = registry.station(&suborder.station_id)?;
    let (source_slot, target_slot) = match suborder.kind {
        SubOrderKind::Pickup => (&station.slots[station_slot], &amr.slots[amr_slot]),
        SubOrderKind::Delivery => (&amr.slots[amr_slot], &station.slots[station_slot]),
    };
    if source_slot.object_id.as_deref() != Some(suborder.object_id.as_str()) {
        return fail(ledger, suborder_id, SchedulerError::ObjectNotFound {
            object: suborder.object_id.clone(),
            holder: source_holder.to_string(),
        });
    }
    if !target_slot.is_empty() {
        return fail(ledger, suborder_id, SchedulerError::SlotUnavailable {
            holder: target_holder.to_string(),
            order: suborder.order_id,
        });
    }

    let object = Some(suborder.object_id.clone());
    let station = registry.station_mut(&suborder.station_id)?;
    let slot = &mut station.slots[station_slot];
    match suborder.kind {
        SubOrderKind::Pickup => slot.object_id = None,
        SubOrderKind::Delivery => slot.object_id = object.clone(),
    }
    slot.release(suborder.order_id);
    let amr = registry.amr_mut(amr_id)?;
    match suborder.kind {
        SubOrderKind::Pickup => amr.slots[amr_slot].object_id = object,
        SubOrderKind::Delivery => amr.slots[amr_slot].object_id = None,
    }

    ledger.suborder_mut(suborder_id)?.status = SubOrderStatus::Completed;
    info!(amr = %amr_id, suborder = suborder_id, order = suborder.order_id,
          "{} completed", suborder.describe());
    Ok(true)
}

fn fail(
    ledger: &mut Ledger,
    suborder_id: SubOrderId,
    err: SchedulerError,
) -> Result<bool, SchedulerError> {
    ledger.suborder_mut(suborder_id)?.status = SubOrderStatus::Failed;
    Err(err)
}
