//! Expected-state projection.
//!
//! For every position of a robot queue, the projector predicts which objects
//! the robot carries once that task completes. Position 0 starts from the
//! robot's physical occupancy; each later position starts from the previous
//! projection. Pickups add their object, deliveries remove it, failed
//! suborders are ignored.
//!
//! The projection is the admission oracle for assignment and the reference
//! that the physical state is checked against when a task completes.

use tracing::error;

use crate::error::SchedulerError;
use crate::ledger::Ledger;
use crate::models::{ExpectedState, SlotHolder, SubOrderKind, SubOrderStatus};
use crate::registry::Registry;

/// Recomputes every expected state of `amr_id`'s queue.
pub fn update_expected_states(
    registry: &Registry,
    ledger: &mut Ledger,
    amr_id: &str,
) -> Result<(), SchedulerError> {
    let mut state = registry.amr(amr_id)?.objects();
    let mut states = Vec::new();
    for &task_id in &ledger.queue(amr_id)?.tasks {
        for suborder in ledger.task_suborders(task_id)? {
            if suborder.status == SubOrderStatus::Failed {
                continue;
            }
            match suborder.kind {
                SubOrderKind::Pickup => {
                    state.insert(suborder.object_id.clone());
                }
                SubOrderKind::Delivery => {
                    state.remove(&suborder.object_id);
                }
            }
        }
        states.push(state.clone());
    }
    ledger.queue_mut(amr_id)?.expected_states = states;
    Ok(())
}

/// Checks the robot's physical occupancy against the head projection.
///
/// An empty queue has nothing to check against.
pub fn validate_amr_state(
    registry: &Registry,
    ledger: &Ledger,
    amr_id: &str,
) -> Result<(), SchedulerError> {
    let Some(expected) = ledger.queue(amr_id)?.expected_states.first() else {
        return Ok(());
    };
    let actual = registry.amr(amr_id)?.objects();
    if &actual != expected {
        error!(amr = %amr_id, ?expected, ?actual, "physical state diverged from projection");
        return Err(SchedulerError::StateMismatch {
            amr: amr_id.to_string(),
            expected: expected.clone(),
            actual,
        });
    }
    Ok(())
}

/// Projected state at the queue tail, or the physical state for an empty
/// queue.
pub fn tail_state(
    registry: &Registry,
    ledger: &Ledger,
    amr_id: &str,
) -> Result<ExpectedState, SchedulerError> {
    match ledger.queue(amr_id)?.tail_state() {
        Some(state) => Ok(state.clone()),
        None => Ok(registry.amr(amr_id)?.objects()),
    }
}
